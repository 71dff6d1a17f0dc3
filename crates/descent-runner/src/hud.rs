//! Heads-up display rendered as structured log lines.

use descent_core::event::EventEnvelope;
use descent_core::sink::EventSink;
use descent_mission::domain::events::MissionEventKind;
use tracing::{debug, info, warn};

/// Logs meters, stage changes and milestones as they are published.
#[derive(Debug, Default)]
pub struct HudSink;

impl EventSink for HudSink {
    fn publish(&self, envelope: &EventEnvelope) {
        let kind: MissionEventKind = match serde_json::from_value(envelope.payload.clone()) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(event_type = %envelope.event_type, error = %e, "unreadable event payload");
                return;
            }
        };
        match kind {
            MissionEventKind::StatsUpdated(update) => info!(
                health = update.stats.health,
                corruption = update.stats.corruption,
                floor = %update.stats.current_floor,
                logs = update.stats.logs_collected,
                "hud"
            ),
            MissionEventKind::FloorEntered(entered) => {
                info!(floor = %entered.floor, name = %entered.name, "floor entered");
            }
            MissionEventKind::StageChanged(change) => {
                debug!(floor = %change.floor, from = %change.from, to = %change.to, "stage changed");
            }
            MissionEventKind::BeatShown(shown) => {
                debug!(speaker = %shown.beat.speaker, text = %shown.beat.text, flow = ?shown.flow, "beat");
            }
            MissionEventKind::InterludeLineRevealed(revealed) => {
                debug!(line = %revealed.line, "interlude");
            }
            MissionEventKind::LowHealthWarning(warning) => {
                warn!(health = warning.health, "low health");
            }
            MissionEventKind::AchievementUnlocked(unlocked) => {
                info!(achievement = %unlocked.achievement_id, title = %unlocked.title, "achievement unlocked");
            }
            MissionEventKind::MissionCompleted(completed) => {
                info!(achievements = completed.unlocked_achievements.len(), "mission completed");
            }
            MissionEventKind::MissionExited(exited) => {
                info!(reason = ?exited.reason, "mission exited");
            }
            _ => {}
        }
    }
}
