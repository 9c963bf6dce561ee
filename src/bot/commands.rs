use anyhow::Result;
use tracing::{debug, error, info};

use super::Bot;
use crate::conversation::messages;
use crate::conversation::wizard;
use crate::conversation::ConversationContext;
use crate::models::AlertStatus;

impl Bot {
    /// Run a `!command`. Handled commands send their own reply and yield `None`.
    pub(super) async fn run_command(
        &self,
        cleaned: &str,
        sender_id: &str,
        ctx: &mut ConversationContext,
    ) -> Option<String> {
        let mut parts = cleaned.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let argument = parts.next();

        let result = match name {
            "!ayuda" => self.send(sender_id, messages::HELP).await,
            "!publicar" => {
                let question = wizard::start(ctx);
                self.send(sender_id, &question).await
            }
            "!misalertas" => self.list_alerts(sender_id).await,
            "!eliminaralerta" => self.remove_alert(sender_id, argument).await,
            "!cancelar" => {
                let text = if ctx.is_idle() {
                    messages::NOTHING_TO_CANCEL
                } else {
                    messages::OPERATION_CANCELLED
                };
                ctx.reset();
                self.send(sender_id, text).await
            }
            _ => {
                debug!(sender = sender_id, command = name, "Unknown command");
                return Some(messages::FALLBACK.to_string());
            }
        };

        match result {
            Ok(()) => {
                info!(sender = sender_id, command = name, "⚙️ Command handled");
                None
            }
            Err(e) => {
                error!(sender = sender_id, stage = "command", command = name, "Command failed: {:#}", e);
                Some(messages::COMMAND_ERROR.to_string())
            }
        }
    }

    async fn send(&self, to: &str, text: &str) -> Result<()> {
        self.transport.send_text(to, text).await?;
        Ok(())
    }

    async fn list_alerts(&self, sender_id: &str) -> Result<()> {
        let alerts = self.alerts.active_for_sender(sender_id).await?;
        let text = if alerts.is_empty() {
            messages::NO_ALERTS.to_string()
        } else {
            messages::alert_list(&alerts)
        };
        self.send(sender_id, &text).await
    }

    /// Remove the N-th (1-based) active alert of the sender
    async fn remove_alert(&self, sender_id: &str, argument: Option<&str>) -> Result<()> {
        let Some(position) = argument
            .and_then(|arg| arg.parse::<usize>().ok())
            .filter(|n| *n > 0)
        else {
            return self.send(sender_id, messages::REMOVE_ALERT_USAGE).await;
        };

        let alerts = self.alerts.active_for_sender(sender_id).await?;
        match alerts.get(position - 1) {
            Some(record) => {
                self.alerts.set_status(record, AlertStatus::Removed).await?;
                self.send(sender_id, &messages::alert_removed(position)).await
            }
            None => self.send(sender_id, &messages::alert_not_found(position)).await,
        }
    }
}
