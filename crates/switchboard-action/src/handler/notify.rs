//! Notification action handlers.
//!
//! Deliver a rendered message to the channel the interaction came from, to
//! the actor privately, or to a configured channel. An interaction without a
//! known channel notifies its actor privately instead.

use async_trait::async_trait;

use crate::error::ActionError;
use crate::executor::ExecutionContext;
use crate::handler::{ActionHandler, ActionReport};
use crate::types::{ActionKind, ActionSpec, ActionType};

/// Message body for a notification: the configured message, falling back
/// to the success template.
fn body(
    action: &ActionSpec,
    message: Option<&str>,
    ctx: &ExecutionContext<'_>,
) -> Result<String, ActionError> {
    let template = message
        .or(action.success_template.as_deref())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ActionError::InvalidPayload("notification has no message".to_string()))?;
    Ok(ctx.render(action, template))
}

fn mismatch(expected: ActionType, action: &ActionSpec) -> ActionError {
    ActionError::InvalidPayload(format!(
        "expected {} parameters, got {}",
        expected,
        action.action_type()
    ))
}

/// Handler for `NotifyActor`: posts into the interaction's channel, or
/// messages the actor directly when the event carries no channel.
pub struct NotifyActorHandler;

#[async_trait]
impl ActionHandler for NotifyActorHandler {
    fn action_type(&self) -> ActionType {
        ActionType::NotifyActor
    }

    async fn execute(
        &self,
        action: &ActionSpec,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ActionReport, ActionError> {
        let ActionKind::NotifyActor(params) = &action.kind else {
            return Err(mismatch(ActionType::NotifyActor, action));
        };
        let content = body(action, params.message.as_deref(), ctx)?;

        match ctx.origin {
            Some(channel) => {
                ctx.surfaces.messages.send_to_channel(channel, &content).await?;
                tracing::info!(channel = %channel, len = content.len(), "Notification sent");
            }
            None => {
                ctx.surfaces
                    .messages
                    .send_private(&ctx.actor.id, &content)
                    .await?;
                tracing::info!(
                    actor = %ctx.actor.id,
                    len = content.len(),
                    "No origin channel, notification sent privately"
                );
            }
        }
        Ok(ActionReport::Applied {
            message: "Message sent.",
        })
    }

    fn failure_message(&self) -> &'static str {
        "Could not send the message: {error}"
    }

    fn describe(&self, _action: &ActionSpec) -> String {
        "Notify actor in channel".to_string()
    }
}

/// Handler for `NotifyActorPrivately`: sends a direct message to the actor.
pub struct NotifyActorPrivatelyHandler;

#[async_trait]
impl ActionHandler for NotifyActorPrivatelyHandler {
    fn action_type(&self) -> ActionType {
        ActionType::NotifyActorPrivately
    }

    async fn execute(
        &self,
        action: &ActionSpec,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ActionReport, ActionError> {
        let ActionKind::NotifyActorPrivately(params) = &action.kind else {
            return Err(mismatch(ActionType::NotifyActorPrivately, action));
        };
        let content = body(action, params.message.as_deref(), ctx)?;

        ctx.surfaces
            .messages
            .send_private(&ctx.actor.id, &content)
            .await?;
        tracing::info!(actor = %ctx.actor.id, len = content.len(), "Private notification sent");
        Ok(ActionReport::Applied {
            message: "Sent you a private message.",
        })
    }

    fn failure_message(&self) -> &'static str {
        "Could not send you a private message: {error}"
    }

    fn describe(&self, _action: &ActionSpec) -> String {
        "Notify actor privately".to_string()
    }
}

/// Handler for `NotifyChannel`: posts into a configured channel.
pub struct NotifyChannelHandler;

#[async_trait]
impl ActionHandler for NotifyChannelHandler {
    fn action_type(&self) -> ActionType {
        ActionType::NotifyChannel
    }

    async fn execute(
        &self,
        action: &ActionSpec,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ActionReport, ActionError> {
        let ActionKind::NotifyChannel(params) = &action.kind else {
            return Err(mismatch(ActionType::NotifyChannel, action));
        };
        let content = body(action, params.message.as_deref(), ctx)?;

        ctx.surfaces
            .messages
            .send_to_channel(&params.channel, &content)
            .await?;
        tracing::info!(channel = %params.channel, len = content.len(), "Channel notification sent");
        Ok(ActionReport::Applied {
            message: "Message sent to {channel}.",
        })
    }

    fn failure_message(&self) -> &'static str {
        "Could not send a message to {channel}: {error}"
    }

    fn describe(&self, action: &ActionSpec) -> String {
        match &action.kind {
            ActionKind::NotifyChannel(params) => format!("Notify channel: {}", params.channel),
            _ => "Notify channel".to_string(),
        }
    }
}
