//! Capability action handlers.
//!
//! Grant, revoke and toggle a capability on the triggering actor.

use async_trait::async_trait;

use crate::error::ActionError;
use crate::executor::ExecutionContext;
use crate::handler::{ActionHandler, ActionReport};
use crate::types::{ActionKind, ActionSpec, ActionType, CapabilityParams};

const GRANTED: &str = "Granted {capability}.";
const REVOKED: &str = "Removed {capability}.";

fn params(action: &ActionSpec, expected: ActionType) -> Result<&CapabilityParams, ActionError> {
    match &action.kind {
        ActionKind::GrantCapability(p)
        | ActionKind::RevokeCapability(p)
        | ActionKind::ToggleCapability(p)
            if action.action_type() == expected =>
        {
            Ok(p)
        }
        other => Err(ActionError::InvalidPayload(format!(
            "expected {} parameters, got {}",
            expected,
            other.action_type()
        ))),
    }
}

/// Handler for `GrantCapability`. Granting a held capability changes nothing.
pub struct GrantCapabilityHandler;

#[async_trait]
impl ActionHandler for GrantCapabilityHandler {
    fn action_type(&self) -> ActionType {
        ActionType::GrantCapability
    }

    async fn execute(
        &self,
        action: &ActionSpec,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ActionReport, ActionError> {
        let capability = &params(action, ActionType::GrantCapability)?.capability;
        let surface = &ctx.surfaces.capabilities;

        if surface.has_capability(&ctx.actor.id, capability).await? {
            return Ok(ActionReport::Unchanged {
                message: GRANTED,
                unchanged_message: "You already have {capability}.",
            });
        }

        surface.grant(&ctx.actor.id, capability).await?;
        tracing::info!(actor = %ctx.actor.id, capability = %capability, "Capability granted");
        Ok(ActionReport::Applied { message: GRANTED })
    }

    fn failure_message(&self) -> &'static str {
        "Could not grant {capability}: {error}"
    }

    fn describe(&self, action: &ActionSpec) -> String {
        match action.kind.capability() {
            Some(capability) => format!("Grant capability: {}", capability),
            None => "Grant capability".to_string(),
        }
    }
}

/// Handler for `RevokeCapability`. Revoking a missing capability changes nothing.
pub struct RevokeCapabilityHandler;

#[async_trait]
impl ActionHandler for RevokeCapabilityHandler {
    fn action_type(&self) -> ActionType {
        ActionType::RevokeCapability
    }

    async fn execute(
        &self,
        action: &ActionSpec,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ActionReport, ActionError> {
        let capability = &params(action, ActionType::RevokeCapability)?.capability;
        let surface = &ctx.surfaces.capabilities;

        if !surface.has_capability(&ctx.actor.id, capability).await? {
            return Ok(ActionReport::Unchanged {
                message: REVOKED,
                unchanged_message: "You do not have {capability}.",
            });
        }

        surface.revoke(&ctx.actor.id, capability).await?;
        tracing::info!(actor = %ctx.actor.id, capability = %capability, "Capability revoked");
        Ok(ActionReport::Applied { message: REVOKED })
    }

    fn failure_message(&self) -> &'static str {
        "Could not remove {capability}: {error}"
    }

    fn describe(&self, action: &ActionSpec) -> String {
        match action.kind.capability() {
            Some(capability) => format!("Revoke capability: {}", capability),
            None => "Revoke capability".to_string(),
        }
    }
}

/// Handler for `ToggleCapability`.
///
/// Reads the current state, then grants or revokes. The read and the write
/// are not atomic; concurrent toggles for the same actor and capability race
/// unless the executor serializes capability updates.
pub struct ToggleCapabilityHandler;

#[async_trait]
impl ActionHandler for ToggleCapabilityHandler {
    fn action_type(&self) -> ActionType {
        ActionType::ToggleCapability
    }

    async fn execute(
        &self,
        action: &ActionSpec,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ActionReport, ActionError> {
        let capability = &params(action, ActionType::ToggleCapability)?.capability;
        let surface = &ctx.surfaces.capabilities;

        if surface.has_capability(&ctx.actor.id, capability).await? {
            surface.revoke(&ctx.actor.id, capability).await?;
            tracing::info!(actor = %ctx.actor.id, capability = %capability, "Capability toggled off");
            Ok(ActionReport::Applied { message: REVOKED })
        } else {
            surface.grant(&ctx.actor.id, capability).await?;
            tracing::info!(actor = %ctx.actor.id, capability = %capability, "Capability toggled on");
            Ok(ActionReport::Applied { message: GRANTED })
        }
    }

    fn failure_message(&self) -> &'static str {
        "Could not toggle {capability}: {error}"
    }

    fn describe(&self, action: &ActionSpec) -> String {
        match action.kind.capability() {
            Some(capability) => format!("Toggle capability: {}", capability),
            None => "Toggle capability".to_string(),
        }
    }
}
