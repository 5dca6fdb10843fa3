//! Relocation action handler.
//!
//! Moves the actor into another channel (e.g. a different voice room).

use async_trait::async_trait;

use crate::error::ActionError;
use crate::executor::ExecutionContext;
use crate::handler::{ActionHandler, ActionReport};
use crate::types::{ActionKind, ActionSpec, ActionType};

/// Handler for `RelocateActor`.
pub struct RelocateActorHandler;

#[async_trait]
impl ActionHandler for RelocateActorHandler {
    fn action_type(&self) -> ActionType {
        ActionType::RelocateActor
    }

    async fn execute(
        &self,
        action: &ActionSpec,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ActionReport, ActionError> {
        let ActionKind::RelocateActor(params) = &action.kind else {
            return Err(ActionError::InvalidPayload(format!(
                "expected relocate_actor parameters, got {}",
                action.action_type()
            )));
        };

        ctx.surfaces
            .presence
            .relocate(&ctx.actor.id, &params.target)
            .await?;
        tracing::info!(actor = %ctx.actor.id, target = %params.target, "Actor relocated");
        Ok(ActionReport::Applied {
            message: "Moved you to {target}.",
        })
    }

    fn failure_message(&self) -> &'static str {
        "Could not move you to {target}: {error}"
    }

    fn describe(&self, action: &ActionSpec) -> String {
        match &action.kind {
            ActionKind::RelocateActor(params) => format!("Relocate actor to: {}", params.target),
            _ => "Relocate actor".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SurfaceError;
    use crate::memory::Sandbox;
    use crate::types::{IncomingEvent, RelocateParams};
    use switchboard_core::types::{ActorId, ActorRef, ChannelId};

    fn relocate(target: &str) -> ActionSpec {
        ActionSpec::new(ActionKind::RelocateActor(RelocateParams {
            target: ChannelId::new(target),
        }))
    }

    #[tokio::test]
    async fn test_relocate_connected_actor() {
        let sandbox = Sandbox::new()
            .with_relocation_target("stage")
            .with_session("u1", "lobby");
        let surfaces = sandbox.surfaces();
        let event = IncomingEvent::button("msg", "btn", ActorRef::new("u1"));
        let ctx = ExecutionContext::from_event(&event, &surfaces);

        let report = RelocateActorHandler
            .execute(&relocate("stage"), &ctx)
            .await
            .unwrap();
        assert_eq!(
            report,
            ActionReport::Applied {
                message: "Moved you to {target}."
            }
        );
        assert_eq!(
            sandbox.presence.location(&ActorId::new("u1")),
            Some(ChannelId::new("stage"))
        );
    }

    #[tokio::test]
    async fn test_relocate_disconnected_actor_fails() {
        let sandbox = Sandbox::new().with_relocation_target("stage");
        let surfaces = sandbox.surfaces();
        let event = IncomingEvent::button("msg", "btn", ActorRef::new("u1"));
        let ctx = ExecutionContext::from_event(&event, &surfaces);

        let err = RelocateActorHandler
            .execute(&relocate("stage"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Surface(SurfaceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_relocate_to_invalid_target_fails() {
        let sandbox = Sandbox::new().with_session("u1", "lobby");
        let surfaces = sandbox.surfaces();
        let event = IncomingEvent::button("msg", "btn", ActorRef::new("u1"));
        let ctx = ExecutionContext::from_event(&event, &surfaces);

        let err = RelocateActorHandler
            .execute(&relocate("nowhere"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Surface(SurfaceError::NotFound(_))));
        assert_eq!(
            sandbox.presence.location(&ActorId::new("u1")),
            Some(ChannelId::new("lobby"))
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            RelocateActorHandler.describe(&relocate("stage")),
            "Relocate actor to: stage"
        );
    }
}
