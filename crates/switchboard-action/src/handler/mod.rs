//! Action handler registry and trait definition.
//!
//! Defines the `ActionHandler` async trait and provides the handler
//! registry for dispatching actions to the correct implementation.

pub mod capability;
pub mod notify;
pub mod relocate;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ActionError;
use crate::executor::ExecutionContext;
use crate::types::{ActionSpec, ActionType};

pub use capability::{GrantCapabilityHandler, RevokeCapabilityHandler, ToggleCapabilityHandler};
pub use notify::{NotifyActorHandler, NotifyActorPrivatelyHandler, NotifyChannelHandler};
pub use relocate::RelocateActorHandler;

/// What a handler did, with the default templates describing it.
///
/// Templates are rendered by the executor; the action's own templates take
/// precedence over these defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionReport {
    /// The side effect happened.
    Applied { message: &'static str },
    /// Nothing needed to change (e.g. the capability was already held).
    Unchanged {
        message: &'static str,
        unchanged_message: &'static str,
    },
}

/// A pluggable implementation of one action type.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn action_type(&self) -> ActionType;

    /// Perform the side effect. Errors become failure outcomes.
    async fn execute(
        &self,
        action: &ActionSpec,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ActionReport, ActionError>;

    /// Default failure template for this action type.
    fn failure_message(&self) -> &'static str;

    /// Short human-readable description used in logs.
    fn describe(&self, action: &ActionSpec) -> String;
}

/// Maps action types to their handlers.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in handler.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    /// Register a handler, replacing any previous handler for its type.
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(handler.action_type(), handler);
    }

    pub fn register_defaults(&mut self) {
        self.register(Arc::new(GrantCapabilityHandler));
        self.register(Arc::new(RevokeCapabilityHandler));
        self.register(Arc::new(ToggleCapabilityHandler));
        self.register(Arc::new(NotifyActorHandler));
        self.register(Arc::new(NotifyActorPrivatelyHandler));
        self.register(Arc::new(NotifyChannelHandler));
        self.register(Arc::new(RelocateActorHandler));
    }

    pub fn get(&self, action_type: ActionType) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(&action_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_action_type() {
        let registry = ActionRegistry::with_defaults();
        assert_eq!(registry.len(), ActionType::ALL.len());
        for action_type in ActionType::ALL {
            let handler = registry.get(action_type).unwrap();
            assert_eq!(handler.action_type(), action_type);
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = ActionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(ActionType::NotifyActor).is_none());
    }

    #[test]
    fn test_register_replaces_existing_handler() {
        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(NotifyActorHandler));
        registry.register(Arc::new(NotifyActorHandler));
        assert_eq!(registry.len(), 1);
    }
}
