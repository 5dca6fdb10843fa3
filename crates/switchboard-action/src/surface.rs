//! Contracts of the external collaborators the dispatcher depends on.
//!
//! Implementations live outside this crate (platform clients), apart from the
//! in-memory versions in [`crate::memory`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use switchboard_core::types::{ActorId, CapabilityId, ChannelId, SourceId};

use crate::error::SurfaceError;
use crate::types::IncomingEvent;

/// Source of stored component configurations.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Raw configuration for `source`, or `None` if nothing is stored.
    async fn load(&self, source: &SourceId) -> Result<Option<serde_json::Value>, SurfaceError>;
}

/// Role/permission-like grants held by actors.
#[async_trait]
pub trait CapabilitySurface: Send + Sync {
    async fn has_capability(
        &self,
        actor: &ActorId,
        capability: &CapabilityId,
    ) -> Result<bool, SurfaceError>;

    async fn grant(&self, actor: &ActorId, capability: &CapabilityId) -> Result<(), SurfaceError>;

    async fn revoke(&self, actor: &ActorId, capability: &CapabilityId)
        -> Result<(), SurfaceError>;
}

/// Message delivery to channels and to actors directly.
#[async_trait]
pub trait MessageSurface: Send + Sync {
    async fn send_to_channel(&self, channel: &ChannelId, content: &str)
        -> Result<(), SurfaceError>;

    async fn send_private(&self, actor: &ActorId, content: &str) -> Result<(), SurfaceError>;
}

/// Where actors currently are, for relocation.
#[async_trait]
pub trait PresenceSurface: Send + Sync {
    async fn relocate(&self, actor: &ActorId, target: &ChannelId) -> Result<(), SurfaceError>;
}

/// Text delivered back to the triggering actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub content: String,
    /// Only visible to the triggering actor.
    pub private: bool,
}

/// The event surface's acknowledgement and response channel.
#[async_trait]
pub trait InteractionSurface: Send + Sync {
    /// Deferred acknowledgement. Consumes the immediate-reply slot.
    ///
    /// Returns `SurfaceError::AlreadyAcknowledged` when the interaction was
    /// acknowledged before.
    async fn acknowledge(&self, event: &IncomingEvent, private: bool) -> Result<(), SurfaceError>;

    /// Immediate reply, valid only while the interaction is unacknowledged.
    async fn reply(&self, event: &IncomingEvent, response: &Response) -> Result<(), SurfaceError>;

    /// Follow-up after an acknowledgement.
    async fn follow_up(&self, event: &IncomingEvent, response: &Response)
        -> Result<(), SurfaceError>;
}

/// The capability surfaces handed to action handlers.
#[derive(Clone)]
pub struct Surfaces {
    pub capabilities: Arc<dyn CapabilitySurface>,
    pub messages: Arc<dyn MessageSurface>,
    pub presence: Arc<dyn PresenceSurface>,
}

impl Surfaces {
    pub fn new(
        capabilities: Arc<dyn CapabilitySurface>,
        messages: Arc<dyn MessageSurface>,
        presence: Arc<dyn PresenceSurface>,
    ) -> Self {
        Self {
            capabilities,
            messages,
            presence,
        }
    }
}
