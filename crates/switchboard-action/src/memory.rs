//! In-memory collaborators.
//!
//! Process-local implementations of every collaborator contract, used by the
//! `switchboard` binary and by tests. State lives in explicit keyed stores
//! owned by each collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use switchboard_core::config::SwitchboardConfig;
use switchboard_core::types::{ActorId, CapabilityId, ChannelId, SourceId};

use crate::dispatcher::Dispatcher;
use crate::error::SurfaceError;
use crate::surface::{
    CapabilitySurface, ConfigurationStore, InteractionSurface, MessageSurface, PresenceSurface,
    Response, Surfaces,
};
use crate::types::IncomingEvent;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Configuration store
// =============================================================================

/// Configurations keyed by event source.
#[derive(Default)]
pub struct MemoryConfigStore {
    entries: Mutex<HashMap<SourceId, serde_json::Value>>,
    unavailable: Mutex<bool>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, source: SourceId, configuration: serde_json::Value) {
        lock(&self.entries).insert(source, configuration);
    }

    pub fn remove(&self, source: &SourceId) -> Option<serde_json::Value> {
        lock(&self.entries).remove(source)
    }

    /// Make every load fail, as if the backing store were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        *lock(&self.unavailable) = unavailable;
    }
}

#[async_trait]
impl ConfigurationStore for MemoryConfigStore {
    async fn load(&self, source: &SourceId) -> Result<Option<serde_json::Value>, SurfaceError> {
        if *lock(&self.unavailable) {
            return Err(SurfaceError::Unreachable("configuration store".to_string()));
        }
        Ok(lock(&self.entries).get(source).cloned())
    }
}

// =============================================================================
// Capabilities
// =============================================================================

#[derive(Default)]
struct CapabilityState {
    known: HashSet<CapabilityId>,
    denied: HashSet<CapabilityId>,
    held: HashMap<ActorId, BTreeSet<CapabilityId>>,
}

impl CapabilityState {
    fn check_known(&self, capability: &CapabilityId) -> Result<(), SurfaceError> {
        if self.known.contains(capability) {
            Ok(())
        } else {
            Err(SurfaceError::NotFound(format!("capability {}", capability)))
        }
    }

    fn check_manageable(&self, capability: &CapabilityId) -> Result<(), SurfaceError> {
        self.check_known(capability)?;
        if self.denied.contains(capability) {
            return Err(SurfaceError::PermissionDenied(format!(
                "cannot manage {}",
                capability
            )));
        }
        Ok(())
    }
}

/// A catalogue of capabilities and who holds them.
#[derive(Default)]
pub struct MemoryCapabilities {
    state: Mutex<CapabilityState>,
}

impl MemoryCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `capability` exist.
    pub fn define(&self, capability: CapabilityId) {
        lock(&self.state).known.insert(capability);
    }

    /// Make `capability` exist but refuse to grant or revoke it.
    pub fn deny(&self, capability: CapabilityId) {
        let mut state = lock(&self.state);
        state.known.insert(capability.clone());
        state.denied.insert(capability);
    }

    /// Seed `actor` with `capability`.
    pub fn give(&self, actor: ActorId, capability: CapabilityId) {
        let mut state = lock(&self.state);
        state.known.insert(capability.clone());
        state.held.entry(actor).or_default().insert(capability);
    }

    pub fn holds(&self, actor: &ActorId, capability: &CapabilityId) -> bool {
        lock(&self.state)
            .held
            .get(actor)
            .is_some_and(|held| held.contains(capability))
    }

    pub fn held_by(&self, actor: &ActorId) -> Vec<CapabilityId> {
        lock(&self.state)
            .held
            .get(actor)
            .map(|held| held.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CapabilitySurface for MemoryCapabilities {
    async fn has_capability(
        &self,
        actor: &ActorId,
        capability: &CapabilityId,
    ) -> Result<bool, SurfaceError> {
        let state = lock(&self.state);
        state.check_known(capability)?;
        Ok(state
            .held
            .get(actor)
            .is_some_and(|held| held.contains(capability)))
    }

    async fn grant(&self, actor: &ActorId, capability: &CapabilityId) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.check_manageable(capability)?;
        state
            .held
            .entry(actor.clone())
            .or_default()
            .insert(capability.clone());
        Ok(())
    }

    async fn revoke(
        &self,
        actor: &ActorId,
        capability: &CapabilityId,
    ) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        state.check_manageable(capability)?;
        if let Some(held) = state.held.get_mut(actor) {
            held.remove(capability);
        }
        Ok(())
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Where a message went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Channel(ChannelId),
    Private(ActorId),
}

/// A delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentMessage {
    pub destination: Destination,
    pub content: String,
}

#[derive(Default)]
struct MessageState {
    channels: HashSet<ChannelId>,
    blocked: HashSet<ActorId>,
    sent: Vec<SentMessage>,
}

/// Known channels plus a log of everything delivered.
#[derive(Default)]
pub struct MemoryMessages {
    state: Mutex<MessageState>,
}

impl MemoryMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_channel(&self, channel: ChannelId) {
        lock(&self.state).channels.insert(channel);
    }

    /// Refuse private messages to `actor`.
    pub fn block_private(&self, actor: ActorId) {
        lock(&self.state).blocked.insert(actor);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.state).sent.clone()
    }
}

#[async_trait]
impl MessageSurface for MemoryMessages {
    async fn send_to_channel(
        &self,
        channel: &ChannelId,
        content: &str,
    ) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        if !state.channels.contains(channel) {
            return Err(SurfaceError::NotFound(format!("channel {}", channel)));
        }
        state.sent.push(SentMessage {
            destination: Destination::Channel(channel.clone()),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn send_private(&self, actor: &ActorId, content: &str) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        if state.blocked.contains(actor) {
            return Err(SurfaceError::PermissionDenied(format!(
                "{} does not accept private messages",
                actor
            )));
        }
        state.sent.push(SentMessage {
            destination: Destination::Private(actor.clone()),
            content: content.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Presence
// =============================================================================

#[derive(Default)]
struct PresenceState {
    /// Actor -> channel they are currently connected to.
    sessions: HashMap<ActorId, ChannelId>,
    targets: HashSet<ChannelId>,
}

/// Session store tracking which channel each actor is connected to.
#[derive(Default)]
pub struct MemoryPresence {
    state: Mutex<PresenceState>,
}

impl MemoryPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&self, channel: ChannelId) {
        lock(&self.state).targets.insert(channel);
    }

    pub fn connect(&self, actor: ActorId, channel: ChannelId) {
        lock(&self.state).sessions.insert(actor, channel);
    }

    pub fn disconnect(&self, actor: &ActorId) -> Option<ChannelId> {
        lock(&self.state).sessions.remove(actor)
    }

    pub fn location(&self, actor: &ActorId) -> Option<ChannelId> {
        lock(&self.state).sessions.get(actor).cloned()
    }
}

#[async_trait]
impl PresenceSurface for MemoryPresence {
    async fn relocate(&self, actor: &ActorId, target: &ChannelId) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        if !state.targets.contains(target) {
            return Err(SurfaceError::NotFound(format!("channel {}", target)));
        }
        match state.sessions.get_mut(actor) {
            Some(current) => {
                *current = target.clone();
                Ok(())
            }
            None => Err(SurfaceError::InvalidState(format!(
                "{} is not connected",
                actor
            ))),
        }
    }
}

// =============================================================================
// Interactions
// =============================================================================

/// How `acknowledge` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckBehavior {
    #[default]
    Accept,
    /// Report that another delivery already acknowledged the interaction.
    AlreadyAcknowledged,
    /// Fail with a transport error, leaving the interaction unacknowledged.
    Fail,
    /// Never complete.
    Hang,
}

/// One call made against the interaction surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum InteractionCall {
    Acknowledge { interaction: String, private: bool },
    Reply { interaction: String, response: Response },
    FollowUp { interaction: String, response: Response },
}

#[derive(Default)]
struct InteractionState {
    acknowledged: HashSet<String>,
    calls: Vec<InteractionCall>,
    ack_behavior: AckBehavior,
    fail_delivery: bool,
}

/// Records acknowledgements and responses, enforcing the reply/follow-up rules.
#[derive(Default)]
pub struct MemoryInteractions {
    state: Mutex<InteractionState>,
}

impl MemoryInteractions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ack_behavior(&self, behavior: AckBehavior) {
        lock(&self.state).ack_behavior = behavior;
    }

    /// Make every reply and follow-up fail.
    pub fn set_fail_delivery(&self, fail: bool) {
        lock(&self.state).fail_delivery = fail;
    }

    pub fn calls(&self) -> Vec<InteractionCall> {
        lock(&self.state).calls.clone()
    }

    /// Every delivered response, replies and follow-ups alike, in order.
    pub fn responses(&self) -> Vec<Response> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|call| match call {
                InteractionCall::Reply { response, .. }
                | InteractionCall::FollowUp { response, .. } => Some(response.clone()),
                InteractionCall::Acknowledge { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl InteractionSurface for MemoryInteractions {
    async fn acknowledge(&self, event: &IncomingEvent, private: bool) -> Result<(), SurfaceError> {
        let behavior = {
            let mut state = lock(&self.state);
            match state.ack_behavior {
                AckBehavior::Accept => {
                    if !state.acknowledged.insert(event.interaction_id.clone()) {
                        return Err(SurfaceError::AlreadyAcknowledged);
                    }
                    state.calls.push(InteractionCall::Acknowledge {
                        interaction: event.interaction_id.clone(),
                        private,
                    });
                    return Ok(());
                }
                AckBehavior::AlreadyAcknowledged => {
                    state.acknowledged.insert(event.interaction_id.clone());
                }
                AckBehavior::Fail | AckBehavior::Hang => {}
            }
            state.ack_behavior
        };

        match behavior {
            AckBehavior::Hang => std::future::pending().await,
            AckBehavior::Fail => Err(SurfaceError::Unreachable("gateway timeout".to_string())),
            _ => Err(SurfaceError::AlreadyAcknowledged),
        }
    }

    async fn reply(&self, event: &IncomingEvent, response: &Response) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        if state.fail_delivery {
            return Err(SurfaceError::Unreachable("response channel".to_string()));
        }
        if !state.acknowledged.insert(event.interaction_id.clone()) {
            return Err(SurfaceError::AlreadyAcknowledged);
        }
        state.calls.push(InteractionCall::Reply {
            interaction: event.interaction_id.clone(),
            response: response.clone(),
        });
        Ok(())
    }

    async fn follow_up(
        &self,
        event: &IncomingEvent,
        response: &Response,
    ) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        if state.fail_delivery {
            return Err(SurfaceError::Unreachable("response channel".to_string()));
        }
        if !state.acknowledged.contains(&event.interaction_id) {
            return Err(SurfaceError::InvalidState(
                "interaction was never acknowledged".to_string(),
            ));
        }
        state.calls.push(InteractionCall::FollowUp {
            interaction: event.interaction_id.clone(),
            response: response.clone(),
        });
        Ok(())
    }
}

// =============================================================================
// Sandbox
// =============================================================================

/// Every in-memory collaborator, wired together.
#[derive(Clone, Default)]
pub struct Sandbox {
    pub store: Arc<MemoryConfigStore>,
    pub capabilities: Arc<MemoryCapabilities>,
    pub messages: Arc<MemoryMessages>,
    pub presence: Arc<MemoryPresence>,
    pub interactions: Arc<MemoryInteractions>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configuration(self, source: &str, configuration: serde_json::Value) -> Self {
        self.store.insert(SourceId::new(source), configuration);
        self
    }

    pub fn with_capability(self, capability: &str) -> Self {
        self.capabilities.define(CapabilityId::new(capability));
        self
    }

    pub fn with_denied(self, capability: &str) -> Self {
        self.capabilities.deny(CapabilityId::new(capability));
        self
    }

    pub fn with_held(self, actor: &str, capability: &str) -> Self {
        self.capabilities
            .give(ActorId::new(actor), CapabilityId::new(capability));
        self
    }

    pub fn with_channel(self, channel: &str) -> Self {
        self.messages.add_channel(ChannelId::new(channel));
        self
    }

    pub fn with_private_messages_blocked(self, actor: &str) -> Self {
        self.messages.block_private(ActorId::new(actor));
        self
    }

    pub fn with_relocation_target(self, channel: &str) -> Self {
        self.presence.add_target(ChannelId::new(channel));
        self
    }

    pub fn with_session(self, actor: &str, channel: &str) -> Self {
        self.presence
            .connect(ActorId::new(actor), ChannelId::new(channel));
        self
    }

    /// Action surfaces backed by this sandbox.
    pub fn surfaces(&self) -> Surfaces {
        Surfaces::new(
            self.capabilities.clone(),
            self.messages.clone(),
            self.presence.clone(),
        )
    }

    /// A dispatcher wired to this sandbox.
    pub fn dispatcher(&self, config: &SwitchboardConfig) -> Dispatcher {
        Dispatcher::from_config(
            config,
            self.store.clone(),
            self.interactions.clone(),
            self.surfaces(),
        )
    }
}
