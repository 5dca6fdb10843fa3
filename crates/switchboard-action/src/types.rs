//! Core types and value objects for the dispatcher.
//!
//! Defines the component configuration model, the typed action kinds and the
//! values produced while a dispatch runs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use switchboard_core::types::{
    ActorRef, CapabilityId, ChannelId, DispatchId, SourceId, Timestamp,
};

// =============================================================================
// Components
// =============================================================================

/// Whether a component is activated as a whole or by picking values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Button,
    Choice,
}

impl ComponentKind {
    /// Map the platform's numeric component type onto the two kinds.
    ///
    /// Types 3 and 5 through 8 are select menus; everything else behaves
    /// like a button.
    pub fn from_wire(code: i64) -> Self {
        match code {
            3 | 5..=8 => ComponentKind::Choice,
            _ => ComponentKind::Button,
        }
    }
}

/// One configured interactive element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDefinition {
    pub id: String,
    pub kind: ComponentKind,
    pub actions: Vec<ActionSpec>,
    /// Only populated for `ComponentKind::Choice`.
    pub options: Vec<ChoiceOption>,
}

impl ComponentDefinition {
    pub fn button(id: impl Into<String>, actions: Vec<ActionSpec>) -> Self {
        Self {
            id: id.into(),
            kind: ComponentKind::Button,
            actions,
            options: Vec::new(),
        }
    }

    pub fn choice(
        id: impl Into<String>,
        actions: Vec<ActionSpec>,
        options: Vec<ChoiceOption>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: ComponentKind::Choice,
            actions,
            options,
        }
    }
}

/// A selectable value of a choice component.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub value: String,
    pub actions: Vec<ActionSpec>,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>, actions: Vec<ActionSpec>) -> Self {
        Self {
            value: value.into(),
            actions,
        }
    }
}

/// Layout grouping of components. Only its order matters to dispatch.
pub type ComponentRow = Vec<ComponentDefinition>;

/// Every component row configured for one event source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    pub rows: Vec<ComponentRow>,
}

impl Configuration {
    pub fn new(rows: Vec<ComponentRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }

    /// All components in row-then-position order.
    pub fn components(&self) -> impl Iterator<Item = &ComponentDefinition> {
        self.rows.iter().flatten()
    }

    /// Component ids that occur more than once, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut duplicates = Vec::new();
        for component in self.components() {
            let id = component.id.as_str();
            if !seen.insert(id) && reported.insert(id) {
                duplicates.push(id);
            }
        }
        duplicates
    }
}

// =============================================================================
// Actions
// =============================================================================

/// Discriminant of `ActionKind`, used as the handler registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    GrantCapability,
    RevokeCapability,
    ToggleCapability,
    NotifyActor,
    NotifyActorPrivately,
    NotifyChannel,
    RelocateActor,
}

impl ActionType {
    pub const ALL: [ActionType; 7] = [
        ActionType::GrantCapability,
        ActionType::RevokeCapability,
        ActionType::ToggleCapability,
        ActionType::NotifyActor,
        ActionType::NotifyActorPrivately,
        ActionType::NotifyChannel,
        ActionType::RelocateActor,
    ];
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::GrantCapability => write!(f, "grant_capability"),
            ActionType::RevokeCapability => write!(f, "revoke_capability"),
            ActionType::ToggleCapability => write!(f, "toggle_capability"),
            ActionType::NotifyActor => write!(f, "notify_actor"),
            ActionType::NotifyActorPrivately => write!(f, "notify_actor_privately"),
            ActionType::NotifyChannel => write!(f, "notify_channel"),
            ActionType::RelocateActor => write!(f, "relocate_actor"),
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    /// Accepts both `snake_case` and `PascalCase` names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grant_capability" | "GrantCapability" => Ok(ActionType::GrantCapability),
            "revoke_capability" | "RevokeCapability" => Ok(ActionType::RevokeCapability),
            "toggle_capability" | "ToggleCapability" => Ok(ActionType::ToggleCapability),
            "notify_actor" | "NotifyActor" => Ok(ActionType::NotifyActor),
            "notify_actor_privately" | "NotifyActorPrivately" => {
                Ok(ActionType::NotifyActorPrivately)
            }
            "notify_channel" | "NotifyChannel" => Ok(ActionType::NotifyChannel),
            "relocate_actor" | "RelocateActor" => Ok(ActionType::RelocateActor),
            _ => Err(format!("Unknown action type: {}", s)),
        }
    }
}

/// Parameters of the capability actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityParams {
    pub capability: CapabilityId,
}

/// Parameters of the actor notifications.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotifyParams {
    /// Message template; the success template is sent when absent.
    pub message: Option<String>,
}

/// Parameters of `NotifyChannel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNotifyParams {
    pub channel: ChannelId,
    pub message: Option<String>,
}

/// Parameters of `RelocateActor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocateParams {
    pub target: ChannelId,
}

/// A configured side effect together with its typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    GrantCapability(CapabilityParams),
    RevokeCapability(CapabilityParams),
    ToggleCapability(CapabilityParams),
    NotifyActor(NotifyParams),
    NotifyActorPrivately(NotifyParams),
    NotifyChannel(ChannelNotifyParams),
    RelocateActor(RelocateParams),
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::GrantCapability(_) => ActionType::GrantCapability,
            ActionKind::RevokeCapability(_) => ActionType::RevokeCapability,
            ActionKind::ToggleCapability(_) => ActionType::ToggleCapability,
            ActionKind::NotifyActor(_) => ActionType::NotifyActor,
            ActionKind::NotifyActorPrivately(_) => ActionType::NotifyActorPrivately,
            ActionKind::NotifyChannel(_) => ActionType::NotifyChannel,
            ActionKind::RelocateActor(_) => ActionType::RelocateActor,
        }
    }

    /// The capability touched by this action, if any.
    pub fn capability(&self) -> Option<&CapabilityId> {
        match self {
            ActionKind::GrantCapability(p)
            | ActionKind::RevokeCapability(p)
            | ActionKind::ToggleCapability(p) => Some(&p.capability),
            _ => None,
        }
    }
}

/// One resolved action record: what to do and how to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    pub kind: ActionKind,
    pub success_template: Option<String>,
    pub failure_template: Option<String>,
    /// Used for grant/revoke no-ops when unchanged reporting is enabled.
    pub unchanged_template: Option<String>,
}

impl ActionSpec {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            success_template: None,
            failure_template: None,
            unchanged_template: None,
        }
    }

    pub fn with_success(mut self, template: impl Into<String>) -> Self {
        self.success_template = Some(template.into());
        self
    }

    pub fn with_failure(mut self, template: impl Into<String>) -> Self {
        self.failure_template = Some(template.into());
        self
    }

    pub fn with_unchanged(mut self, template: impl Into<String>) -> Self {
        self.unchanged_template = Some(template.into());
        self
    }

    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }
}

// =============================================================================
// Events
// =============================================================================

/// An interaction delivered by the event surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingEvent {
    /// Platform token correlating acknowledgement, reply and follow-up.
    #[serde(default)]
    pub interaction_id: String,
    /// Absent for events that did not come from a component.
    #[serde(default)]
    pub component_id: Option<String>,
    /// Informational only. Matching goes by the stored component's kind, so
    /// a choice component still applies option overlays when this is false.
    #[serde(default)]
    pub is_choice: bool,
    #[serde(default)]
    pub selected_values: Vec<String>,
    pub actor: ActorRef,
    pub source_id: SourceId,
    /// Channel the interaction happened in.
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
}

impl IncomingEvent {
    /// A button press by `actor` on a component of `source`.
    pub fn button(
        source: impl Into<String>,
        component_id: impl Into<String>,
        actor: ActorRef,
    ) -> Self {
        Self {
            interaction_id: String::new(),
            component_id: Some(component_id.into()),
            is_choice: false,
            selected_values: Vec::new(),
            actor,
            source_id: SourceId::new(source),
            channel_id: None,
        }
    }

    /// A selection of `values` by `actor` on a choice component of `source`.
    pub fn choice(
        source: impl Into<String>,
        component_id: impl Into<String>,
        values: &[&str],
        actor: ActorRef,
    ) -> Self {
        Self {
            is_choice: true,
            selected_values: values.iter().map(|v| v.to_string()).collect(),
            ..Self::button(source, component_id, actor)
        }
    }

    pub fn in_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel_id = Some(ChannelId::new(channel));
        self
    }

    pub fn with_interaction_id(mut self, id: impl Into<String>) -> Self {
        self.interaction_id = id.into();
        self
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of executing one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub ok: bool,
    pub message: String,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Success and failure messages collected while a dispatch executes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub successes: Vec<String>,
    pub failures: Vec<String>,
}

impl DispatchOutcome {
    pub fn record(&mut self, outcome: &Outcome) {
        if outcome.ok {
            self.successes.push(outcome.message.clone());
        } else {
            self.failures.push(outcome.message.clone());
        }
    }
}

/// Which response path delivered (or would deliver) the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSlot {
    /// The immediate reply to the interaction.
    Immediate,
    /// A follow-up after a deferred acknowledgement.
    FollowUp,
}

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// The event carried no component id.
    Ignored,
    /// Nothing matched, nothing was configured, or every message was empty.
    NoActions,
    /// The resolved actions ran; individual actions may still have failed.
    Completed,
    /// The coordinator faulted and answered with the system error message.
    SystemError,
}

/// One executed action and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: ActionType,
    pub outcome: Outcome,
}

/// What happened during one dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub dispatch_id: DispatchId,
    pub status: DispatchStatus,
    pub started_at: Timestamp,
    pub actions: Vec<ActionRecord>,
    /// Text handed to the response channel.
    pub response: Option<String>,
    pub slot: Option<ResponseSlot>,
    pub delivered: bool,
}

impl DispatchSummary {
    pub(crate) fn new(dispatch_id: DispatchId) -> Self {
        Self {
            dispatch_id,
            status: DispatchStatus::Ignored,
            started_at: Timestamp::now(),
            actions: Vec::new(),
            response: None,
            slot: None,
            delivered: false,
        }
    }

    pub fn failure_count(&self) -> usize {
        self.actions.iter().filter(|r| !r.outcome.ok).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(cap: &str) -> ActionSpec {
        ActionSpec::new(ActionKind::GrantCapability(CapabilityParams {
            capability: CapabilityId::new(cap),
        }))
    }

    #[test]
    fn test_component_kind_from_wire() {
        assert_eq!(ComponentKind::from_wire(2), ComponentKind::Button);
        assert_eq!(ComponentKind::from_wire(3), ComponentKind::Choice);
        assert_eq!(ComponentKind::from_wire(5), ComponentKind::Choice);
        assert_eq!(ComponentKind::from_wire(8), ComponentKind::Choice);
        assert_eq!(ComponentKind::from_wire(4), ComponentKind::Button);
        assert_eq!(ComponentKind::from_wire(-1), ComponentKind::Button);
    }

    #[test]
    fn test_action_type_display() {
        assert_eq!(ActionType::GrantCapability.to_string(), "grant_capability");
        assert_eq!(ActionType::NotifyActorPrivately.to_string(), "notify_actor_privately");
        assert_eq!(ActionType::RelocateActor.to_string(), "relocate_actor");
    }

    #[test]
    fn test_action_type_from_str_accepts_both_casings() {
        for variant in ActionType::ALL {
            let snake: ActionType = variant.to_string().parse().unwrap();
            assert_eq!(snake, variant);
            let pascal: ActionType = format!("{:?}", variant).parse().unwrap();
            assert_eq!(pascal, variant);
        }
        assert!("send_money".parse::<ActionType>().is_err());
    }

    #[test]
    fn test_action_kind_discriminant_and_capability() {
        let spec = grant("X");
        assert_eq!(spec.action_type(), ActionType::GrantCapability);
        assert_eq!(spec.kind.capability(), Some(&CapabilityId::new("X")));

        let notify = ActionKind::NotifyActor(NotifyParams::default());
        assert_eq!(notify.action_type(), ActionType::NotifyActor);
        assert!(notify.capability().is_none());
    }

    #[test]
    fn test_configuration_duplicate_ids_reported_once() {
        let config = Configuration::new(vec![
            vec![
                ComponentDefinition::button("a", vec![]),
                ComponentDefinition::button("b", vec![]),
            ],
            vec![
                ComponentDefinition::button("a", vec![grant("X")]),
                ComponentDefinition::button("a", vec![]),
            ],
        ]);
        assert_eq!(config.duplicate_ids(), vec!["a"]);
        assert_eq!(config.components().count(), 4);
    }

    #[test]
    fn test_configuration_is_empty_with_empty_rows() {
        assert!(Configuration::default().is_empty());
        assert!(Configuration::new(vec![vec![], vec![]]).is_empty());
        assert!(!Configuration::new(vec![vec![ComponentDefinition::button("a", vec![])]])
            .is_empty());
    }

    #[test]
    fn test_dispatch_outcome_records_in_order() {
        let mut outcome = DispatchOutcome::default();
        outcome.record(&Outcome::success("one"));
        outcome.record(&Outcome::failure("two"));
        outcome.record(&Outcome::success("three"));
        assert_eq!(outcome.successes, vec!["one", "three"]);
        assert_eq!(outcome.failures, vec!["two"]);
    }

    #[test]
    fn test_incoming_event_deserialize_defaults() {
        let json = r#"{"actor": {"id": "7"}, "source_id": "msg-1"}"#;
        let event: IncomingEvent = serde_json::from_str(json).unwrap();
        assert!(event.component_id.is_none());
        assert!(!event.is_choice);
        assert!(event.selected_values.is_empty());
        assert!(event.channel_id.is_none());
        assert_eq!(event.source_id, SourceId::new("msg-1"));
    }

    #[test]
    fn test_incoming_event_choice_builder() {
        let event = IncomingEvent::choice("msg", "sel", &["a", "b"], ActorRef::new("u"))
            .in_channel("general");
        assert!(event.is_choice);
        assert_eq!(event.selected_values, vec!["a", "b"]);
        assert_eq!(event.component_id.as_deref(), Some("sel"));
        assert_eq!(event.channel_id, Some(ChannelId::new("general")));
    }
}
