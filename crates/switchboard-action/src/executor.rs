//! Action execution.
//!
//! The executor looks up the handler for an action, runs it under a timeout
//! and converts whatever happens into an [`Outcome`]. Nothing escapes: handler
//! errors, timeouts and panics all become failure outcomes.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use switchboard_core::config::SwitchboardConfig;
use switchboard_core::types::{ActorId, ActorRef, CapabilityId, ChannelId, SourceId};

use crate::error::{panic_message, ActionError};
use crate::handler::{ActionHandler, ActionRegistry, ActionReport};
use crate::locks::KeyedLocks;
use crate::surface::Surfaces;
use crate::template::TemplateVars;
use crate::types::{ActionKind, ActionSpec, IncomingEvent, Outcome};

const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);
const UNREGISTERED_FAILURE: &str = "Could not run {action}: {error}";

/// Everything an action may need about the dispatch it runs in.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub actor: &'a ActorRef,
    /// Channel the interaction happened in, if known.
    pub origin: Option<&'a ChannelId>,
    pub source_id: &'a SourceId,
    pub selected_values: &'a [String],
    pub surfaces: &'a Surfaces,
}

impl<'a> ExecutionContext<'a> {
    pub fn from_event(event: &'a IncomingEvent, surfaces: &'a Surfaces) -> Self {
        Self {
            actor: &event.actor,
            origin: event.channel_id.as_ref(),
            source_id: &event.source_id,
            selected_values: &event.selected_values,
            surfaces,
        }
    }

    /// Placeholder values for templates of `action`.
    pub fn template_vars(&self, action: &ActionKind) -> TemplateVars {
        let mut vars = TemplateVars::new()
            .with("user", self.actor.name())
            .with("user_id", self.actor.id.as_str())
            .with("values", self.selected_values.join(", "))
            .with("action", action.action_type().to_string());
        if let Some(origin) = self.origin {
            vars.set("channel", origin.as_str());
        }
        match action {
            ActionKind::GrantCapability(p)
            | ActionKind::RevokeCapability(p)
            | ActionKind::ToggleCapability(p) => vars.set("capability", p.capability.as_str()),
            ActionKind::NotifyChannel(p) => vars.set("channel", p.channel.as_str()),
            ActionKind::RelocateActor(p) => vars.set("target", p.target.as_str()),
            ActionKind::NotifyActor(_) | ActionKind::NotifyActorPrivately(_) => {}
        }
        vars
    }

    /// Render `template` with the placeholder values of `action`.
    pub fn render(&self, action: &ActionSpec, template: &str) -> String {
        self.template_vars(&action.kind).render(template)
    }
}

/// Runs single actions through the handler registry.
pub struct Executor {
    registry: ActionRegistry,
    action_timeout: Duration,
    report_unchanged: bool,
    locks: Option<KeyedLocks<(ActorId, CapabilityId)>>,
}

impl Executor {
    pub fn new(registry: ActionRegistry) -> Self {
        Self {
            registry,
            action_timeout: DEFAULT_ACTION_TIMEOUT,
            report_unchanged: false,
            locks: None,
        }
    }

    /// Executor with the built-in handlers, configured from `config`.
    pub fn from_config(config: &SwitchboardConfig) -> Self {
        Self::new(ActionRegistry::with_defaults())
            .with_action_timeout(Duration::from_millis(config.dispatch.action_timeout_ms))
            .with_report_unchanged(config.capabilities.report_unchanged)
            .with_serialized_updates(config.capabilities.serialize_updates)
    }

    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Use the unchanged template when a grant or revoke is a no-op.
    pub fn with_report_unchanged(mut self, enabled: bool) -> Self {
        self.report_unchanged = enabled;
        self
    }

    /// Serialize capability actions per (actor, capability) pair.
    ///
    /// Time spent queued for the pair's lock is part of the action timeout,
    /// so a queued action fails with a timeout rather than waiting on every
    /// action ahead of it.
    pub fn with_serialized_updates(mut self, enabled: bool) -> Self {
        self.locks = enabled.then(KeyedLocks::new);
        self
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Execute one action. Never fails; problems become failure outcomes.
    pub async fn execute(&self, action: &ActionSpec, ctx: &ExecutionContext<'_>) -> Outcome {
        let action_type = action.action_type();
        let vars = ctx.template_vars(&action.kind);

        let Some(handler) = self.registry.get(action_type) else {
            let err = ActionError::UnregisteredHandler(action_type);
            tracing::warn!(action = %action_type, "No handler registered");
            return failure(action, UNREGISTERED_FAILURE, &err, vars);
        };

        tracing::debug!(action = %handler.describe(action), "Executing action");

        match self.run(handler.as_ref(), action, ctx).await {
            Ok(report) => Outcome::success(vars.render(self.success_template(action, &report))),
            Err(err) => {
                tracing::info!(action = %action_type, error = %err, "Action failed");
                failure(action, handler.failure_message(), &err, vars)
            }
        }
    }

    async fn run(
        &self,
        handler: &dyn ActionHandler,
        action: &ActionSpec,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ActionReport, ActionError> {
        // Waiting for the per-key lock counts against the action timeout.
        let bounded = async {
            let _guard = match (&self.locks, action.kind.capability()) {
                (Some(locks), Some(capability)) => Some(
                    locks
                        .acquire((ctx.actor.id.clone(), capability.clone()))
                        .await,
                ),
                _ => None,
            };
            AssertUnwindSafe(handler.execute(action, ctx))
                .catch_unwind()
                .await
        };
        match tokio::time::timeout(self.action_timeout, bounded).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(ActionError::Panicked(panic_message(panic.as_ref()))),
            Err(_) => Err(ActionError::Timeout(self.action_timeout.as_millis() as u64)),
        }
    }

    fn success_template<'s>(&self, action: &'s ActionSpec, report: &ActionReport) -> &'s str {
        match *report {
            ActionReport::Unchanged {
                unchanged_message, ..
            } if self.report_unchanged => action
                .unchanged_template
                .as_deref()
                .unwrap_or(unchanged_message),
            ActionReport::Applied { message } | ActionReport::Unchanged { message, .. } => {
                action.success_template.as_deref().unwrap_or(message)
            }
        }
    }
}

fn failure(
    action: &ActionSpec,
    default_template: &str,
    err: &ActionError,
    vars: TemplateVars,
) -> Outcome {
    let vars = vars.with("error", err.to_string());
    let template = action.failure_template.as_deref().unwrap_or(default_template);
    Outcome::failure(vars.render(template))
}
