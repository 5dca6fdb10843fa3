//! Dispatch coordinator.
//!
//! Drives one incoming event through intake, resolution, acknowledgement,
//! sequential execution and the final response. Every fault below this layer
//! is already a failure outcome; faults of the coordinator itself are caught
//! here and answered with the system error message.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use switchboard_core::config::{DispatchConfig, SwitchboardConfig};
use switchboard_core::types::DispatchId;
use tracing::Instrument;

use crate::aggregate::{aggregate, truncate};
use crate::error::{panic_message, DispatchError, SurfaceError};
use crate::executor::{ExecutionContext, Executor};
use crate::matcher::resolve;
use crate::parse::parse_configuration;
use crate::surface::{ConfigurationStore, InteractionSurface, Response, Surfaces};
use crate::types::{
    ActionRecord, DispatchOutcome, DispatchStatus, DispatchSummary, IncomingEvent, ResponseSlot,
};

/// Coordinates dispatches. Holds no per-dispatch state; share it freely.
pub struct Dispatcher {
    store: Arc<dyn ConfigurationStore>,
    interactions: Arc<dyn InteractionSurface>,
    surfaces: Surfaces,
    executor: Executor,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn ConfigurationStore>,
        interactions: Arc<dyn InteractionSurface>,
        surfaces: Surfaces,
        executor: Executor,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            interactions,
            surfaces,
            executor,
            config,
        }
    }

    /// Dispatcher with the built-in handlers, configured from `config`.
    pub fn from_config(
        config: &SwitchboardConfig,
        store: Arc<dyn ConfigurationStore>,
        interactions: Arc<dyn InteractionSurface>,
        surfaces: Surfaces,
    ) -> Self {
        Self::new(
            store,
            interactions,
            surfaces,
            Executor::from_config(config),
            config.dispatch.clone(),
        )
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Process one event to completion.
    ///
    /// Never fails. Events without a component id are ignored without a
    /// response; every other event gets exactly one response attempt.
    pub async fn dispatch(&self, event: &IncomingEvent) -> DispatchSummary {
        let mut summary = DispatchSummary::new(DispatchId::new());

        let Some(component_id) = event.component_id.as_deref().filter(|id| !id.is_empty()) else {
            tracing::debug!(source_id = %event.source_id, "Event has no component id, ignoring");
            return summary;
        };

        let span = tracing::info_span!(
            "dispatch",
            dispatch_id = %summary.dispatch_id,
            source_id = %event.source_id,
            actor_id = %event.actor.id,
            component_id,
        );

        async {
            let mut slot = ResponseSlot::Immediate;
            let result = AssertUnwindSafe(self.run(event, component_id, &mut summary, &mut slot))
                .catch_unwind()
                .await;

            let fault = match result {
                Ok(Ok(())) => return,
                Ok(Err(err)) => err,
                Err(panic) => DispatchError::Panicked(panic_message(panic.as_ref())),
            };

            tracing::error!(error = %fault, "Dispatch failed");
            summary.status = DispatchStatus::SystemError;
            let message = self.config.system_error_message.clone();
            let delivered = AssertUnwindSafe(self.deliver(event, &message, slot, &mut summary))
                .catch_unwind()
                .await;
            if let Err(panic) = delivered {
                summary.delivered = false;
                tracing::error!(
                    error = %panic_message(panic.as_ref()),
                    "Panicked while delivering the system error response"
                );
            }
        }
        .instrument(span)
        .await;

        summary
    }

    async fn run(
        &self,
        event: &IncomingEvent,
        component_id: &str,
        summary: &mut DispatchSummary,
        slot: &mut ResponseSlot,
    ) -> Result<(), DispatchError> {
        let raw = self
            .store
            .load(&event.source_id)
            .await
            .map_err(DispatchError::Store)?
            .unwrap_or(serde_json::Value::Null);
        let parsed = parse_configuration(&raw);
        let resolution = resolve(&parsed.configuration, component_id, &event.selected_values);

        if resolution.is_empty() {
            tracing::info!(matched = resolution.matched, "No actions configured");
            summary.status = DispatchStatus::NoActions;
            self.deliver(event, &self.config.no_actions_message, *slot, summary)
                .await;
            return Ok(());
        }

        *slot = self.acknowledge(event).await;

        let ctx = ExecutionContext::from_event(event, &self.surfaces);
        let mut outcome = DispatchOutcome::default();
        for action in resolution.actions {
            let result = self.executor.execute(action, &ctx).await;
            outcome.record(&result);
            summary.actions.push(ActionRecord {
                action: action.action_type(),
                outcome: result,
            });
        }

        tracing::info!(
            actions = summary.actions.len(),
            failures = summary.failure_count(),
            "Actions executed"
        );

        let text = aggregate(&outcome);
        if text.is_empty() {
            summary.status = DispatchStatus::NoActions;
            self.deliver(event, &self.config.no_actions_message, *slot, summary)
                .await;
        } else {
            summary.status = DispatchStatus::Completed;
            self.deliver(event, &text, *slot, summary).await;
        }
        Ok(())
    }

    /// Deferred acknowledgement. Returns the slot the response must use.
    async fn acknowledge(&self, event: &IncomingEvent) -> ResponseSlot {
        let timeout = Duration::from_millis(self.config.acknowledge_timeout_ms);
        let ack = self
            .interactions
            .acknowledge(event, self.config.private_responses);

        match tokio::time::timeout(timeout, ack).await {
            Ok(Ok(())) => ResponseSlot::FollowUp,
            Ok(Err(SurfaceError::AlreadyAcknowledged)) => {
                tracing::debug!("Interaction already acknowledged");
                ResponseSlot::FollowUp
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "Acknowledgement failed, continuing");
                ResponseSlot::Immediate
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.acknowledge_timeout_ms,
                    "Acknowledgement timed out, continuing"
                );
                ResponseSlot::Immediate
            }
        }
    }

    /// Send the final text through `slot`. Failures are logged, never retried.
    async fn deliver(
        &self,
        event: &IncomingEvent,
        text: &str,
        slot: ResponseSlot,
        summary: &mut DispatchSummary,
    ) {
        let response = Response {
            content: truncate(text, self.config.max_response_chars),
            private: self.config.private_responses,
        };
        summary.response = Some(response.content.clone());

        let (used, result) = match slot {
            ResponseSlot::Immediate => match self.interactions.reply(event, &response).await {
                Err(SurfaceError::AlreadyAcknowledged) => {
                    tracing::debug!("Immediate reply slot already used, sending a follow-up");
                    (
                        ResponseSlot::FollowUp,
                        self.interactions.follow_up(event, &response).await,
                    )
                }
                result => (ResponseSlot::Immediate, result),
            },
            ResponseSlot::FollowUp => (
                ResponseSlot::FollowUp,
                self.interactions.follow_up(event, &response).await,
            ),
        };

        summary.slot = Some(used);
        match result {
            Ok(()) => {
                summary.delivered = true;
                tracing::info!(slot = ?used, len = response.content.len(), "Response delivered");
            }
            Err(err) => {
                summary.delivered = false;
                tracing::error!(slot = ?used, error = %err, "Failed to deliver response");
            }
        }
    }
}
