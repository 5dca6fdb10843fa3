//! Declarative interaction-action dispatcher.
//!
//! Interprets stored component configurations at runtime: matches an incoming
//! interaction to a component, resolves its ordered action list, executes the
//! actions through pluggable handlers and reports one consolidated response.

pub mod aggregate;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod handler;
pub mod locks;
pub mod matcher;
pub mod memory;
pub mod parse;
pub mod surface;
pub mod template;
pub mod types;

pub use aggregate::aggregate;
pub use dispatcher::Dispatcher;
pub use error::{ActionError, DispatchError, SurfaceError};
pub use executor::{ExecutionContext, Executor};
pub use handler::{ActionHandler, ActionRegistry, ActionReport};
pub use matcher::{resolve, Resolution};
pub use parse::{parse_configuration, ConfigDiagnostic, ParsedConfiguration};
pub use surface::{
    CapabilitySurface, ConfigurationStore, InteractionSurface, MessageSurface, PresenceSurface,
    Response, Surfaces,
};
pub use types::{
    ActionKind, ActionRecord, ActionSpec, ActionType, ChoiceOption, ComponentDefinition,
    ComponentKind, ComponentRow, Configuration, DispatchOutcome, DispatchStatus, DispatchSummary,
    IncomingEvent, Outcome, ResponseSlot,
};
