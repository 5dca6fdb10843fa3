//! Component matching and action resolution.

use crate::types::{ActionSpec, ComponentKind, Configuration};

/// Result of matching an event against a configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    pub matched: bool,
    /// Actions to run, in execution order.
    pub actions: Vec<&'a ActionSpec>,
}

impl Resolution<'_> {
    fn unmatched() -> Self {
        Self {
            matched: false,
            actions: Vec::new(),
        }
    }

    /// True when there is nothing to execute, matched or not.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Find the component with `component_id` and resolve its action list.
///
/// Rows are scanned in order, components within a row in order, and the
/// first component with a matching id wins. For choice components the base
/// actions come first, followed by the actions of every option whose value
/// was selected, in the order the values were selected.
pub fn resolve<'a>(
    config: &'a Configuration,
    component_id: &str,
    selected_values: &[String],
) -> Resolution<'a> {
    let Some(component) = config.components().find(|c| c.id == component_id) else {
        return Resolution::unmatched();
    };

    let mut actions: Vec<&ActionSpec> = component.actions.iter().collect();
    if component.kind == ComponentKind::Choice {
        for value in selected_values {
            actions.extend(
                component
                    .options
                    .iter()
                    .filter(|option| &option.value == value)
                    .flat_map(|option| option.actions.iter()),
            );
        }
    }

    Resolution {
        matched: true,
        actions,
    }
}
