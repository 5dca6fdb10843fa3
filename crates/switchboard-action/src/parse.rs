//! Lenient parser for stored component configurations.
//!
//! The stored shape is `list<list<component>>`. Malformed entries never fail
//! the whole parse: each one is dropped, reported as a [`ConfigDiagnostic`]
//! and logged, and contributes no actions.

use serde_json::{Map, Value};
use switchboard_core::types::{CapabilityId, ChannelId};

use crate::types::{
    ActionKind, ActionSpec, ActionType, CapabilityParams, ChannelNotifyParams, ChoiceOption,
    ComponentDefinition, ComponentKind, ComponentRow, Configuration, NotifyParams,
    RelocateParams,
};

const CAPABILITY_KEYS: &[&str] = &["capability", "cap", "role", "role_id"];
const CHANNEL_KEYS: &[&str] = &["channel", "channel_id", "target"];
const TARGET_KEYS: &[&str] = &["target", "channel", "channel_id"];
const MESSAGE_KEYS: &[&str] = &["message", "content"];

/// A configuration entry that was dropped while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDiagnostic {
    /// Path of the entry, e.g. `rows[0][1].actions[2]`.
    pub location: String,
    pub reason: String,
}

impl std::fmt::Display for ConfigDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.reason)
    }
}

/// Parsed configuration plus everything that had to be dropped.
#[derive(Debug, Clone, Default)]
pub struct ParsedConfiguration {
    pub configuration: Configuration,
    pub diagnostics: Vec<ConfigDiagnostic>,
}

impl ParsedConfiguration {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parse a stored configuration value.
pub fn parse_configuration(value: &Value) -> ParsedConfiguration {
    let mut parser = Parser::default();
    let rows = match value {
        Value::Null => Vec::new(),
        Value::Array(rows) => rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| parser.row(row, &format!("rows[{}]", i)))
            .collect(),
        _ => {
            parser.drop_entry("rows", "configuration is not a list of rows");
            Vec::new()
        }
    };

    let configuration = Configuration::new(rows);
    for id in configuration.duplicate_ids() {
        parser.drop_entry(
            format!("component '{}'", id),
            "duplicate component id, the first occurrence wins",
        );
    }

    ParsedConfiguration {
        configuration,
        diagnostics: parser.diagnostics,
    }
}

/// Parse a stored configuration from JSON text.
pub fn parse_configuration_str(json: &str) -> Result<ParsedConfiguration, serde_json::Error> {
    let value: Value = serde_json::from_str(json)?;
    Ok(parse_configuration(&value))
}

#[derive(Default)]
struct Parser {
    diagnostics: Vec<ConfigDiagnostic>,
}

impl Parser {
    fn drop_entry(&mut self, location: impl Into<String>, reason: impl Into<String>) {
        let diagnostic = ConfigDiagnostic {
            location: location.into(),
            reason: reason.into(),
        };
        tracing::warn!(location = %diagnostic.location, reason = %diagnostic.reason, "Configuration entry ignored");
        self.diagnostics.push(diagnostic);
    }

    fn row(&mut self, value: &Value, loc: &str) -> Option<ComponentRow> {
        // Platform action rows wrap their components in an object.
        let components = match value {
            Value::Array(components) => components,
            Value::Object(obj) => match obj.get("components") {
                Some(Value::Array(components)) => components,
                _ => {
                    self.drop_entry(loc, "row has no component list");
                    return None;
                }
            },
            _ => {
                self.drop_entry(loc, "row is not a list");
                return None;
            }
        };

        Some(
            components
                .iter()
                .enumerate()
                .filter_map(|(i, c)| self.component(c, &format!("{}[{}]", loc, i)))
                .collect(),
        )
    }

    fn component(&mut self, value: &Value, loc: &str) -> Option<ComponentDefinition> {
        let Some(obj) = value.as_object() else {
            self.drop_entry(loc, "component is not an object");
            return None;
        };

        let id = match string_field(obj, &["custom_id", "id"]) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                self.drop_entry(loc, "component has no custom_id");
                return None;
            }
        };

        let kind = match obj.get("type") {
            Some(Value::Number(code)) => code.as_i64().map(ComponentKind::from_wire),
            Some(Value::String(name)) => component_kind_name(name),
            _ => None,
        }
        .unwrap_or(if obj.contains_key("options") {
            ComponentKind::Choice
        } else {
            ComponentKind::Button
        });

        let actions = self.actions(obj.get("actions"), &format!("{}.actions", loc));
        let options = match kind {
            ComponentKind::Choice => self.options(obj.get("options"), &format!("{}.options", loc)),
            ComponentKind::Button => Vec::new(),
        };

        Some(ComponentDefinition {
            id,
            kind,
            actions,
            options,
        })
    }

    fn options(&mut self, value: Option<&Value>, loc: &str) -> Vec<ChoiceOption> {
        let options = match value {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(options)) => options,
            Some(_) => {
                self.drop_entry(loc, "options is not a list");
                return Vec::new();
            }
        };

        let mut parsed = Vec::with_capacity(options.len());
        for (i, option) in options.iter().enumerate() {
            let opt_loc = format!("{}[{}]", loc, i);
            let Some(obj) = option.as_object() else {
                self.drop_entry(opt_loc, "option is not an object");
                continue;
            };
            let Some(value) = string_field(obj, &["value"]) else {
                self.drop_entry(opt_loc, "option has no value");
                continue;
            };
            let actions = self.actions(obj.get("actions"), &format!("{}.actions", opt_loc));
            parsed.push(ChoiceOption::new(value, actions));
        }
        parsed
    }

    fn actions(&mut self, value: Option<&Value>, loc: &str) -> Vec<ActionSpec> {
        let actions = match value {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(actions)) => actions,
            Some(_) => {
                self.drop_entry(loc, "actions is not a list");
                return Vec::new();
            }
        };

        actions
            .iter()
            .enumerate()
            .filter_map(|(i, a)| match parse_action(a) {
                Ok(spec) => Some(spec),
                Err(reason) => {
                    self.drop_entry(format!("{}[{}]", loc, i), reason);
                    None
                }
            })
            .collect()
    }
}

fn component_kind_name(name: &str) -> Option<ComponentKind> {
    match name.to_ascii_lowercase().as_str() {
        "button" => Some(ComponentKind::Button),
        "choice" | "select" | "string_select" | "select_menu" => Some(ComponentKind::Choice),
        _ => None,
    }
}

fn parse_action(value: &Value) -> Result<ActionSpec, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "action is not an object".to_string())?;
    let type_name =
        string_field(obj, &["type"]).ok_or_else(|| "action has no type".to_string())?;
    let action_type: ActionType = type_name.parse()?;
    let params = Params::new(obj);

    let kind = match action_type {
        ActionType::GrantCapability => ActionKind::GrantCapability(capability_params(&params)?),
        ActionType::RevokeCapability => ActionKind::RevokeCapability(capability_params(&params)?),
        ActionType::ToggleCapability => ActionKind::ToggleCapability(capability_params(&params)?),
        ActionType::NotifyActor => ActionKind::NotifyActor(NotifyParams {
            message: params.string(MESSAGE_KEYS),
        }),
        ActionType::NotifyActorPrivately => ActionKind::NotifyActorPrivately(NotifyParams {
            message: params.string(MESSAGE_KEYS),
        }),
        ActionType::NotifyChannel => ActionKind::NotifyChannel(ChannelNotifyParams {
            channel: ChannelId::new(params.require(CHANNEL_KEYS, "channel")?),
            message: params.string(MESSAGE_KEYS),
        }),
        ActionType::RelocateActor => ActionKind::RelocateActor(RelocateParams {
            target: ChannelId::new(params.require(TARGET_KEYS, "target")?),
        }),
    };

    Ok(ActionSpec {
        kind,
        success_template: string_field(obj, &["success_message"]).map(str::to_string),
        failure_template: string_field(obj, &["failure_message"]).map(str::to_string),
        unchanged_template: string_field(obj, &["unchanged_message"]).map(str::to_string),
    })
}

fn capability_params(params: &Params<'_>) -> Result<CapabilityParams, String> {
    Ok(CapabilityParams {
        capability: CapabilityId::new(params.require(CAPABILITY_KEYS, "capability")?),
    })
}

/// Type-specific keys, looked up at the top level of the action first and
/// then in a nested `params`/`parameters` object.
struct Params<'a> {
    scopes: Vec<&'a Map<String, Value>>,
}

impl<'a> Params<'a> {
    fn new(action: &'a Map<String, Value>) -> Self {
        let mut scopes = vec![action];
        for key in ["params", "parameters"] {
            if let Some(Value::Object(nested)) = action.get(key) {
                scopes.push(nested);
            }
        }
        Self { scopes }
    }

    fn string(&self, keys: &[&str]) -> Option<String> {
        self.scopes.iter().find_map(|scope| scalar_field(scope, keys))
    }

    fn require(&self, keys: &[&str], what: &str) -> Result<String, String> {
        self.string(keys)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("action is missing its {}", what))
    }
}

fn string_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
}

/// Like `string_field`, but numeric ids are accepted too.
fn scalar_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_button_with_grant() {
        let parsed = parse_configuration(&json!([[{
            "custom_id": "btn1",
            "type": 2,
            "actions": [{"type": "GrantCapability", "params": {"cap": "X"}, "success_message": "granted X"}]
        }]]));
        assert!(parsed.is_clean());

        let component = parsed.configuration.components().next().unwrap();
        assert_eq!(component.id, "btn1");
        assert_eq!(component.kind, ComponentKind::Button);
        assert_eq!(component.actions.len(), 1);
        assert_eq!(
            component.actions[0].kind,
            ActionKind::GrantCapability(CapabilityParams {
                capability: CapabilityId::new("X")
            })
        );
        assert_eq!(component.actions[0].success_template.as_deref(), Some("granted X"));
    }

    #[test]
    fn test_parse_choice_with_options() {
        let parsed = parse_configuration(&json!([[{
            "custom_id": "sel1",
            "type": 3,
            "actions": [],
            "options": [
                {"value": "a", "actions": [{"type": "notify_actor", "success_message": "hi"}]},
                {"value": "b"}
            ]
        }]]));
        assert!(parsed.is_clean());

        let component = parsed.configuration.components().next().unwrap();
        assert_eq!(component.kind, ComponentKind::Choice);
        assert_eq!(component.options.len(), 2);
        assert_eq!(component.options[0].value, "a");
        assert_eq!(component.options[0].actions.len(), 1);
        // Missing actions key is treated as empty
        assert!(component.options[1].actions.is_empty());
    }

    #[test]
    fn test_parse_top_level_params_and_numeric_ids() {
        let parsed = parse_configuration(&json!([[{
            "custom_id": "b",
            "actions": [
                {"type": "revoke_capability", "role_id": 123456789},
                {"type": "notify_channel", "channel_id": "logs", "message": "{user} pressed"},
                {"type": "relocate_actor", "parameters": {"target": "lobby"}}
            ]
        }]]));
        assert!(parsed.is_clean());

        let actions = &parsed.configuration.components().next().unwrap().actions;
        assert_eq!(actions[0].kind.capability(), Some(&CapabilityId::new("123456789")));
        assert_eq!(
            actions[1].kind,
            ActionKind::NotifyChannel(ChannelNotifyParams {
                channel: ChannelId::new("logs"),
                message: Some("{user} pressed".to_string()),
            })
        );
        assert_eq!(
            actions[2].kind,
            ActionKind::RelocateActor(RelocateParams {
                target: ChannelId::new("lobby")
            })
        );
    }

    #[test]
    fn test_kind_inferred_from_options_when_type_missing() {
        let parsed = parse_configuration(&json!([[
            {"custom_id": "pick", "options": []},
            {"custom_id": "press"}
        ]]));
        let kinds: Vec<_> = parsed.configuration.components().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ComponentKind::Choice, ComponentKind::Button]);
    }

    #[test]
    fn test_kind_by_name() {
        let parsed = parse_configuration(&json!([[
            {"id": "a", "type": "Button"},
            {"id": "b", "type": "Choice"},
            {"id": "c", "type": "string_select"}
        ]]));
        let kinds: Vec<_> = parsed.configuration.components().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ComponentKind::Button, ComponentKind::Choice, ComponentKind::Choice]
        );
    }

    #[test]
    fn test_platform_row_objects_are_unwrapped() {
        let parsed = parse_configuration(&json!([
            {"type": 1, "components": [{"custom_id": "a", "type": 2}]}
        ]));
        assert!(parsed.is_clean());
        assert_eq!(parsed.configuration.components().count(), 1);
    }

    #[test]
    fn test_malformed_entries_are_dropped_not_fatal() {
        let parsed = parse_configuration(&json!([
            "not a row",
            [
                {"type": 2},
                42,
                {"custom_id": "ok", "actions": [
                    {"type": "grant_capability"},
                    {"type": "launch_rockets"},
                    "nope",
                    {"type": "toggle_capability", "capability": "Y"}
                ]}
            ]
        ]));

        let components: Vec<_> = parsed.configuration.components().collect();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].id, "ok");
        assert_eq!(components[0].actions.len(), 1);
        assert_eq!(components[0].actions[0].action_type(), ActionType::ToggleCapability);

        let locations: Vec<_> = parsed.diagnostics.iter().map(|d| d.location.as_str()).collect();
        assert_eq!(
            locations,
            vec![
                "rows[0]",
                "rows[1][0]",
                "rows[1][1]",
                "rows[1][2].actions[0]",
                "rows[1][2].actions[1]",
                "rows[1][2].actions[2]",
            ]
        );
        assert!(parsed.diagnostics[4].reason.contains("launch_rockets"));
    }

    #[test]
    fn test_actions_not_a_list_contributes_nothing() {
        let parsed = parse_configuration(&json!([[{"custom_id": "a", "actions": {"type": "x"}}]]));
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.configuration.components().next().unwrap().actions.is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_reported() {
        let parsed = parse_configuration(&json!([[{"custom_id": "a"}], [{"custom_id": "a"}]]));
        assert_eq!(parsed.configuration.components().count(), 2);
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.diagnostics[0].reason.contains("duplicate"));
    }

    #[test]
    fn test_null_and_non_list_configurations() {
        let parsed = parse_configuration(&Value::Null);
        assert!(parsed.is_clean());
        assert!(parsed.configuration.is_empty());

        let parsed = parse_configuration(&json!({"rows": []}));
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(parsed.configuration.is_empty());
    }

    #[test]
    fn test_parse_configuration_str() {
        let parsed = parse_configuration_str(r#"[[{"custom_id": "a", "type": 2}]]"#).unwrap();
        assert_eq!(parsed.configuration.components().count(), 1);
        assert!(parse_configuration_str("[[").is_err());
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = ConfigDiagnostic {
            location: "rows[0][0]".to_string(),
            reason: "component has no custom_id".to_string(),
        };
        assert_eq!(diagnostic.to_string(), "rows[0][0]: component has no custom_id");
    }
}
