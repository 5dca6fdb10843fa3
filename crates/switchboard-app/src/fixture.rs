//! Fixture files describing stored configurations and simulated surface state.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use switchboard_action::memory::{AckBehavior, Sandbox};
use switchboard_core::error::Result;

/// Everything needed to seed a [`Sandbox`].
///
/// ```json
/// {
///   "configurations": { "msg-1": [[{"custom_id": "btn", "actions": []}]] },
///   "capabilities": ["Member"],
///   "held": { "u1": ["Member"] },
///   "channels": ["general"],
///   "sessions": { "u1": "lobby" },
///   "acknowledge": "already_acknowledged"
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    /// Raw component configurations keyed by source id.
    pub configurations: BTreeMap<String, serde_json::Value>,
    pub capabilities: Vec<String>,
    /// Capabilities that exist but cannot be granted or revoked.
    pub denied_capabilities: Vec<String>,
    /// Capabilities already held, keyed by actor id.
    pub held: BTreeMap<String, Vec<String>>,
    pub channels: Vec<String>,
    /// Actors refusing private messages.
    pub private_blocked: Vec<String>,
    pub relocation_targets: Vec<String>,
    /// Current channel of each connected actor.
    pub sessions: BTreeMap<String, String>,
    pub acknowledge: AckBehavior,
    pub fail_delivery: bool,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Fixture loaded");
        Ok(fixture)
    }

    pub fn sandbox(&self) -> Sandbox {
        let mut sandbox = Sandbox::new();
        for (source, configuration) in &self.configurations {
            sandbox = sandbox.with_configuration(source, configuration.clone());
        }
        for capability in &self.capabilities {
            sandbox = sandbox.with_capability(capability);
        }
        for capability in &self.denied_capabilities {
            sandbox = sandbox.with_denied(capability);
        }
        for (actor, capabilities) in &self.held {
            for capability in capabilities {
                sandbox = sandbox.with_held(actor, capability);
            }
        }
        for channel in &self.channels {
            sandbox = sandbox.with_channel(channel);
        }
        for actor in &self.private_blocked {
            sandbox = sandbox.with_private_messages_blocked(actor);
        }
        for target in &self.relocation_targets {
            sandbox = sandbox.with_relocation_target(target);
        }
        for (actor, channel) in &self.sessions {
            sandbox = sandbox.with_session(actor, channel);
        }
        sandbox.interactions.set_ack_behavior(self.acknowledge);
        sandbox.interactions.set_fail_delivery(self.fail_delivery);
        sandbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use switchboard_core::types::{ActorId, CapabilityId, ChannelId};
    use tempfile::NamedTempFile;

    fn write_fixture(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_fixture() {
        let file = write_fixture(
            r#"{
                "configurations": {"msg": [[{"custom_id": "btn"}]]},
                "capabilities": ["X"],
                "held": {"u1": ["Y"]},
                "sessions": {"u1": "lobby"},
                "acknowledge": "fail"
            }"#,
        );
        let fixture = Fixture::load(file.path()).unwrap();
        assert_eq!(fixture.capabilities, vec!["X"]);
        assert_eq!(fixture.acknowledge, AckBehavior::Fail);
        assert!(!fixture.fail_delivery);

        let sandbox = fixture.sandbox();
        assert!(sandbox
            .capabilities
            .holds(&ActorId::new("u1"), &CapabilityId::new("Y")));
        assert_eq!(
            sandbox.presence.location(&ActorId::new("u1")),
            Some(ChannelId::new("lobby"))
        );
    }

    #[test]
    fn test_empty_fixture() {
        let file = write_fixture("{}");
        let fixture = Fixture::load(file.path()).unwrap();
        assert!(fixture.configurations.is_empty());
        assert_eq!(fixture.acknowledge, AckBehavior::Accept);
    }

    #[test]
    fn test_invalid_fixture() {
        let file = write_fixture("[not json");
        assert!(Fixture::load(file.path()).is_err());
        assert!(Fixture::load(Path::new("/nonexistent/fixture.json")).is_err());
    }
}
