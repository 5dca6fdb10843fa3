//! Switchboard application binary.
//!
//! 1. Load configuration from TOML
//! 2. Install tracing
//! 3. Run the requested command: dispatch one event against a fixture, or
//!    lint a component configuration file

mod cli;
mod fixture;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use switchboard_action::memory::{InteractionCall, SentMessage};
use switchboard_action::parse::parse_configuration_str;
use switchboard_action::{DispatchSummary, IncomingEvent};
use switchboard_core::config::SwitchboardConfig;

use cli::{CliArgs, Command};
use fixture::Fixture;

/// What a dispatch did, as printed by `switchboard dispatch`.
#[derive(Serialize)]
struct DispatchReport {
    summary: DispatchSummary,
    interactions: Vec<InteractionCall>,
    messages: Vec<SentMessage>,
}

async fn dispatch(
    config: &SwitchboardConfig,
    fixture_path: &Path,
    event_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let fixture = Fixture::load(fixture_path)?;
    let event: IncomingEvent = serde_json::from_str(&std::fs::read_to_string(event_path)?)?;

    let sandbox = fixture.sandbox();
    let summary = sandbox.dispatcher(config).dispatch(&event).await;

    if let Some(ref response) = summary.response {
        println!("{}", response);
        println!();
    }

    let report = DispatchReport {
        summary,
        interactions: sandbox.interactions.calls(),
        messages: sandbox.messages.sent(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print the problems found in a configuration file. Returns whether it is clean.
fn check(components_path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    let parsed = parse_configuration_str(&std::fs::read_to_string(components_path)?)?;

    for diagnostic in &parsed.diagnostics {
        println!("{}", diagnostic);
    }

    let components = parsed.configuration.components().count();
    let actions: usize = parsed
        .configuration
        .components()
        .map(|c| c.actions.len() + c.options.iter().map(|o| o.actions.len()).sum::<usize>())
        .sum();
    println!(
        "{} components, {} actions, {} problems",
        components,
        actions,
        parsed.diagnostics.len()
    );

    Ok(parsed.is_clean())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing exists so its log level can apply.
    let config_file = args.resolve_config_path();
    let loaded = config_file
        .exists()
        .then(|| SwitchboardConfig::load(&config_file));
    let config = match loaded {
        Some(Ok(ref config)) => config.clone(),
        _ => SwitchboardConfig::default(),
    };

    // Tracing. RUST_LOG wins over both the flag and the config file.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    match loaded {
        Some(Ok(_)) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(Err(e)) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        None => tracing::debug!(path = %config_file.display(), "No config file, using defaults"),
    }

    match args.command {
        Command::Dispatch { fixture, event } => {
            dispatch(&config, &fixture, &event).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { components } => Ok(if check(&components)? {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_check_clean_configuration() {
        let file = write_json(r#"[[{"custom_id": "a", "actions": [{"type": "notify_actor"}]}]]"#);
        assert!(check(file.path()).unwrap());
    }

    #[test]
    fn test_check_reports_dropped_entries() {
        let file = write_json(r#"[[{"custom_id": "a", "actions": [{"type": "unknown"}]}]]"#);
        assert!(!check(file.path()).unwrap());
    }

    #[test]
    fn test_check_rejects_invalid_json() {
        let file = write_json("[[");
        assert!(check(file.path()).is_err());
    }

    #[tokio::test]
    async fn test_dispatch_from_files() {
        let fixture = write_json(
            r#"{
                "configurations": {"msg": [[{"custom_id": "btn",
                    "actions": [{"type": "GrantCapability", "cap": "X"}]}]]},
                "capabilities": ["X"]
            }"#,
        );
        let event = write_json(
            r#"{"component_id": "btn", "actor": {"id": "u1"}, "source_id": "msg"}"#,
        );
        dispatch(&SwitchboardConfig::default(), fixture.path(), event.path())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_with_invalid_event() {
        let fixture = write_json("{}");
        let event = write_json(r#"{"component_id": "btn"}"#);
        assert!(
            dispatch(&SwitchboardConfig::default(), fixture.path(), event.path())
                .await
                .is_err()
        );
    }
}
