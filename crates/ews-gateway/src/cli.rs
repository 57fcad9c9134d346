//! Command line handling
//!
//! Parses arguments, loads event files and turns a command into a rendered
//! EWS request document.

use anyhow::{Context, bail};
use ews_calendar::request::{delete_event, get_item, new_event, update_item};
use ews_calendar::{BaseShape, CalendarEvent, Config, Element, UpdateRequest, soap};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq)]
pub enum RunMode {
    /// Show help
    Help,
    /// Show version
    Version,
    /// Build a request
    Run(Invocation),
}

/// A request to build plus output flags
#[derive(Debug, PartialEq)]
pub struct Invocation {
    pub command: Command,
    pub config_path: Option<PathBuf>,
    pub envelope: bool,
    pub pretty: bool,
}

/// Request builder to run
#[derive(Debug, PartialEq)]
pub enum Command {
    Get {
        id: String,
        /// Falls back to the configured shape
        shape: Option<BaseShape>,
    },
    Create {
        path: PathBuf,
    },
    Delete {
        path: PathBuf,
    },
    Update {
        path: PathBuf,
        fields: Vec<String>,
        /// Overrides the configured resend mode when set
        changed_only: bool,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "GetItem",
            Self::Create { .. } => "CreateItem",
            Self::Delete { .. } => "DeleteItem",
            Self::Update { .. } => "UpdateItem",
        }
    }
}

/// Parse command line arguments (without the program name)
pub fn parse_args<I>(args: I) -> anyhow::Result<RunMode>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut positional = Vec::new();
    let mut config_path = None;
    let mut envelope = false;
    let mut pretty = false;
    let mut shape = None;
    let mut fields = Vec::new();
    let mut changed_only = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let path = args.next().context("--config requires a path")?;
                config_path = Some(PathBuf::from(path));
            }
            "--shape" => {
                let value = args.next().context("--shape requires a value")?;
                shape = Some(value.parse::<BaseShape>()?);
            }
            "--fields" => {
                let value = args.next().context("--fields requires a comma-separated list")?;
                fields.extend(
                    value
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty()),
                );
            }
            "--changed-only" => changed_only = true,
            "--envelope" => envelope = true,
            "--pretty" => pretty = true,
            other if other.starts_with('-') => bail!("unknown option: {}", other),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let Some(verb) = positional.next() else {
        return Ok(RunMode::Help);
    };
    let operand = positional
        .next()
        .with_context(|| format!("'{}' requires an argument", verb))?;
    if let Some(extra) = positional.next() {
        bail!("unexpected argument: {}", extra);
    }

    let command = match verb.as_str() {
        "get" => Command::Get { id: operand, shape },
        "create" => Command::Create {
            path: PathBuf::from(operand),
        },
        "delete" => Command::Delete {
            path: PathBuf::from(operand),
        },
        "update" => {
            if fields.is_empty() {
                bail!("'update' requires --fields");
            }
            Command::Update {
                path: PathBuf::from(operand),
                fields,
                changed_only,
            }
        }
        other => bail!("unknown command: {}", other),
    };

    Ok(RunMode::Run(Invocation {
        command,
        config_path,
        envelope,
        pretty,
    }))
}

/// Load `.env` (or the given file) into the process environment.
///
/// Existing variables are not overwritten. Returns whether a file was read.
pub fn load_env_file(path: Option<&Path>) -> bool {
    match path {
        Some(path) => dotenvy::from_path(path).is_ok(),
        None => dotenvy::dotenv().is_ok(),
    }
}

/// Log filter from `RUST_LOG`-style directives, `info` when unset
pub fn log_filter(directives: Option<String>) -> anyhow::Result<EnvFilter> {
    let directives = directives
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| "info".to_string());
    EnvFilter::try_new(&directives).with_context(|| format!("Invalid log filter: {}", directives))
}

/// Load an event from a TOML (`*.toml`) or JSON file
pub fn load_event(path: &Path) -> anyhow::Result<CalendarEvent> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file {}", path.display()))?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let event = if is_toml {
        toml::from_str(&content).with_context(|| format!("Invalid TOML event in {}", path.display()))?
    } else {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON event in {}", path.display()))?
    };

    info!("Loaded event from {}", path.display());
    Ok(event)
}

/// Run the builder for `command`
pub fn build_document(command: &Command, config: &Config) -> anyhow::Result<Element> {
    let document = match command {
        Command::Get { id, shape } => get_item(id, shape.unwrap_or(config.request.base_shape)),
        Command::Create { path } => new_event(&load_event(path)?)?,
        Command::Delete { path } => delete_event(&load_event(path)?)?,
        Command::Update {
            path,
            fields,
            changed_only,
        } => {
            let request = UpdateRequest::new(load_event(path)?)
                .with_field_names(fields, config.request.strict_fields)?
                .send_only_to_changed_attendees(*changed_only || config.request.send_only_to_changed_attendees);
            update_item(&request)?
        }
    };
    Ok(document)
}

/// Serialize a document, wrapping it in a SOAP envelope when configured
pub fn render(document: Element, config: &Config) -> anyhow::Result<String> {
    let document = if config.output.envelope {
        soap::wrap(document, &config.request.server_version)
    } else {
        document
    };
    Ok(document.write(config.output.write_options())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn event_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const STORED_EVENT: &str = r#"{
        "id": "AAMkAGI2",
        "change_key": "DwAAABYA",
        "subject": "Design sync",
        "start": "2024-09-03T10:00:00-04:00",
        "end": "2024-09-03T11:00:00-04:00",
        "attendees": [{"email": "alice@example.com"}]
    }"#;

    #[test]
    fn test_log_filter_reads_env_file() {
        let file = event_file(".env", "EWS_GATEWAY_TEST_LOG=ews_calendar=debug\n");
        assert!(load_env_file(Some(file.path())));

        let filter = log_filter(std::env::var("EWS_GATEWAY_TEST_LOG").ok()).unwrap();
        assert!(filter.to_string().contains("ews_calendar=debug"));

        unsafe {
            std::env::remove_var("EWS_GATEWAY_TEST_LOG");
        }
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).unwrap().to_string(), "info");
        assert_eq!(log_filter(Some("  ".to_string())).unwrap().to_string(), "info");
    }

    #[test]
    fn test_parse_help_and_version() {
        assert_eq!(parse_args(args(&[])).unwrap(), RunMode::Help);
        assert_eq!(parse_args(args(&["get", "x", "--help"])).unwrap(), RunMode::Help);
        assert_eq!(parse_args(args(&["-v"])).unwrap(), RunMode::Version);
    }

    #[test]
    fn test_parse_get() {
        let mode = parse_args(args(&["get", "AAMk", "--shape", "IdOnly", "--envelope"])).unwrap();
        assert_eq!(
            mode,
            RunMode::Run(Invocation {
                command: Command::Get {
                    id: "AAMk".to_string(),
                    shape: Some(BaseShape::IdOnly),
                },
                config_path: None,
                envelope: true,
                pretty: false,
            })
        );
    }

    #[test]
    fn test_parse_update() {
        let mode = parse_args(args(&[
            "--config",
            "custom.toml",
            "update",
            "event.json",
            "--fields",
            "subject, location,,",
            "--changed-only",
        ]))
        .unwrap();
        let RunMode::Run(invocation) = mode else {
            panic!("expected run mode");
        };
        assert_eq!(invocation.config_path, Some(PathBuf::from("custom.toml")));
        assert_eq!(
            invocation.command,
            Command::Update {
                path: PathBuf::from("event.json"),
                fields: vec!["subject".to_string(), "location".to_string()],
                changed_only: true,
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(args(&["update", "event.json"])).is_err());
        assert!(parse_args(args(&["get"])).is_err());
        assert!(parse_args(args(&["move", "x"])).is_err());
        assert!(parse_args(args(&["get", "x", "--bogus"])).is_err());
        assert!(parse_args(args(&["get", "x", "--shape", "Everything"])).is_err());
    }

    #[test]
    fn test_get_uses_configured_shape() {
        let mut config = Config::default();
        config.request.base_shape = BaseShape::AllProperties;
        let command = Command::Get {
            id: "AAMk".to_string(),
            shape: None,
        };
        let document = build_document(&command, &config).unwrap();
        assert_eq!(document.find("m:ItemShape/t:BaseShape").unwrap().text(), "AllProperties");
    }

    #[test]
    fn test_create_from_toml_file() {
        let file = event_file(
            ".toml",
            r#"
            subject = "Launch"
            start = "2024-09-03T10:00:00+02:00"
            end = "2024-09-03T11:00:00+02:00"

            [[attendees]]
            email = "room-7@example.com"
            role = "resource"
            "#,
        );
        let command = Command::Create {
            path: file.path().to_path_buf(),
        };
        let document = build_document(&command, &Config::default()).unwrap();
        let item = document.find("m:Items/t:CalendarItem").unwrap();
        assert_eq!(item.child("t:Start").unwrap().text(), "2024-09-03T08:00:00Z");
        assert!(item.child("t:Resources").is_some());
        assert!(item.child("t:RequiredAttendees").is_none());
    }

    #[test]
    fn test_update_from_json_file() {
        let file = event_file(".json", STORED_EVENT);
        let command = Command::Update {
            path: file.path().to_path_buf(),
            fields: vec!["start".to_string()],
            changed_only: true,
        };
        let document = build_document(&command, &Config::default()).unwrap();
        assert_eq!(
            document.attr("SendMeetingInvitationsOrCancellations"),
            Some("SendToChangedAndSaveCopy")
        );
        let start = document
            .find("m:ItemChanges/t:ItemChange/t:Updates/t:SetItemField/t:CalendarItem/t:Start")
            .unwrap();
        assert_eq!(start.text(), "2024-09-03T14:00:00Z");
    }

    #[test]
    fn test_update_unknown_field_strict_and_lenient() {
        let file = event_file(".json", STORED_EVENT);
        let command = Command::Update {
            path: file.path().to_path_buf(),
            fields: vec!["subject".to_string(), "colour".to_string()],
            changed_only: false,
        };

        let mut config = Config::default();
        assert!(build_document(&command, &config).is_err());

        config.request.strict_fields = false;
        let document = build_document(&command, &config).unwrap();
        let updates = document.find("m:ItemChanges/t:ItemChange/t:Updates").unwrap();
        assert_eq!(updates.children().count(), 2);
    }

    #[test]
    fn test_delete_requires_change_key() {
        let file = event_file(".json", r#"{"id": "AAMkAGI2"}"#);
        let command = Command::Delete {
            path: file.path().to_path_buf(),
        };
        let err = build_document(&command, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("change_key"));
    }

    #[test]
    fn test_render_with_envelope() {
        let mut config = Config::default();
        config.output.envelope = true;
        config.request.server_version = "Exchange2010_SP2".to_string();

        let xml = render(get_item("AAMk", BaseShape::IdOnly), &config).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.contains("<s:Envelope"));
        assert!(xml.contains(r#"Version="Exchange2010_SP2""#));
    }
}
