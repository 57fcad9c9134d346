//! ews-gateway: EWS calendar request builder
//!
//! Builds Exchange Web Services calendar requests and prints them to stdout.
//!
//! Usage:
//!   ews-gateway get <item-id> [--shape IdOnly|Default|AllProperties]
//!   ews-gateway create <event-file>
//!   ews-gateway delete <event-file>
//!   ews-gateway update <event-file> --fields subject,start [--changed-only]
//!   ews-gateway --help

mod cli;

use cli::RunMode;
use ews_calendar::Config;

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let mode = match cli::parse_args(std::env::args().skip(1)) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!();
            print_help();
            std::process::exit(2);
        }
    };

    let invocation = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("ews-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Run(invocation) => invocation,
    };

    // Load .env file first so RUST_LOG set there reaches the filter
    cli::load_env_file(None);

    // Initialize logging; stdout is reserved for the document
    tracing_subscriber::fmt()
        .with_env_filter(cli::log_filter(std::env::var("RUST_LOG").ok())?)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &invocation.config_path {
        Some(path) => Config::from_toml_file(path),
        None => Config::load(),
    }
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    if invocation.pretty {
        config.output.pretty = true;
    }
    if invocation.envelope {
        config.output.envelope = true;
    }

    tracing::debug!("Server version: {}", config.request.server_version);

    let document = cli::build_document(&invocation.command, &config)?;
    let xml = cli::render(document, &config)?;
    println!("{}", xml);

    tracing::info!("{} request written", invocation.command.name());
    Ok(())
}

/// Print help message
fn print_help() {
    println!("ews-gateway - EWS calendar request builder");
    println!();
    println!("Usage:");
    println!("  ews-gateway get <item-id> [--shape <shape>]   Build a GetItem request");
    println!("  ews-gateway create <event-file>               Build a CreateItem request");
    println!("  ews-gateway delete <event-file>               Build a DeleteItem request");
    println!("  ews-gateway update <event-file> --fields <f>  Build an UpdateItem request");
    println!("  ews-gateway --help                            Show this help message");
    println!("  ews-gateway --version                         Show version");
    println!();
    println!("Options:");
    println!("  --config <path>    Config file (default: ./ews-gateway.toml)");
    println!("  --shape <shape>    IdOnly, Default or AllProperties");
    println!("  --fields <list>    Comma-separated changed fields:");
    println!("                     html_body, text_body, subject, start, end,");
    println!("                     location, attendees, resources");
    println!("  --changed-only     Resend invitations only to changed attendees");
    println!("  --envelope         Wrap the request in a SOAP envelope");
    println!("  --pretty           Indent the output");
    println!();
    println!("Event files are TOML (*.toml) or JSON. Timestamps need a UTC offset.");
    println!();
    println!("Environment Variables:");
    println!("  EWS_BASE_SHAPE            Default GetItem shape (default: Default)");
    println!("  EWS_SEND_ONLY_TO_CHANGED  Default for --changed-only (default: false)");
    println!("  EWS_STRICT_FIELDS         Reject unknown field names (default: true)");
    println!("  EWS_SERVER_VERSION        SOAP RequestServerVersion (default: Exchange2010)");
    println!("  EWS_PRETTY                Indent output (default: false)");
    println!("  EWS_ENVELOPE              Wrap in SOAP envelope (default: false)");
    println!("  EWS_XML_DECLARATION       Emit XML declaration (default: true)");
    println!("  RUST_LOG                  Log filter (logs go to stderr)");
}
