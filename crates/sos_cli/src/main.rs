//! CLI smoke entry point.
//!
//! # Responsibility
//! - Drive one arm / (optional) cancel / dispatch cycle against log-only
//!   channels to verify `sos_core` wiring end to end.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Set `SOS_LOG_DIR` to an absolute path to enable file logging.

use clap::Parser;
use sos_core::{
    init_logging, parse_reason, ChannelKind, ChannelSet, DispatchChannel, EmergencyReason,
    EmergencyTrigger, LogSettings, LoggingChannel, TriggerConfig, TriggerState,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Emergency trigger smoke run over log-only channels
#[derive(Parser, Debug)]
#[command(name = "sos_cli")]
#[command(version, about = "Arm one emergency event and report how dispatch settled")]
struct Cli {
    /// Emergency reason (stroke, fall, other)
    #[arg(default_value = "stroke", value_parser = reason_arg)]
    reason: EmergencyReason,

    /// Cancel the countdown after this many milliseconds
    #[arg(long)]
    cancel_after_ms: Option<u64>,

    /// JSON trigger config file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn reason_arg(raw: &str) -> Result<EmergencyReason, String> {
    parse_reason(raw).map_err(|err| err.to_string())
}

fn load_config(path: Option<&Path>) -> Result<TriggerConfig, String> {
    match path {
        None => Ok(TriggerConfig::default()),
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|err| format!("failed to read config `{}`: {err}", path.display()))?;
            TriggerConfig::from_json_str(&raw).map_err(|err| err.to_string())
        }
    }
}

fn demo_channels(fallback_number: &str) -> Result<ChannelSet, String> {
    let channels: Vec<Arc<dyn DispatchChannel>> = vec![
        Arc::new(LoggingChannel::new(
            ChannelKind::EmergencyServices,
            fallback_number,
        )),
        Arc::new(LoggingChannel::new(ChannelKind::Contact, "demo-contact")),
        Arc::new(LoggingChannel::new(ChannelKind::Clinician, "demo-clinician")),
    ];
    ChannelSet::new(channels).map_err(|err| err.to_string())
}

async fn run(args: Cli) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    let channels = demo_channels(config.fallback_number.trim())?;
    let trigger = EmergencyTrigger::new(config, channels).map_err(|err| err.to_string())?;

    println!("sos_core ping={}", sos_core::ping());
    println!("sos_core version={}", sos_core::core_version());

    let event_id = trigger.arm(args.reason).map_err(|err| err.to_string())?;
    println!("armed event={event_id} reason={}", args.reason);

    if let Some(delay) = args.cancel_after_ms {
        tokio::time::sleep(Duration::from_millis(delay)).await;
        match trigger.cancel(event_id) {
            Ok(()) => println!("cancel requested after {delay} ms"),
            Err(err) => println!("cancel rejected: {err}"),
        }
    }

    let state = trigger
        .wait_for_terminal(event_id)
        .await
        .map_err(|err| err.to_string())?;
    match &state {
        TriggerState::Cancelled { .. } => println!("state=cancelled; no channel was notified"),
        TriggerState::Resolved { result, .. } => {
            for outcome in result.outcomes() {
                println!(
                    "channel={} succeeded={} error={}",
                    outcome.channel.kind,
                    outcome.succeeded,
                    outcome
                        .error_kind
                        .map(|kind| kind.as_str())
                        .unwrap_or("none")
                );
            }
            if let Some(notice) = trigger.notice() {
                println!("{}", notice.message());
            }
        }
        other => println!("unexpected state: {other:?}"),
    }
    trigger
        .acknowledge(event_id)
        .map_err(|err| err.to_string())?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("SOS_LOG_DIR") {
        if let Err(err) = init_logging(&LogSettings::with_default_level(log_dir)) {
            eprintln!("logging disabled: {err}");
        }
    }

    let args = Cli::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
