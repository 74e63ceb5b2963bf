use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use trassir_core::{
    CheckConfig, CheckError, CheckMode, CheckReport, Checker, Credentials, HttpTrassirApi,
    TrassirEndpoint,
};

mod plugin_output;

/// Upper bound for hour-valued flags (ten years).
const MAX_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Parser)]
#[command(name = "check_trassir", version)]
#[command(about = "Icinga/Nagios check for Trassir CCTV server health and channel archives")]
struct Cli {
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Channel to check. Matches the first channel whose name contains this
    /// text (case-sensitive), so "Camera-1" also matches "Camera-12".
    /// Without it the server health settings are checked.
    #[arg(long)]
    channel: Option<String>,

    /// Newest archive event must be younger than this many hours.
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(..=MAX_HOURS))]
    hours: u32,

    /// Server timezone as an hour offset from UTC.
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i32).range(-24..=24)
    )]
    timezone: i32,

    /// Pause before each timeline poll, in milliseconds.
    #[arg(long, default_value_t = 700)]
    delay: u64,

    #[arg(long)]
    debug: bool,

    #[arg(long, default_value = "/var/tmp/check_trassir")]
    cache_dir: PathBuf,

    /// Maximum age of the cached channel list.
    #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(u64).range(..=MAX_HOURS as u64))]
    cache_hours: u64,

    /// Trailing window for archive density.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(..=MAX_HOURS))]
    density_hours: u32,

    /// Timeline poll attempts before giving up.
    #[arg(long, default_value_t = 10)]
    retries: u32,

    #[arg(long, default_value_t = 555)]
    stream_port: u16,

    #[arg(long, value_enum, default_value = "plugin")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Plugin,
    Json,
}

struct Target {
    endpoint: TrassirEndpoint,
    credentials: Credentials,
    mode: CheckMode,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            let message = err.to_string();
            let first_line = message.lines().next().unwrap_or("invalid arguments");
            let report = CheckReport::unknown(first_line.trim_start_matches("error: "));
            return finish(&report, OutputFormat::Plugin);
        }
    };

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let report = match run(&cli).await {
        Ok(report) => report,
        Err(err) => {
            debug!(error = %err, "check aborted");
            CheckReport::unknown(err)
        }
    };

    finish(&report, cli.format)
}

async fn run(cli: &Cli) -> Result<CheckReport, CheckError> {
    let target = target_from(cli)?;
    let config = config_from(cli);

    let api = HttpTrassirApi::new(target.endpoint, &config)?;
    Checker::new(api, config)
        .run(&target.credentials, &target.mode)
        .await
}

fn target_from(cli: &Cli) -> Result<Target, CheckError> {
    let missing = || CheckError::Configuration("Missing required input parameters.".to_string());
    let present = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

    let host = present(&cli.host).ok_or_else(missing)?;
    let port = cli.port.filter(|p| *p != 0).ok_or_else(missing)?;
    let username = present(&cli.username).ok_or_else(missing)?;
    let password = present(&cli.password).ok_or_else(missing)?;

    let mut endpoint = TrassirEndpoint::new(host, port);
    endpoint.stream_port = cli.stream_port;

    Ok(Target {
        endpoint,
        credentials: Credentials { username, password },
        mode: CheckMode::from_channel(cli.channel.clone()),
    })
}

fn config_from(cli: &Cli) -> CheckConfig {
    CheckConfig {
        cache_dir: cli.cache_dir.clone(),
        channel_cache_max_age: Duration::from_secs(cli.cache_hours * 3600),
        freshness_hours: cli.hours,
        density_hours: cli.density_hours,
        timezone_offset_hours: cli.timezone,
        timeline_attempts: cli.retries,
        poll_delay: Duration::from_millis(cli.delay),
        ..CheckConfig::default()
    }
}

fn finish(report: &CheckReport, format: OutputFormat) -> ExitCode {
    if let Err(err) = print_report(report, format) {
        eprintln!("failed to write report: {err:#}");
        return ExitCode::from(trassir_core::Status::Unknown.exit_code());
    }
    ExitCode::from(report.status.exit_code())
}

fn print_report(report: &CheckReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Plugin => {
            print!("{}", plugin_output::render(report));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report).context("failed to encode report")?;
            println!("{json}");
        }
    }
    Ok(())
}
