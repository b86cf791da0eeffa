// Entrypoint for the CLI.
// - Parses arguments, loads settings and hands off to `commands`.
// - Every failure, including usage errors, exits with code 1.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tapdata_ci::commands;
use tapdata_ci::config::Settings;
use tapdata_ci::ui::Report;

#[derive(Parser)]
#[command(name = "tapdata-ci", version)]
#[command(about = "Import Tapdata configuration bundles from CI", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/tapdata-ci/config.toml)
    #[arg(long, global = true, env = "TAPDATA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get an access token; logs go to stderr, the token to stdout
    Token {
        base_url: String,

        #[command(flatten)]
        code: AccessCodeArg,
    },
    /// Upload a TAR bundle and start an import
    Import {
        base_url: String,
        access_token: String,
        tar_file: String,
    },
    /// Poll an import until it completes, fails or times out
    StatusCheck {
        base_url: String,
        access_token: String,
        record_id: String,

        #[command(flatten)]
        poll: PollArgs,
    },
    /// Token, import and status check in one run
    Deploy {
        base_url: String,
        tar_file: String,

        #[command(flatten)]
        code: AccessCodeArg,

        #[command(flatten)]
        poll: PollArgs,
    },
}

#[derive(Args)]
struct AccessCodeArg {
    /// Access code exchanged for a token
    #[arg(long, env = "TAPDATA_ACCESS_CODE", hide_env_values = true)]
    access_code: Option<String>,
}

#[derive(Args)]
struct PollArgs {
    /// Maximum number of status checks
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Seconds to wait between status checks
    #[arg(long)]
    interval_secs: Option<u64>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            let mut stderr = io::stderr();
            let _ = Report::stderr(&mut stderr).error(&format!("{err:#}"));
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Token { base_url, code } => {
            let settings = settings.with_overrides(code.access_code, None, None);
            let mut stderr = io::stderr();
            let mut log = Report::stderr(&mut stderr);
            let token = commands::token(&base_url, &settings, &mut log)?;
            // Only the token goes to stdout so CI can capture it directly
            writeln!(io::stdout(), "{token}").context("Failed to write token to stdout")?;
            Ok(0)
        }
        Commands::Import {
            base_url,
            access_token,
            tar_file,
        } => {
            let mut stdout = io::stdout();
            let mut report = Report::stdout(&mut stdout);
            commands::import(&base_url, &access_token, &tar_file, &settings, &mut report)?;
            Ok(0)
        }
        Commands::StatusCheck {
            base_url,
            access_token,
            record_id,
            poll,
        } => {
            let settings = settings.with_overrides(None, poll.max_attempts, poll.interval_secs);
            let mut stdout = io::stdout();
            let mut report = Report::stdout(&mut stdout);
            let outcome =
                commands::status_check(&base_url, &access_token, &record_id, &settings, &mut report)?;
            Ok(outcome.exit_code())
        }
        Commands::Deploy {
            base_url,
            tar_file,
            code,
            poll,
        } => {
            let settings =
                settings.with_overrides(code.access_code, poll.max_attempts, poll.interval_secs);
            let mut stdout = io::stdout();
            let mut report = Report::stdout(&mut stdout);
            let outcome = commands::deploy(&base_url, &tar_file, &settings, &mut report)?;
            Ok(outcome.exit_code())
        }
    }
}
