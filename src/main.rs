mod config;
mod error;
mod ip;
mod notify;
mod provider;
mod runlog;
mod sync;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, info};

use crate::config::Config;
use crate::error::{DdnsError, Result};
use crate::ip::IpResolver;
use crate::notify::{Notifier, Webhook};
use crate::provider::namesilo::NameSilo;
use crate::runlog::RunLog;
use crate::sync::{SyncReport, Synchronizer};

#[derive(Parser, Debug)]
#[command(name = "namesilo-ddns")]
#[command(about = "Point NameSilo A records at this machine's public IP, then exit")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// File the run log is appended to [default: ddns.log next to the binary]
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let mut run_log = RunLog::new(args.log_file.clone().unwrap_or_else(runlog::default_path));
    debug!("Run log: {}", run_log.path().display());

    let (config, result) = match Config::load(&args.config) {
        Ok(config) => {
            let result = run(&config, &mut run_log).await;
            (Some(config), result)
        }
        Err(err) => (None, Err(err)),
    };

    match result {
        Ok(report) => {
            for outcome in &report.outcomes {
                debug!("{}: {:?}", outcome.host, outcome.action);
            }
            info!(
                "Synced {} host(s) to {}, {} changed",
                report.outcomes.len(),
                report.ip,
                report.changed()
            );
            finish(&mut run_log, ExitCode::SUCCESS)
        }
        Err(err) => {
            let webhook = match config.as_ref().map(Webhook::from_config) {
                Some(Ok(webhook)) => webhook,
                Some(Err(e)) => {
                    run_log.error(format!("{e:#}"));
                    None
                }
                None => None,
            };
            let notifier = webhook.as_ref().map(|w| w as &dyn Notifier);
            report_failure(&err, &mut run_log, notifier).await
        }
    }
}

/// Logs the failure, hands the whole log to the notifier, writes the log
/// file. A notifier error is logged and does not change the outcome.
async fn report_failure(
    err: &DdnsError,
    run_log: &mut RunLog,
    notifier: Option<&dyn Notifier>,
) -> ExitCode {
    run_log.failure(&err.report_lines());
    if let Some(notifier) = notifier {
        if let Err(e) = notifier.notify(&run_log.join("<br>")).await {
            run_log.error(format!("{e:#}"));
        }
    }
    finish(run_log, ExitCode::FAILURE)
}

fn finish(run_log: &mut RunLog, code: ExitCode) -> ExitCode {
    debug!("Writing {} run log line(s)", run_log.lines().len());
    if let Err(e) = run_log.flush() {
        log::error!("Failed to write log file {}: {e}", run_log.path().display());
    }
    code
}

async fn run(config: &Config, run_log: &mut RunLog) -> Result<SyncReport> {
    info!("Loaded configuration for {} ({} host(s))", config.domain, config.hostnames.len());

    let resolver = IpResolver::from_config(&config.ip_lookup)?;
    let provider = NameSilo::new(config)?;

    Synchronizer::new(
        &resolver,
        &provider,
        &config.domain,
        &config.hostnames,
        config.ttl,
    )
    .run(run_log)
    .await
}
