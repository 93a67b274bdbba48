use std::io::{self, BufWriter};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context as _;
use tokio::task::JoinHandle;

use log_tag_ipv4::config::{ProcessEnv, RunSettings};
use log_tag_ipv4::effect::{CancelToken, Context};
use log_tag_ipv4::run::{Pipeline, RunSummary};

/// How long to wait for the blocking pipeline after cancellation. A read
/// parked on stdin does not observe the cancel flag.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the encoded records.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run());
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match result {
        Ok(summary) => {
            tracing::debug!(records = summary.records_written, "Exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<RunSummary> {
    let cancel = CancelToken::new();
    let ctx = Context::with_cancel(cancel.clone());

    let job = tokio::task::spawn_blocking(move || {
        let pipeline = Pipeline::new(
            ProcessEnv,
            RunSettings::default(),
            || Ok(io::stdin().lock()),
            || Ok(BufWriter::new(io::stdout().lock())),
        );
        pipeline.run(&ctx)
    });

    supervise(job, tokio::signal::ctrl_c(), &cancel).await
}

/// Wait for `job`, cancelling it if `interrupt` fires first.
///
/// A failure to listen for the interrupt is logged and the job keeps running.
async fn supervise(
    mut job: JoinHandle<log_tag_ipv4::error::Result<RunSummary>>,
    interrupt: impl Future<Output = io::Result<()>>,
    cancel: &CancelToken,
) -> anyhow::Result<RunSummary> {
    let joined = tokio::select! {
        biased;
        signal = interrupt => match signal {
            Ok(()) => {
                tracing::info!("Ctrl+C received, cancelling run...");
                cancel.cancel();
                tokio::time::timeout(SHUTDOWN_GRACE, &mut job)
                    .await
                    .context("pipeline did not stop after cancellation")?
            }
            Err(e) => {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                (&mut job).await
            }
        },
        joined = &mut job => joined,
    };
    cancel.cancel();

    let summary = joined.context("pipeline task panicked")??;
    Ok(summary)
}
