// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod cli;
pub mod config;
mod error;
mod export;
mod kubernetes;
mod output;
pub mod progress;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::{debug, info, trace};
use tracing_subscriber::prelude::*;

use cli::Args;
use config::{Config, Settings};
use export::{ExportSummary, Exporter};
use kubernetes::{KubeSource, ResourceKind, build_core_registry};
use output::HierarchicalWriter;
use progress::{ProgressUpdate, create_progress_handle, create_spinner};

/// Initialize logging with file output and optional stderr
fn init_logging(verbose: bool) {
    use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
    use tracing_subscriber::fmt::format::FmtSpan;

    let log_dir = config::base_dir()
        .map(|p| p.join("log"))
        .unwrap_or_else(|_| std::path::PathBuf::from("."));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        return;
    }

    // Rotate daily or at 10MB, keep 5 files
    let log_path = log_dir.join("kubextract.log");
    let condition = RollingConditionBase::new()
        .daily()
        .max_size(10 * 1024 * 1024);

    let file_appender = match RollingFileAppenderBase::new(log_path, condition, 5) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {}", e);
            return;
        }
    };

    let (non_blocking, _guard) = file_appender.get_non_blocking_appender();
    // Leak the guard to keep the background writer alive
    std::mem::forget(_guard);

    let filter = if verbose {
        "kubextract=debug"
    } else {
        "kubextract=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE);

    if verbose {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stderr_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Install rustls crypto provider (aws-lc-rs)
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let args = Args::parse();
    init_logging(args.verbose);

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&config_path)?;

    if args.save_config {
        config.merge_flags(&args);
        config.save_to(&config_path)?;
        println!("Saved settings to {}", config_path.display());
        return Ok(());
    }

    let settings = Settings::resolve(&args, &config);
    info!(
        output_dir = %settings.output_dir.display(),
        pattern = %settings.subject_pattern,
        context = ?settings.context,
        format = ?settings.format,
        "Starting export"
    );

    run_export(&settings).await
}

async fn run_export(settings: &Settings) -> Result<()> {
    let registry = build_core_registry();
    debug!(kinds = ?registry.kinds(), "Type registry ready");

    let spinner = create_spinner("Connecting to Kubernetes...");
    let source = KubeSource::connect(
        settings.kubeconfig.as_deref(),
        settings.context.as_deref(),
        registry.clone(),
    )
    .await;
    let source = match source {
        Ok(source) => source,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    let writer = HierarchicalWriter::new(&settings.output_dir);
    let encoder = settings.format.encoder();
    let progress = create_progress_handle();
    let mut progress_rx = progress.subscribe();

    let exporter = Exporter::new(
        &source,
        &registry,
        encoder.as_ref(),
        &writer,
        &settings.subject_pattern,
    )
    .with_progress(progress.clone());

    spinner.set_message(format!("Exporting from {}...", source.context()));

    let result = {
        let mut run = Box::pin(exporter.run());
        let mut category = String::new();

        loop {
            tokio::select! {
                biased;
                update = progress_rx.recv() => {
                    match update {
                        Ok(ProgressUpdate::CategoryStarted { category: next }) => {
                            spinner.set_message(format!("Exporting {}...", next));
                            category = next;
                        }
                        Ok(ProgressUpdate::ObjectWritten { kind, path }) => {
                            trace!(kind = %kind, path = %path, "Progress");
                            spinner.set_message(format!(
                                "Exporting {}... ({} files written)",
                                category,
                                progress.written()
                            ));
                        }
                        Ok(ProgressUpdate::CategoryComplete { category, written, elapsed_ms }) => {
                            spinner.println(format!(
                                "  {} {} written ({} ms)",
                                category, written, elapsed_ms
                            ));
                        }
                        Err(_) => {}
                    }
                }
                result = &mut run => {
                    break result;
                }
            }
        }
    };

    spinner.finish_and_clear();

    let summary = result?;
    print_summary(&summary, &writer);
    Ok(())
}

fn print_summary(summary: &ExportSummary, writer: &HierarchicalWriter) {
    println!(
        "Exported {} objects to {}",
        summary.total(),
        writer.root().display()
    );
    for kind in ResourceKind::ALL {
        println!("  {:<20} {}", kind.as_str(), summary.written_for(kind));
    }
    if summary.bindings_skipped > 0 {
        println!(
            "  ({} bindings without matching subjects skipped)",
            summary.bindings_skipped
        );
    }
}
