//! Schemascope CLI entry point.

use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, error, info, warn};

use schemascope_cli::{
    Args,
    error_adapter::{Reportable, skipped_reportables, to_reportables},
};

fn render(reporter: &miette::GraphicalReportHandler, reportable: &Reportable<'_>) -> String {
    let mut writer = String::new();
    if let Err(err) = reporter.render_report(&mut writer, reportable) {
        return format!("{reportable} (report rendering failed: {err})");
    }
    writer
}

fn main() {
    miette::set_panic_hook();

    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting Schemascope");
    debug!(args:?; "Parsed arguments");

    let reporter = miette::GraphicalReportHandler::new();

    match schemascope_cli::run(&args) {
        Ok(skipped) => {
            for reportable in skipped_reportables(&skipped) {
                warn!("{}", render(&reporter, &reportable));
            }
        }
        Err(err) => {
            for reportable in to_reportables(&err) {
                error!("{}", render(&reporter, &reportable));
            }
            process::exit(1);
        }
    }

    info!("Completed successfully");
}
