//! Notificador - student notification mail merge
//!
//! Fills a Word template with one record per student from a spreadsheet, either
//! as one document per student or as a single document with page breaks.

mod app;
mod core;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;

use app::NotifierApp;
use clap::{Parser, Subcommand};
use eframe::egui;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::config::AppConfig;
use crate::core::pipeline::{self, Job};
use crate::core::progress::ConsoleReporter;

#[derive(Parser, Debug)]
#[command(name = "notificador", version, about = "Generate student notification documents")]
struct Cli {
    /// Spreadsheet with one row per student
    #[arg(long, global = true)]
    records: Option<PathBuf>,

    /// Word template containing the markers
    #[arg(long, global = true)]
    template: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One document per student
    Individual {
        /// Destination folder
        #[arg(short = 'o', long)]
        output_dir: Option<PathBuf>,
    },
    /// A single document with every student
    Consolidated {
        /// Destination file
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// Open the desktop window (default)
    Gui,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(level)
        .init();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::debug!("Using default config: {}", e);
        AppConfig::default()
    });
    if let Some(records) = cli.records {
        config.records_path = records;
    }
    if let Some(template) = cli.template {
        config.template_path = template;
    }

    let job = match cli.command.unwrap_or(Command::Gui) {
        Command::Individual { output_dir } => {
            let dir = output_dir.unwrap_or_else(|| config.output.individual_dir.clone());
            Job::individual(&config, dir)
        }
        Command::Consolidated { output } => {
            let file = output.unwrap_or_else(|| PathBuf::from(&config.output.consolidated_file));
            Job::consolidated(&config, file)
        }
        Command::Gui => {
            return match run_gui(config) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::FAILURE
                }
            };
        }
    };

    match pipeline::run(&job, &config, &ConsoleReporter) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Generation failed: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_gui(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Notificador...");

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([600.0, 500.0])
            .with_resizable(false)
            .with_title("Notification generator"),
        ..Default::default()
    };

    eframe::run_native(
        "Notificador",
        native_options,
        Box::new(move |cc| Ok(Box::new(NotifierApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start the window: {}", e))
}
