//! Main application state and UI coordination

use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;

use crate::core::config::AppConfig;
use crate::core::pipeline::{Job, Mode};
use crate::core::progress::ProgressEvent;
use crate::core::worker::{GenerationWorker, WorkerMessage};
use crate::ui::controls::{ControlAction, ControlsPanel};
use crate::ui::log_panel::{LogLine, LogPanel};

/// Main application state
pub struct NotifierApp {
    /// Application configuration
    pub config: AppConfig,
    /// Folder chosen by the operator
    pub output_dir: Option<PathBuf>,
    /// Background generation thread
    worker: GenerationWorker,
    /// Lines shown in the progress pane
    pub log: Vec<LogLine>,
}

impl NotifierApp {
    /// Create a new application instance
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        Self::with_config(config)
    }

    pub fn with_config(config: AppConfig) -> Self {
        // Only remember a folder that is still there
        let output_dir = config.last_output_dir.clone().filter(|dir| dir.is_dir());
        Self {
            config,
            output_dir,
            worker: GenerationWorker::new(),
            log: vec![LogLine::info("Select a destination folder to begin.")],
        }
    }

    pub fn is_busy(&self) -> bool {
        self.worker.is_busy()
    }

    fn pick_folder(&mut self) {
        let mut dialog = rfd::FileDialog::new().set_title("Select destination folder");
        if let Some(dir) = &self.output_dir {
            dialog = dialog.set_directory(dir);
        }
        if let Some(dir) = dialog.pick_folder() {
            self.set_output_dir(dir);
        }
    }

    /// Use `dir` as the destination and remember it for the next session
    pub fn set_output_dir(&mut self, dir: PathBuf) {
        self.log.push(LogLine::info(format!("Destination folder: {}", dir.display())));
        self.config.last_output_dir = Some(dir.clone());
        if let Err(e) = self.config.save() {
            tracing::warn!("Failed to save config: {}", e);
        }
        self.output_dir = Some(dir);
    }

    /// Submit a generation job for the selected folder
    pub fn start(&mut self, mode: Mode) {
        let Some(dir) = self.output_dir.clone() else {
            self.log.push(LogLine::warning("Please select a destination folder first."));
            return;
        };
        if !dir.is_dir() {
            self.log.push(LogLine::error(format!(
                "The destination folder does not exist: {}",
                dir.display()
            )));
            return;
        }

        let job = match mode {
            Mode::Individual => Job::individual(&self.config, dir),
            Mode::Consolidated => {
                let file = self.config.consolidated_path(&dir);
                Job::consolidated(&self.config, file)
            }
        };

        self.log.clear();
        self.log.push(LogLine::info(match mode {
            Mode::Individual => "Generating individual files...",
            Mode::Consolidated => "Generating single document...",
        }));

        if let Err(e) = self.worker.submit(job, self.config.clone()) {
            self.log.push(LogLine::warning(e.to_string()));
        }
    }

    fn open_folder(&mut self) {
        if let Some(dir) = &self.output_dir {
            if let Err(e) = open::that(dir) {
                tracing::error!("Failed to open folder: {}", e);
                self.log.push(LogLine::error(format!("Could not open the folder: {}", e)));
            }
        }
    }

    /// Move worker output into the progress pane
    pub fn drain_worker(&mut self) {
        for message in self.worker.poll() {
            let line = match message {
                WorkerMessage::Progress(event @ ProgressEvent::Warning(_)) => {
                    LogLine::warning(event.to_string())
                }
                WorkerMessage::Progress(event @ ProgressEvent::RecordFailed { .. }) => {
                    LogLine::error(event.to_string())
                }
                WorkerMessage::Progress(event) => LogLine::info(event.to_string()),
                WorkerMessage::Finished(Ok(_)) => continue,
                WorkerMessage::Finished(Err(e)) => LogLine::error(format!("Error: {}", e)),
            };
            self.log.push(line);
        }
    }
}

impl eframe::App for NotifierApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_worker();

        let busy = self.is_busy();
        let mut action = None;

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            action = ControlsPanel::show(ui, self.output_dir.as_deref(), busy);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            LogPanel::show(ui, &self.log);
        });

        match action {
            Some(ControlAction::PickFolder) => self.pick_folder(),
            Some(ControlAction::GenerateIndividual) => self.start(Mode::Individual),
            Some(ControlAction::GenerateConsolidated) => self.start(Mode::Consolidated),
            Some(ControlAction::OpenFolder) => self.open_folder(),
            None => {}
        }

        if self.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
