//! Background generation thread for the GUI
//!
//! The window must keep repainting while documents are written, so a job runs
//! on its own thread and streams progress back over a channel. At most one
//! job runs at a time.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use super::config::AppConfig;
use super::error::GenerationError;
use super::pipeline::{self, Job};
use super::progress::ProgressEvent;

/// Message from the worker thread to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    Progress(ProgressEvent),
    /// Sent exactly once per job, after every progress message
    Finished(Result<usize, String>),
}

impl From<ProgressEvent> for WorkerMessage {
    fn from(event: ProgressEvent) -> Self {
        WorkerMessage::Progress(event)
    }
}

struct RunningJob {
    handle: JoinHandle<()>,
    receiver: Receiver<WorkerMessage>,
}

/// Runs one generation job at a time off the UI thread
#[derive(Default)]
pub struct GenerationWorker {
    running: Option<RunningJob>,
}

impl GenerationWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True from `submit` until `poll` has returned the job's `Finished`
    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    /// Start a job on a background thread
    pub fn submit(&mut self, job: Job, config: AppConfig) -> Result<(), GenerationError> {
        if self.is_busy() {
            tracing::warn!("Generation requested while another job is running");
            return Err(GenerationError::Busy);
        }

        let (tx, receiver) = mpsc::channel::<WorkerMessage>();
        let handle = thread::spawn(move || {
            let result = pipeline::run(&job, &config, &tx);
            if let Err(e) = &result {
                tracing::error!("Generation failed: {}", e);
            }
            // Receiver dropped means the window is closing
            let _ = tx.send(WorkerMessage::Finished(result.map_err(|e| e.to_string())));
        });

        self.running = Some(RunningJob { handle, receiver });
        Ok(())
    }

    /// Drain pending messages without blocking
    pub fn poll(&mut self) -> Vec<WorkerMessage> {
        let Some(running) = &self.running else {
            return Vec::new();
        };

        // Checked before draining so nothing sent before exit is missed
        let exited = running.handle.is_finished();

        let mut messages = Vec::new();
        let mut done = false;
        loop {
            match running.receiver.try_recv() {
                Ok(message) => {
                    done |= matches!(message, WorkerMessage::Finished(_));
                    messages.push(message);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !done {
                        messages.push(WorkerMessage::Finished(Err(
                            "worker stopped unexpectedly".to_string(),
                        )));
                        done = true;
                    }
                    break;
                }
            }
        }

        if !done && exited {
            messages.push(WorkerMessage::Finished(Err(
                "worker stopped unexpectedly".to_string(),
            )));
            done = true;
        }

        if done {
            if let Some(running) = self.running.take() {
                if running.handle.join().is_err() {
                    tracing::error!("Generation thread panicked");
                }
            }
        }

        messages
    }
}
