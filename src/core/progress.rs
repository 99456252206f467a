//! Progress events shared by the console and the GUI log pane

use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::Sender;

/// Something worth telling the operator during a run
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Info(String),
    Warning(String),
    /// Records found, with the number of rows skipped for lacking an ID
    RecordsLoaded { count: usize, skipped: usize },
    /// One individual document written
    Generated { file_name: String },
    /// One record appended to the consolidated document
    Appended { name: String },
    /// A record could not be written; the run continues
    RecordFailed { name: String, error: String },
    /// The run completed
    Finished { count: usize, destination: PathBuf },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Info(message) => write!(f, "{}", message),
            ProgressEvent::Warning(message) => write!(f, "Warning: {}", message),
            ProgressEvent::RecordsLoaded { count, skipped: 0 } => {
                write!(f, "Found {} students.", count)
            }
            ProgressEvent::RecordsLoaded { count, skipped } => write!(
                f,
                "Found {} students ({} rows without ID were skipped).",
                count, skipped
            ),
            ProgressEvent::Generated { file_name } => write!(f, "- Generated: {}", file_name),
            ProgressEvent::Appended { name } => write!(f, "- Processed: {}", name),
            ProgressEvent::RecordFailed { name, error } => {
                write!(f, "- ERROR saving document for {}: {}", name, error)
            }
            ProgressEvent::Finished { count, destination } => write!(
                f,
                "Done. {} student(s) processed. Output: {}",
                count,
                destination.display()
            ),
        }
    }
}

/// Receives progress events from a run
pub trait Reporter {
    fn report(&self, event: ProgressEvent);
}

/// Prints every event to stdout, one line each
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, event: ProgressEvent) {
        trace_event(&event);
        println!("{}", event);
    }
}

impl<T: From<ProgressEvent>> Reporter for Sender<T> {
    fn report(&self, event: ProgressEvent) {
        trace_event(&event);
        // Receiver gone means nobody is listening any more
        let _ = self.send(T::from(event));
    }
}

fn trace_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::Warning(message) => tracing::warn!("{}", message),
        ProgressEvent::RecordFailed { name, error } => {
            tracing::error!("Failed to save document for {}: {}", name, error)
        }
        other => tracing::debug!("{}", other),
    }
}
