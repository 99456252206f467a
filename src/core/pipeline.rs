//! End-to-end generation run shared by the command line and the GUI

use std::path::{Path, PathBuf};

use super::assembler::{Assembler, FileSink, TemplateFile, TemplateLoader};
use super::config::{locate_input, AppConfig};
use super::error::{GenerationError, InputKind};
use super::progress::{ProgressEvent, Reporter};
use super::records::load_records;

/// How records are turned into documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One file per student inside a folder
    Individual,
    /// One file with every student, separated by page breaks
    Consolidated,
}

/// A fully resolved generation request
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub mode: Mode,
    pub records_path: PathBuf,
    pub template_path: PathBuf,
    /// Folder for individual mode, file path for consolidated mode
    pub destination: PathBuf,
}

impl Job {
    pub fn individual(config: &AppConfig, output_dir: PathBuf) -> Self {
        Self {
            mode: Mode::Individual,
            records_path: config.records_path.clone(),
            template_path: config.template_path.clone(),
            destination: output_dir,
        }
    }

    pub fn consolidated(config: &AppConfig, output_file: PathBuf) -> Self {
        Self {
            mode: Mode::Consolidated,
            records_path: config.records_path.clone(),
            template_path: config.template_path.clone(),
            destination: output_file,
        }
    }
}

/// Locate an input file, failing when it cannot be found
fn check_input(kind: InputKind, path: &Path) -> Result<PathBuf, GenerationError> {
    let located = locate_input(path);
    if located.is_file() {
        Ok(located)
    } else {
        Err(GenerationError::MissingInput {
            kind,
            path: path.to_path_buf(),
        })
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Validate inputs, load the records and generate the documents.
///
/// Returns the number of students processed. Input and column problems are
/// returned as errors before anything is written; a spreadsheet without any
/// identified student is a warning and yields zero.
pub fn run(job: &Job, config: &AppConfig, reporter: &dyn Reporter) -> Result<usize, GenerationError> {
    tracing::info!("Starting {:?} generation into {}", job.mode, job.destination.display());

    let records_path = check_input(InputKind::Records, &job.records_path)?;
    let template_path = check_input(InputKind::Template, &job.template_path)?;

    let template = TemplateFile::new(template_path);
    // Fail early on a template that cannot be parsed
    template.load()?;

    let set = load_records(&records_path, &config.columns)?;
    reporter.report(ProgressEvent::Info("Spreadsheet read successfully.".to_string()));

    if set.is_empty() {
        reporter.report(ProgressEvent::Warning(format!(
            "No students with a value in '{}' were found ({} rows without ID were skipped).",
            config.columns.national_id, set.skipped
        )));
        return Ok(0);
    }
    reporter.report(ProgressEvent::RecordsLoaded {
        count: set.records.len(),
        skipped: set.skipped,
    });

    let assembler = Assembler::new(&config.markers, &config.output, reporter);
    let mut sink = FileSink;

    let count = match job.mode {
        Mode::Individual => {
            let report =
                assembler.generate_individual(&set.records, &template, &mut sink, &job.destination);
            if !report.failures.is_empty() {
                reporter.report(ProgressEvent::Warning(format!(
                    "{} document(s) could not be saved.",
                    report.failures.len()
                )));
            }
            report.generated
        }
        Mode::Consolidated => {
            assembler.generate_consolidated(&set.records, &template, &mut sink, &job.destination)?
        }
    };

    reporter.report(ProgressEvent::Finished {
        count,
        destination: absolute(&job.destination),
    });
    Ok(count)
}
