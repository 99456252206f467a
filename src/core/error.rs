//! Error types for document handling and generation runs

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, editing or writing a `.docx` package
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Package has no part named '{0}'")]
    MissingPart(String),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// Which input file a check refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Records,
    Template,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Records => write!(f, "records spreadsheet"),
            InputKind::Template => write!(f, "document template"),
        }
    }
}

/// Errors that stop a generation run
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Cannot find the {kind}: {}", path.display())]
    MissingInput { kind: InputKind, path: PathBuf },

    #[error("Failed to read spreadsheet {}: {source}", path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Spreadsheet {} has no worksheets", path.display())]
    EmptyWorkbook { path: PathBuf },

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Failed to save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    #[error("A generation job is already running")]
    Busy,
}
