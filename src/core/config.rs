//! Application configuration management

use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Spreadsheet with one student per row
    pub records_path: PathBuf,
    /// Word template containing the markers
    pub template_path: PathBuf,
    /// Last destination folder picked in the GUI
    pub last_output_dir: Option<PathBuf>,
    /// Output naming
    pub output: OutputConfig,
    /// Spreadsheet header names
    pub columns: ColumnSchema,
    /// Marker tokens in the template
    pub markers: MarkerSet,
}

/// Where and how generated documents are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default folder for individual documents
    pub individual_dir: PathBuf,
    /// File name of the consolidated document
    pub consolidated_file: String,
    /// Prefix of every individual file name
    pub file_prefix: String,
    /// Extension of generated files, without the dot
    pub extension: String,
}

/// Header names of the required spreadsheet columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSchema {
    pub national_id: String,
    pub student_id: String,
    pub surname: String,
    pub given_names: String,
    pub program: String,
    pub topic: String,
    pub committee: [String; 3],
}

/// Marker tokens substituted in the template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSet {
    pub full_name: String,
    pub national_id: String,
    pub topic: String,
    pub student_id: String,
    pub program: String,
    pub committee: [String; 3],
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from("otro.xlsx"),
            template_path: PathBuf::from("plantilla.docx"),
            last_output_dir: None,
            output: OutputConfig::default(),
            columns: ColumnSchema::default(),
            markers: MarkerSet::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            individual_dir: PathBuf::from("Notificaciones_Generadas"),
            consolidated_file: "notificaciones_TODOS_EN_UNO.docx".to_string(),
            file_prefix: "Notificacion_".to_string(),
            extension: "docx".to_string(),
        }
    }
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            national_id: "CÉDULA DEL ESTUDIANTE".to_string(),
            student_id: "ID ESTUDIANTE".to_string(),
            surname: "APELLIDOS".to_string(),
            given_names: "NOMBRES".to_string(),
            program: "CARRERA".to_string(),
            topic: "TEMA".to_string(),
            committee: ["TRL1".to_string(), "TRL2".to_string(), "TRL3".to_string()],
        }
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            full_name: "{{NOMBRE_COMPLETO}}".to_string(),
            national_id: "{{CEDULA}}".to_string(),
            topic: "{{TEMA}}".to_string(),
            student_id: "{{ID}}".to_string(),
            program: "{{CARRERA}}".to_string(),
            committee: [
                "{{TRIBUNAL_1}}".to_string(),
                "{{TRIBUNAL_2}}".to_string(),
                "{{TRIBUNAL_3}}".to_string(),
            ],
        }
    }
}

impl ColumnSchema {
    /// Every column a spreadsheet must provide, in report order
    pub fn required(&self) -> Vec<&str> {
        let mut columns = vec![
            self.national_id.as_str(),
            self.student_id.as_str(),
            self.surname.as_str(),
            self.given_names.as_str(),
            self.program.as_str(),
            self.topic.as_str(),
        ];
        columns.extend(self.committee.iter().map(String::as_str));
        columns
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "notificador", "Notificador")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&content)?;
        tracing::debug!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Path of the consolidated document inside a destination folder
    pub fn consolidated_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.output.consolidated_file)
    }
}

/// Resolve an input file. A relative path that does not exist from the
/// working directory is looked up in the folder holding the executable.
pub fn locate_input(path: &Path) -> PathBuf {
    let program_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    locate_in(path, program_dir.as_deref())
}

fn locate_in(path: &Path, program_dir: Option<&Path>) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    match program_dir.map(|dir| dir.join(path)) {
        Some(candidate) if candidate.exists() => {
            tracing::debug!("Using {} next to the executable", candidate.display());
            candidate
        }
        _ => path.to_path_buf(),
    }
}
