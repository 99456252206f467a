//! Builds output documents from records and a template
//!
//! Every record gets a freshly loaded template instance: merging mutates the
//! document, so an instance is never reused across records.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex_lite::Regex;

use super::config::{MarkerSet, OutputConfig};
use super::document::DocxDocument;
use super::error::{DocumentError, GenerationError};
use super::merge;
use super::progress::{ProgressEvent, Reporter};
use super::records::Record;

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_.]").expect("valid file name pattern"));

/// Source of fresh template instances
pub trait TemplateLoader {
    fn load(&self) -> Result<DocxDocument, DocumentError>;
}

impl<F> TemplateLoader for F
where
    F: Fn() -> Result<DocxDocument, DocumentError>,
{
    fn load(&self) -> Result<DocxDocument, DocumentError> {
        self()
    }
}

/// Template read from disk on every load
#[derive(Debug, Clone)]
pub struct TemplateFile {
    path: PathBuf,
}

impl TemplateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TemplateLoader for TemplateFile {
    fn load(&self) -> Result<DocxDocument, DocumentError> {
        DocxDocument::open(&self.path)
    }
}

/// Destination for finished documents
pub trait OutputSink {
    fn persist(&mut self, document: &DocxDocument, destination: &Path) -> Result<(), DocumentError>;
}

/// Writes documents to the filesystem, creating the parent folder if needed
#[derive(Debug, Default)]
pub struct FileSink;

impl OutputSink for FileSink {
    fn persist(&mut self, document: &DocxDocument, destination: &Path) -> Result<(), DocumentError> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        document.save(destination)
    }
}

/// A record whose document could not be produced
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of an individual-mode run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub generated: usize,
    pub failures: Vec<RecordFailure>,
}

/// `prefix + full name + .extension`, with every character outside
/// `[A-Za-z0-9_.]` replaced by `_`
pub fn output_file_name(prefix: &str, full_name: &str, extension: &str) -> String {
    let raw = format!("{prefix}{full_name}.{extension}");
    UNSAFE_FILE_CHARS.replace_all(&raw, "_").into_owned()
}

/// Make `name` unique within one run by adding `_2`, `_3`, ... before the
/// extension. Comparison ignores case for case-insensitive filesystems.
fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_lowercase()) {
        return name;
    }
    let (stem, extension) = match name.rfind('.') {
        Some(dot) => name.split_at(dot),
        None => (name.as_str(), ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{stem}_{n}{extension}");
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

fn display_name(record: &Record) -> String {
    let name = record.full_name();
    if name.is_empty() {
        record.national_id.trim().to_string()
    } else {
        name
    }
}

/// Runs the record → document pipeline for one job
pub struct Assembler<'a> {
    markers: &'a MarkerSet,
    output: &'a OutputConfig,
    reporter: &'a dyn Reporter,
}

impl<'a> Assembler<'a> {
    pub fn new(markers: &'a MarkerSet, output: &'a OutputConfig, reporter: &'a dyn Reporter) -> Self {
        Self {
            markers,
            output,
            reporter,
        }
    }

    /// Load a fresh template and fill it with one record
    fn fill(
        &self,
        record: &Record,
        template: &impl TemplateLoader,
    ) -> Result<DocxDocument, DocumentError> {
        let mut document = template.load()?;
        merge::merge(&mut document, &record.replacements(self.markers));
        Ok(document)
    }

    /// One document per record, written into `output_dir`.
    ///
    /// A record that fails to load or save is reported and skipped; the
    /// remaining records are still processed.
    pub fn generate_individual(
        &self,
        records: &[Record],
        template: &impl TemplateLoader,
        sink: &mut impl OutputSink,
        output_dir: &Path,
    ) -> GenerationReport {
        let mut report = GenerationReport::default();
        let mut taken = HashSet::new();

        for record in records {
            let name = display_name(record);
            let file_name = unique_name(
                output_file_name(&self.output.file_prefix, &record.full_name(), &self.output.extension),
                &mut taken,
            );
            let destination = output_dir.join(&file_name);

            let result = self
                .fill(record, template)
                .and_then(|document| sink.persist(&document, &destination));

            match result {
                Ok(()) => {
                    report.generated += 1;
                    self.reporter.report(ProgressEvent::Generated { file_name });
                }
                Err(e) => {
                    let failure = RecordFailure {
                        name,
                        error: e.to_string(),
                    };
                    self.reporter.report(ProgressEvent::RecordFailed {
                        name: failure.name.clone(),
                        error: failure.error.clone(),
                    });
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    /// All records in one document, a page break before every record but the
    /// first, saved once to `output_path`. Any failure aborts the run.
    pub fn generate_consolidated(
        &self,
        records: &[Record],
        template: &impl TemplateLoader,
        sink: &mut impl OutputSink,
        output_path: &Path,
    ) -> Result<usize, GenerationError> {
        let mut combined: Option<DocxDocument> = None;

        for record in records {
            let filled = self.fill(record, template)?;
            if let Some(document) = combined.as_mut() {
                document.add_page_break();
                document.append_body_content(filled.into_body_content());
            } else {
                combined = Some(filled);
            }
            self.reporter.report(ProgressEvent::Appended {
                name: display_name(record),
            });
        }

        let Some(document) = combined else {
            self.reporter
                .report(ProgressEvent::Warning("No records to write.".to_string()));
            return Ok(0);
        };

        tracing::debug!(
            "Consolidated document holds {} records and {} page breaks",
            records.len(),
            document.page_break_count()
        );
        sink.persist(&document, output_path)
            .map_err(|source| GenerationError::Save {
                path: output_path.to_path_buf(),
                source,
            })?;

        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::fixtures::{docx, paragraph, table};
    use crate::core::document::Block;
    use std::sync::mpsc;

    #[derive(Default)]
    struct MemorySink {
        saved: Vec<(PathBuf, DocxDocument)>,
        fail_for: Option<&'static str>,
    }

    impl OutputSink for MemorySink {
        fn persist(&mut self, document: &DocxDocument, destination: &Path) -> Result<(), DocumentError> {
            if let Some(fragment) = self.fail_for {
                if destination.to_string_lossy().contains(fragment) {
                    return Err(DocumentError::Io(std::io::Error::other("disk full")));
                }
            }
            self.saved.push((destination.to_path_buf(), document.clone()));
            Ok(())
        }
    }

    fn template() -> Result<DocxDocument, DocumentError> {
        Ok(docx(&format!(
            "{}{}",
            paragraph(&["Estimado/a {{NOMBRE_", "COMPLETO}}, cédula {{CEDULA}}"]),
            table(&["{{TRIBUNAL_1}}", "{{TRIBUNAL_2}}"])
        )))
    }

    fn record(id: &str, given: &str, surname: &str) -> Record {
        Record {
            national_id: id.to_string(),
            given_names: Some(given.to_string()),
            surname: Some(surname.to_string()),
            committee: [Some("Dr. Uno".to_string()), None, None],
            ..Default::default()
        }
    }

    fn records() -> Vec<Record> {
        vec![
            record("0911", "Ana", "Pérez Ríos"),
            record("0922", "Luis", "Mora"),
            record("0933", "Eva", "Vera"),
        ]
    }

    #[test]
    fn test_output_file_name_is_sanitized() {
        assert_eq!(
            output_file_name("Notificacion_", "Ana Pérez Ríos", "docx"),
            "Notificacion_Ana_P_rez_R_os.docx"
        );
        for name in ["José María O'Neil", "a/b\\c:d", "ÑÑ  ..", "日本語"] {
            let file = output_file_name("Notificacion_", name, "docx");
            assert!(file
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.'));
        }
    }

    #[test]
    fn test_unique_name_adds_suffix() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name("N_Ana.docx".into(), &mut taken), "N_Ana.docx");
        assert_eq!(unique_name("N_Ana.docx".into(), &mut taken), "N_Ana_2.docx");
        assert_eq!(unique_name("n_ana.docx".into(), &mut taken), "n_ana_3.docx");
    }

    #[test]
    fn test_individual_one_document_per_record() {
        let (tx, rx) = mpsc::channel::<ProgressEvent>();
        let markers = MarkerSet::default();
        let output = OutputConfig::default();
        let assembler = Assembler::new(&markers, &output, &tx);
        let mut sink = MemorySink::default();

        let report = assembler.generate_individual(&records(), &template, &mut sink, Path::new("out"));

        assert_eq!(report.generated, 3);
        assert!(report.failures.is_empty());
        let names: Vec<_> = sink.saved.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("out/Notificacion_Ana_P_rez_R_os.docx"),
                PathBuf::from("out/Notificacion_Luis_Mora.docx"),
                PathBuf::from("out/Notificacion_Eva_Vera.docx"),
            ]
        );
        assert_eq!(
            sink.saved[0].1.paragraph_texts(),
            vec!["Estimado/a Ana Pérez Ríos, cédula 0911", "Dr. Uno", ""]
        );
        assert_eq!(rx.try_iter().count(), 3);
    }

    #[test]
    fn test_individual_save_failure_does_not_stop_run() {
        let (tx, rx) = mpsc::channel::<ProgressEvent>();
        let markers = MarkerSet::default();
        let output = OutputConfig::default();
        let assembler = Assembler::new(&markers, &output, &tx);
        let mut sink = MemorySink {
            fail_for: Some("Luis"),
            ..Default::default()
        };

        let report = assembler.generate_individual(&records(), &template, &mut sink, Path::new("out"));

        assert_eq!(report.generated, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "Luis Mora");
        assert_eq!(sink.saved.len(), 2);

        let events: Vec<_> = rx.try_iter().collect();
        assert!(matches!(&events[1], ProgressEvent::RecordFailed { name, .. } if name == "Luis Mora"));
    }

    #[test]
    fn test_each_record_gets_fresh_template() {
        let (tx, _rx) = mpsc::channel::<ProgressEvent>();
        let markers = MarkerSet::default();
        let output = OutputConfig::default();
        let assembler = Assembler::new(&markers, &output, &tx);
        let mut sink = MemorySink::default();

        assembler.generate_individual(&records(), &template, &mut sink, Path::new("out"));

        let second = sink.saved[1].1.text();
        assert!(second.contains("Luis Mora"));
        assert!(!second.contains("Ana"));
    }

    #[test]
    fn test_consolidated_page_breaks_between_records() {
        let (tx, _rx) = mpsc::channel::<ProgressEvent>();
        let markers = MarkerSet::default();
        let output = OutputConfig::default();
        let assembler = Assembler::new(&markers, &output, &tx);
        let mut sink = MemorySink::default();
        let records = vec![records().remove(0), records().remove(2)];

        let count = assembler
            .generate_consolidated(&records, &template, &mut sink, Path::new("all.docx"))
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(sink.saved.len(), 1);
        let document = &sink.saved[0].1;
        assert_eq!(document.page_break_count(), 1);
        assert_eq!(
            document.blocks(),
            vec![
                Block::Paragraph("Estimado/a Ana Pérez Ríos, cédula 0911".into()),
                Block::Table(vec!["Dr. Uno".into(), "".into()]),
                Block::PageBreak,
                Block::Paragraph("Estimado/a Eva Vera, cédula 0933".into()),
                Block::Table(vec!["Dr. Uno".into(), "".into()]),
            ]
        );
    }

    #[test]
    fn test_consolidated_single_record_has_no_page_break() {
        let (tx, _rx) = mpsc::channel::<ProgressEvent>();
        let markers = MarkerSet::default();
        let output = OutputConfig::default();
        let assembler = Assembler::new(&markers, &output, &tx);
        let mut sink = MemorySink::default();

        assembler
            .generate_consolidated(&records()[..1], &template, &mut sink, Path::new("all.docx"))
            .unwrap();
        assert_eq!(sink.saved[0].1.page_break_count(), 0);
    }

    #[test]
    fn test_consolidated_save_failure_is_fatal() {
        let (tx, _rx) = mpsc::channel::<ProgressEvent>();
        let markers = MarkerSet::default();
        let output = OutputConfig::default();
        let assembler = Assembler::new(&markers, &output, &tx);
        let mut sink = MemorySink {
            fail_for: Some("all"),
            ..Default::default()
        };

        let err = assembler
            .generate_consolidated(&records(), &template, &mut sink, Path::new("all.docx"))
            .unwrap_err();
        assert!(matches!(err, GenerationError::Save { .. }));
    }

    #[test]
    fn test_rows_without_id_produce_no_output() {
        use crate::core::config::ColumnSchema;
        use crate::core::records::RecordSet;
        use calamine::Data;

        let s = |text: &str| Data::String(text.to_string());
        let schema = ColumnSchema::default();
        let mut header: Vec<Data> = schema.required().into_iter().map(s).collect();
        header[0] = s(" CÉDULA DEL ESTUDIANTE");
        let row = |id: Data, given: &str, surname: &str| {
            let mut row = vec![id, s("E1"), s(surname), s(given), s("Civil"), s("tema")];
            row.extend([Data::Empty, Data::Empty, Data::Empty]);
            row
        };
        let rows = vec![
            header,
            row(s("0911"), "Ana", "Pérez"),
            row(Data::Empty, "Luis", "Mora"),
            row(Data::Float(933.0), "Eva", "Vera"),
        ];
        let set = RecordSet::from_rows(rows.iter().map(Vec::as_slice), &schema).unwrap();
        assert_eq!(set.skipped, 1);

        let (tx, _rx) = mpsc::channel::<ProgressEvent>();
        let markers = MarkerSet::default();
        let output = OutputConfig::default();
        let assembler = Assembler::new(&markers, &output, &tx);

        let mut sink = MemorySink::default();
        let report = assembler.generate_individual(&set.records, &template, &mut sink, Path::new("out"));
        assert_eq!(report.generated, 2);
        let names: Vec<_> = sink.saved.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("out/Notificacion_Ana_P_rez.docx"),
                PathBuf::from("out/Notificacion_Eva_Vera.docx"),
            ]
        );

        let mut sink = MemorySink::default();
        let count = assembler
            .generate_consolidated(&set.records, &template, &mut sink, Path::new("all.docx"))
            .unwrap();
        assert_eq!(count, 2);
        let text = sink.saved[0].1.text();
        assert_eq!(sink.saved[0].1.page_break_count(), 1);
        assert!(text.find("Ana Pérez").unwrap() < text.find("Eva Vera").unwrap());
        assert!(!text.contains("Luis"));
        assert!(text.contains("cédula 933"));
    }

    #[test]
    fn test_file_sink_creates_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("nested").join("out.docx");
        let document = template().unwrap();

        FileSink.persist(&document, &destination).unwrap();
        assert!(destination.exists());
    }
}
