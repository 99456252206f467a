//! Student records read from the spreadsheet

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use super::config::{ColumnSchema, MarkerSet};
use super::error::GenerationError;
use super::merge::ReplacementSet;

/// One student row. Absent cells are `None` and render as empty text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Always non-blank; rows without it never become records
    pub national_id: String,
    pub student_id: Option<String>,
    pub surname: Option<String>,
    pub given_names: Option<String>,
    pub program: Option<String>,
    pub topic: Option<String>,
    pub committee: [Option<String>; 3],
}

impl Record {
    /// Given names and surname joined by one space
    pub fn full_name(&self) -> String {
        [field(&self.given_names), field(&self.surname)]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Marker values for this record
    pub fn replacements(&self, markers: &MarkerSet) -> ReplacementSet {
        let mut set = ReplacementSet::new();
        set.insert(&markers.full_name, self.full_name());
        set.insert(&markers.national_id, self.national_id.trim());
        set.insert(&markers.topic, capitalize(field(&self.topic)));
        set.insert(&markers.student_id, field(&self.student_id));
        set.insert(&markers.program, field(&self.program));
        for (marker, member) in markers.committee.iter().zip(&self.committee) {
            set.insert(marker, field(member));
        }
        set
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

/// Uppercase the first character and lowercase the rest
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Text of a spreadsheet cell; empty and error cells are absent.
/// Whole-number floats are written without a fractional part so numeric
/// IDs keep their spreadsheet appearance.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(f.to_string()),
        other => Some(other.to_string()),
    }
}

/// Records of a spreadsheet plus the number of rows dropped for lacking an ID
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub records: Vec<Record>,
    /// Non-empty rows without a national ID
    pub skipped: usize,
}

impl RecordSet {
    /// Build records from rows of cells. The first row is the header.
    pub fn from_rows<'a>(
        rows: impl IntoIterator<Item = &'a [Data]>,
        schema: &ColumnSchema,
    ) -> Result<Self, GenerationError> {
        let mut rows = rows.into_iter();
        let headers: Vec<String> = rows
            .next()
            .map(|header| {
                header
                    .iter()
                    .map(|cell| cell_text(cell).unwrap_or_default().trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let column = |name: &str| headers.iter().position(|h| h == name.trim());

        let missing: Vec<String> = schema
            .required()
            .into_iter()
            .filter(|name| column(*name).is_none())
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            return Err(GenerationError::MissingColumns(missing));
        }

        let index = |name: &str| column(name).unwrap_or(usize::MAX);
        let national_id = index(schema.national_id.as_str());
        let student_id = index(schema.student_id.as_str());
        let surname = index(schema.surname.as_str());
        let given_names = index(schema.given_names.as_str());
        let program = index(schema.program.as_str());
        let topic = index(schema.topic.as_str());
        let committee = [
            index(schema.committee[0].as_str()),
            index(schema.committee[1].as_str()),
            index(schema.committee[2].as_str()),
        ];

        let mut set = RecordSet::default();
        for row in rows {
            let cell = |idx: usize| row.get(idx).and_then(cell_text);

            let Some(id) = cell(national_id).filter(|id| !id.trim().is_empty()) else {
                if row.iter().any(|c| cell_text(c).is_some_and(|t| !t.trim().is_empty())) {
                    set.skipped += 1;
                }
                continue;
            };

            set.records.push(Record {
                national_id: id,
                student_id: cell(student_id),
                surname: cell(surname),
                given_names: cell(given_names),
                program: cell(program),
                topic: cell(topic),
                committee: committee.map(cell),
            });
        }

        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read the first worksheet of a spreadsheet
pub fn load_records(path: &Path, schema: &ColumnSchema) -> Result<RecordSet, GenerationError> {
    let workbook_error = |source: calamine::Error| GenerationError::Workbook {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| GenerationError::EmptyWorkbook {
            path: path.to_path_buf(),
        })?;
    let range = workbook.worksheet_range(&sheet).map_err(workbook_error)?;

    tracing::info!("Reading sheet '{}' of {}", sheet, path.display());
    let set = RecordSet::from_rows(range.rows(), schema)?;
    tracing::info!(
        "Loaded {} records ({} rows without ID skipped)",
        set.records.len(),
        set.skipped
    );
    Ok(set)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn header() -> Vec<Data> {
        [
            " CÉDULA DEL ESTUDIANTE ",
            "ID ESTUDIANTE",
            "APELLIDOS",
            "NOMBRES",
            "CARRERA",
            "TEMA",
            "TRL1",
            "TRL2",
            "TRL3",
        ]
        .into_iter()
        .map(s)
        .collect()
    }

    fn load(rows: &[Vec<Data>]) -> Result<RecordSet, GenerationError> {
        RecordSet::from_rows(rows.iter().map(Vec::as_slice), &ColumnSchema::default())
    }

    #[test]
    fn test_rows_without_id_are_skipped() {
        let rows = vec![
            header(),
            vec![s("0911"), s("A1"), s("Pérez Ríos"), s("Ana"), s("Sistemas"), s("tema uno"), s("Dr. Uno"), Data::Empty, Data::Empty],
            vec![Data::Empty, s("A2"), s("Mora"), s("Luis"), s("Civil"), s("tema dos"), Data::Empty, Data::Empty, Data::Empty],
            vec![Data::Float(912.0), s("A3"), s("Vera"), s("Eva"), s("Civil"), s("tema tres"), Data::Empty, Data::Empty, Data::Empty],
            vec![Data::Empty; 9],
        ];

        let set = load(&rows).unwrap();
        assert_eq!(set.records.len(), 2);
        assert_eq!(set.skipped, 1);
        assert_eq!(set.records[0].full_name(), "Ana Pérez Ríos");
        assert_eq!(set.records[1].national_id, "912");
        assert_eq!(set.records[1].full_name(), "Eva Vera");
    }

    #[test]
    fn test_missing_columns_listed() {
        let mut head = header();
        head.truncate(5);
        let err = load(&[head]).unwrap_err();
        match err {
            GenerationError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["TEMA", "TRL1", "TRL2", "TRL3"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_sheet_misses_every_column() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, GenerationError::MissingColumns(cols) if cols.len() == 9));
    }

    #[test]
    fn test_replacements() {
        let record = Record {
            national_id: " 0912345678 ".to_string(),
            student_id: Some("E-77".to_string()),
            surname: Some("Pérez Ríos".to_string()),
            given_names: Some("Ana".to_string()),
            program: Some("Software".to_string()),
            topic: Some("  inteligencia artificial aplicada ".to_string()),
            committee: [Some("Dr. Uno".to_string()), None, Some(String::new())],
        };
        let markers = MarkerSet::default();
        let set = record.replacements(&markers);

        assert_eq!(set.len(), 8);
        assert_eq!(set.get("{{NOMBRE_COMPLETO}}"), Some("Ana Pérez Ríos"));
        assert_eq!(set.get("{{CEDULA}}"), Some("0912345678"));
        assert_eq!(set.get("{{TEMA}}"), Some("Inteligencia artificial aplicada"));
        assert_eq!(set.get("{{ID}}"), Some("E-77"));
        assert_eq!(set.get("{{CARRERA}}"), Some("Software"));
        assert_eq!(set.get("{{TRIBUNAL_1}}"), Some("Dr. Uno"));
        assert_eq!(set.get("{{TRIBUNAL_2}}"), Some(""));
        assert_eq!(set.get("{{TRIBUNAL_3}}"), Some(""));
    }

    #[test]
    fn test_full_name_with_one_part_empty() {
        let record = Record {
            national_id: "1".to_string(),
            surname: Some("Pérez Ríos".to_string()),
            given_names: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(record.full_name(), "Pérez Ríos");

        let record = Record {
            national_id: "1".to_string(),
            given_names: Some(" Ana ".to_string()),
            ..Default::default()
        };
        assert_eq!(record.full_name(), "Ana");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("inteligencia ARTIFICIAL"), "Inteligencia artificial");
        assert_eq!(capitalize("ñandú"), "Ñandú");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(1712345678.0)).as_deref(), Some("1712345678"));
        assert_eq!(cell_text(&Data::Float(2.5)).as_deref(), Some("2.5"));
        assert_eq!(cell_text(&Data::Int(7)).as_deref(), Some("7"));
        assert_eq!(cell_text(&Data::Empty), None);
    }

    #[test]
    fn test_load_records_from_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("otro.xlsx");
        fixtures::write_xlsx(
            &path,
            &[
                fixtures::HEADER,
                &["0911", "A1", "Pérez", "Ana", "Civil", "redes", "Dr. Uno", "", ""],
                &["", "A2", "Mora", "Luis", "Civil", "tema", "", "", ""],
            ],
        );

        let set = load_records(&path, &ColumnSchema::default()).unwrap();
        assert_eq!(set.records.len(), 1);
        assert_eq!(set.skipped, 1);
        assert_eq!(set.records[0].national_id, "0911");
        assert_eq!(set.records[0].committee[0].as_deref(), Some("Dr. Uno"));
        assert_eq!(set.records[0].committee[1], None);
    }

    #[test]
    fn test_load_records_missing_file() {
        let err = load_records(Path::new("/nonexistent/otro.xlsx"), &ColumnSchema::default())
            .unwrap_err();
        assert!(matches!(err, GenerationError::Workbook { .. }));
    }
}
