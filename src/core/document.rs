//! Word (.docx) document handling
//!
//! A `.docx` file is a zip package. Every part is carried through untouched
//! except the main document part, which is parsed into an [`XmlDocument`] so
//! paragraphs and runs can be rewritten.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::error::DocumentError;
use super::xml::{Element, Node, XmlDocument};

/// Package path of the main document part
pub const MAIN_PART: &str = "word/document.xml";

const BODY: &str = "w:body";
const PARAGRAPH: &str = "w:p";
const RUN: &str = "w:r";
const RUN_PROPERTIES: &str = "w:rPr";
const TEXT: &str = "w:t";
const TAB: &str = "w:tab";
const BREAK: &str = "w:br";
const CARRIAGE_RETURN: &str = "w:cr";
const LAST_RENDERED_PAGE_BREAK: &str = "w:lastRenderedPageBreak";
#[cfg(test)]
const TABLE: &str = "w:tbl";
const SECTION_PROPERTIES: &str = "w:sectPr";

/// Plain view of a run: its formatting block and its visible text
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// The run's `w:rPr` element, if any
    pub properties: Option<Element>,
    /// Visible text; tabs as `\t`, line breaks as `\n`, page breaks as
    /// [`PAGE_BREAK_CHAR`]
    pub text: String,
}

/// Stands for `<w:br w:type="page"/>` inside run text
pub const PAGE_BREAK_CHAR: char = '\u{000C}';

#[cfg(test)]
impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            properties: None,
            text: text.into(),
        }
    }
}

/// Outline of a body-level element, used to inspect assembled documents
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(String),
    PageBreak,
    /// Paragraph texts of every cell, row by row
    Table(Vec<String>),
    Other,
}

/// A loaded `.docx` package
#[derive(Debug, Clone)]
pub struct DocxDocument {
    parts: Vec<(String, Vec<u8>)>,
    main: XmlDocument,
}

impl DocxDocument {
    /// Open a document from a file
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let bytes = fs::read(path)?;
        let document = Self::from_bytes(&bytes)?;
        tracing::debug!("Loaded document: {}", path.display());
        Ok(document)
    }

    /// Read a document from the bytes of a zip package
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            parts.push((name, data));
        }

        Self::from_parts(parts)
    }

    /// Build a document from package parts (name, bytes) in archive order
    pub fn from_parts(parts: Vec<(String, Vec<u8>)>) -> Result<Self, DocumentError> {
        let main_data = parts
            .iter()
            .find(|(name, _)| name == MAIN_PART)
            .map(|(_, data)| data)
            .ok_or_else(|| DocumentError::MissingPart(MAIN_PART.to_string()))?;

        let main = XmlDocument::parse(main_data)?;
        if main.root.child(BODY).is_none() {
            return Err(DocumentError::Malformed("document part has no body".into()));
        }

        Ok(Self { parts, main })
    }

    /// Serialize the package to zip bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for (name, data) in &self.parts {
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            zip.start_file(name.as_str(), options)?;
            if name == MAIN_PART {
                zip.write_all(&self.main.to_bytes()?)?;
            } else {
                zip.write_all(data)?;
            }
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Save the document to disk
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        fs::write(path, self.to_bytes()?)?;
        tracing::debug!("Saved document: {}", path.display());
        Ok(())
    }

    fn body(&self) -> Option<&Element> {
        self.main.root.child(BODY)
    }

    fn body_mut(&mut self) -> Option<&mut Element> {
        self.main.root.child_mut(BODY)
    }

    /// Visit every paragraph in the body: top level, table cells at any
    /// depth, and content controls.
    pub fn for_each_paragraph_mut(&mut self, mut f: impl FnMut(&mut Element)) {
        if let Some(body) = self.body_mut() {
            visit_paragraphs_mut(body, &mut f);
        }
    }

    /// Number of explicit page breaks in the body
    pub fn page_break_count(&self) -> usize {
        self.body().map(count_page_breaks).unwrap_or(0)
    }

    /// Consume the document and return its body-level content, without the
    /// section properties.
    pub fn into_body_content(mut self) -> Vec<Element> {
        let Some(body) = self.body_mut() else {
            return Vec::new();
        };
        std::mem::take(&mut body.children)
            .into_iter()
            .filter_map(|node| match node {
                Node::Element(el) if !el.is(SECTION_PROPERTIES) => Some(el),
                _ => None,
            })
            .collect()
    }

    /// Append body-level content, keeping the trailing section properties last
    pub fn append_body_content(&mut self, content: Vec<Element>) {
        let Some(body) = self.body_mut() else {
            return;
        };
        let position = body
            .children
            .iter()
            .rposition(|node| matches!(node, Node::Element(el) if el.is(SECTION_PROPERTIES)))
            .unwrap_or(body.children.len());
        body.children
            .splice(position..position, content.into_iter().map(Node::Element));
    }

    /// Append a paragraph holding a single page break
    pub fn add_page_break(&mut self) {
        let page_break = Element::new(PARAGRAPH).with_child(
            Element::new(RUN).with_child(Element::new(BREAK).with_attribute("w:type", "page")),
        );
        self.append_body_content(vec![page_break]);
    }
}

fn visit_paragraphs_mut(element: &mut Element, f: &mut dyn FnMut(&mut Element)) {
    for child in element.elements_mut() {
        if child.is(PARAGRAPH) {
            f(child);
        } else {
            visit_paragraphs_mut(child, f);
        }
    }
}

fn is_page_break(element: &Element) -> bool {
    element.is(BREAK) && element.attribute("w:type").as_deref() == Some("page")
}

fn count_page_breaks(element: &Element) -> usize {
    element
        .elements()
        .map(|child| {
            if is_page_break(child) {
                1
            } else {
                count_page_breaks(child)
            }
        })
        .sum()
}

fn contains_runs(element: &Element) -> bool {
    element
        .elements()
        .any(|child| child.is(RUN) || contains_runs(child))
}

/// A run holding only formatting, text, tabs and breaks. Runs with drawings,
/// fields, symbols or note references are not text runs.
fn is_text_run(run: &Element) -> bool {
    run.elements().all(|child| {
        [RUN_PROPERTIES, TEXT, TAB, BREAK, CARRIAGE_RETURN, LAST_RENDERED_PAGE_BREAK]
            .iter()
            .any(|name| child.is(name))
    })
}

/// Formatting and visible text of one run
fn read_run(run: &Element) -> Run {
    let mut text = String::new();
    let mut properties = None;
    for child in run.elements() {
        match child.name() {
            name if name == RUN_PROPERTIES.as_bytes() => properties = Some(child.clone()),
            name if name == TEXT.as_bytes() => text.push_str(&child.text()),
            name if name == TAB.as_bytes() => text.push('\t'),
            _ if is_page_break(child) => text.push(PAGE_BREAK_CHAR),
            name if name == BREAK.as_bytes() || name == CARRIAGE_RETURN.as_bytes() => {
                text.push('\n')
            }
            _ => {}
        }
    }
    Run { properties, text }
}

/// Child indices of the paragraph's runs, grouped into stretches of
/// consecutive text runs. Non-text runs and wrappers holding runs of their
/// own (hyperlinks, fields, content controls) end a stretch.
fn text_run_groups(paragraph: &Element) -> Vec<Vec<usize>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();

    for (index, node) in paragraph.children.iter().enumerate() {
        let Node::Element(element) = node else {
            continue;
        };
        if element.is(RUN) && is_text_run(element) {
            current.push(index);
        } else if element.is(RUN) || contains_runs(element) {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

/// Rewrite a paragraph one stretch of text runs at a time.
///
/// `rewrite` receives the runs of a stretch and returns their replacement,
/// or `None` to leave the stretch as it is. Everything outside the stretches
/// (drawings, fields, bookmarks, paragraph properties) stays in place.
/// Returns true when any stretch was replaced.
pub fn rewrite_text_runs(
    paragraph: &mut Element,
    mut rewrite: impl FnMut(&[Run]) -> Option<Vec<Run>>,
) -> bool {
    let mut changed = false;

    // Back to front so the indices of earlier stretches stay valid
    for group in text_run_groups(paragraph).into_iter().rev() {
        let runs: Vec<Run> = group
            .iter()
            .filter_map(|&index| match &paragraph.children[index] {
                Node::Element(run) => Some(read_run(run)),
                _ => None,
            })
            .collect();
        let Some(new_runs) = rewrite(&runs) else {
            continue;
        };

        for &index in group.iter().rev() {
            paragraph.children.remove(index);
        }
        let first = group[0];
        paragraph.children.splice(
            first..first,
            new_runs.into_iter().map(|run| Node::Element(build_run(run))),
        );
        changed = true;
    }

    changed
}

fn build_run(run: Run) -> Element {
    let mut element = Element::new(RUN);
    if let Some(properties) = run.properties {
        element.children.push(Node::Element(properties));
    }

    let mut segment = String::new();
    for ch in run.text.chars() {
        let special = match ch {
            '\t' => Element::new(TAB),
            '\n' => Element::new(BREAK),
            PAGE_BREAK_CHAR => Element::new(BREAK).with_attribute("w:type", "page"),
            other => {
                segment.push(other);
                continue;
            }
        };
        flush_text(&mut element, &mut segment);
        element.children.push(Node::Element(special));
    }
    flush_text(&mut element, &mut segment);

    element
}

fn flush_text(run: &mut Element, segment: &mut String) {
    if segment.is_empty() {
        return;
    }
    let text = Element::new(TEXT)
        .with_attribute("xml:space", "preserve")
        .with_child(segment.as_str());
    run.children.push(Node::Element(text));
    segment.clear();
}

/// Inspection helpers for assembled documents
#[cfg(test)]
impl DocxDocument {
    /// Visible text of every paragraph, in document order
    pub fn paragraph_texts(&self) -> Vec<String> {
        let mut texts = Vec::new();
        if let Some(body) = self.body() {
            visit_paragraphs(body, &mut |p| texts.push(paragraph_text(p)));
        }
        texts
    }

    /// All paragraph texts joined with newlines
    pub fn text(&self) -> String {
        self.paragraph_texts().join("\n")
    }

    /// Outline of the body-level elements
    pub fn blocks(&self) -> Vec<Block> {
        self.body()
            .map(|body| {
                body.elements()
                    .filter(|el| !el.is(SECTION_PROPERTIES))
                    .map(block_of)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Serialized main document part
    pub fn main_xml(&self) -> String {
        String::from_utf8(self.main.to_bytes().unwrap()).unwrap()
    }
}

#[cfg(test)]
fn visit_paragraphs(element: &Element, f: &mut dyn FnMut(&Element)) {
    for child in element.elements() {
        if child.is(PARAGRAPH) {
            f(child);
        } else {
            visit_paragraphs(child, f);
        }
    }
}

/// Visible text of a paragraph: its direct runs concatenated
#[cfg(test)]
fn paragraph_text(paragraph: &Element) -> String {
    paragraph
        .elements()
        .filter(|el| el.is(RUN))
        .map(|run| read_run(run).text)
        .collect()
}

#[cfg(test)]
fn block_of(element: &Element) -> Block {
    if element.is(PARAGRAPH) {
        let only_page_breaks = element
            .elements()
            .filter(|el| el.is(RUN))
            .flat_map(|run| run.elements().filter(|el| !el.is(RUN_PROPERTIES)))
            .all(is_page_break);
        if only_page_breaks && count_page_breaks(element) > 0 {
            Block::PageBreak
        } else {
            Block::Paragraph(paragraph_text(element))
        }
    } else if element.is(TABLE) {
        let mut texts = Vec::new();
        visit_paragraphs(element, &mut |p| texts.push(paragraph_text(p)));
        Block::Table(texts)
    } else {
        Block::Other
    }
}
