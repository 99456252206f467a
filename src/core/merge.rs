//! Marker substitution across paragraphs and runs
//!
//! Word splits a paragraph's text into runs wherever formatting, spell-check
//! state or edit history changes, so a marker such as `{{CEDULA}}` can end up
//! spread over several runs. Markers are therefore searched in the joined
//! text of each stretch of consecutive text runs. A stretch that contains at
//! least one marker is collapsed into a single run (carrying the first run's
//! formatting) holding the substituted text. Runs with drawings or fields
//! and stretches without markers are left untouched.

use super::document::{rewrite_text_runs, DocxDocument, Run};

/// Ordered marker → value pairs for one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplacementSet {
    pairs: Vec<(String, String)>,
}

impl ReplacementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value for a marker. Empty markers are ignored.
    pub fn insert(&mut self, marker: impl Into<String>, value: impl Into<String>) {
        let marker = marker.into();
        if marker.is_empty() {
            return;
        }
        let value = value.into();
        match self.pairs.iter_mut().find(|(m, _)| *m == marker) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((marker, value)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, marker: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(m, _)| m == marker)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(m, v)| (m.as_str(), v.as_str()))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<M: Into<String>, V: Into<String>> FromIterator<(M, V)> for ReplacementSet {
    fn from_iter<I: IntoIterator<Item = (M, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (marker, value) in iter {
            set.insert(marker, value);
        }
        set
    }
}

/// Replace every marker occurrence in `text`.
///
/// Scans left to right in a single pass, so replacement values are never
/// searched again. When two markers start at the same position the longer
/// one wins. Returns `None` when no marker occurs.
pub fn substitute(text: &str, replacements: &ReplacementSet) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut matched = false;

    loop {
        let next = replacements
            .iter()
            .filter_map(|(marker, value)| rest.find(marker).map(|at| (at, marker, value)))
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())));

        match next {
            Some((at, marker, value)) => {
                out.push_str(&rest[..at]);
                out.push_str(value);
                rest = &rest[at + marker.len()..];
                matched = true;
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }

    matched.then_some(out)
}

/// Rewrite a paragraph's runs.
///
/// Returns `None` when the concatenated text holds no marker, otherwise a
/// single run with the first run's formatting and the substituted text.
pub fn rewrite_runs(runs: &[Run], replacements: &ReplacementSet) -> Option<Vec<Run>> {
    let text: String = runs.iter().map(|run| run.text.as_str()).collect();
    let text = substitute(&text, replacements)?;
    let properties = runs.first().and_then(|run| run.properties.clone());
    Some(vec![Run { properties, text }])
}

/// Substitute markers in every paragraph of the document, including those in
/// table cells. Returns the number of paragraphs rewritten.
pub fn merge(document: &mut DocxDocument, replacements: &ReplacementSet) -> usize {
    if replacements.is_empty() {
        return 0;
    }
    let mut rewritten = 0;
    document.for_each_paragraph_mut(|paragraph| {
        if rewrite_text_runs(paragraph, |runs| rewrite_runs(runs, replacements)) {
            rewritten += 1;
        }
    });
    tracing::debug!("Rewrote {} paragraphs", rewritten);
    rewritten
}
