use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static QUESTION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)q_*(\d+[a-z]*)\s*$").expect("valid regex"));

/// One question (plus optional solution) chosen for an output document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub identifier: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub question_source: Option<String>,
    #[serde(default)]
    pub question_pages: Option<String>,
    #[serde(default)]
    pub solution_source: Option<String>,
    #[serde(default)]
    pub solution_pages: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub paper: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

/// Which half of a record a source reference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Question,
    Solution,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Question => f.write_str("question"),
            Section::Solution => f.write_str("solution"),
        }
    }
}

impl SelectionRecord {
    /// Cover-page title, synthesized from the identifier and metadata when
    /// no explicit title was supplied.
    pub fn display_title(&self) -> String {
        if let Some(title) = self.title.as_deref().map(str::trim) {
            if !title.is_empty() {
                return title.to_string();
            }
        }
        compose_title(
            &self.identifier,
            self.year.as_deref(),
            self.paper.as_deref(),
            self.topic.as_deref(),
        )
    }

    /// Source reference and page spec for one section; blank references are `None`.
    pub fn source(&self, section: Section) -> Option<(&str, Option<&str>)> {
        let (source, pages) = match section {
            Section::Question => (&self.question_source, &self.question_pages),
            Section::Solution => (&self.solution_source, &self.solution_pages),
        };
        source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| (s, pages.as_deref()))
    }
}

/// Short label for a question id: `2014_P1_Q12` becomes `Q12`.
pub fn question_label(identifier: &str) -> String {
    let identifier = identifier.trim();
    if let Some(caps) = QUESTION_NUMBER.captures(identifier) {
        return format!("Q{}", caps[1].to_uppercase());
    }
    identifier
        .rsplit('_')
        .next()
        .unwrap_or(identifier)
        .to_uppercase()
}

/// `<label> – <year> <paper> – <topic>`, omitting missing parts.
pub fn compose_title(
    identifier: &str,
    year: Option<&str>,
    paper: Option<&str>,
    topic: Option<&str>,
) -> String {
    let mut parts = Vec::new();

    let label = question_label(identifier);
    if !label.is_empty() {
        parts.push(label);
    }

    let sitting = [year, paper]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !sitting.is_empty() {
        parts.push(sitting);
    }

    if let Some(topic) = topic.map(str::trim).filter(|t| !t.is_empty()) {
        parts.push(topic.to_string());
    }

    parts.join(" – ")
}

/// Load selection records from a JSON array.
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<SelectionRecord>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| Error::Records {
        path: path.to_path_buf(),
        source,
    })
}
