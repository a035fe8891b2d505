//! Question bank rows, filtering and random sampling.

use crate::error::{Error, Result};
use crate::record::{compose_title, SelectionRecord};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

const QUESTION_ID_COLUMNS: &[&str] = &["question_id", "qid", "question id"];
const PDF_QUESTION_COLUMNS: &[&str] = &["pdf_question", "pdf question"];
const PDF_SOLUTION_COLUMNS: &[&str] = &["pdf_solution", "pdf solution"];
const Q_PAGES_COLUMNS: &[&str] = &[
    "q_pages",
    "qpages",
    "question_pages",
    "q_page",
    "q_page_no",
    "q_pagenumber",
];
const S_PAGES_COLUMNS: &[&str] = &[
    "s_pages",
    "spages",
    "solution_pages",
    "s_page",
    "s_page_no",
    "s_pagenumber",
];

/// One row of the question bank, as exported from the spreadsheet.
///
/// Column names are matched case-insensitively, ignoring surrounding
/// whitespace, against the known spellings for each field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuestionRow {
    pub question_id: Option<String>,
    pub topic: Option<String>,
    pub year: Option<String>,
    pub paper: Option<String>,
    pub pdf_question: Option<String>,
    pub pdf_solution: Option<String>,
    pub q_pages: Option<String>,
    pub s_pages: Option<String>,
}

impl<'de> Deserialize<'de> for QuestionRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = serde_json::Map::<String, Value>::deserialize(deserializer)?;
        let columns: HashMap<String, &Value> = raw
            .iter()
            .map(|(name, value)| (name.trim().to_lowercase(), value))
            .collect();
        let column = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| columns.get(*name))
                .and_then(|value| text(value))
        };

        Ok(QuestionRow {
            question_id: column(QUESTION_ID_COLUMNS),
            topic: column(&["topic"]),
            year: column(&["year"]),
            paper: column(&["paper"]),
            pdf_question: column(PDF_QUESTION_COLUMNS),
            pdf_solution: column(PDF_SOLUTION_COLUMNS),
            q_pages: column(Q_PAGES_COLUMNS),
            s_pages: column(S_PAGES_COLUMNS),
        })
    }
}

/// Cell text. Numbers are accepted since years and page numbers often come
/// through as numbers; blank strings and nulls become `None`.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(match n.as_f64() {
            // 2019.0 from a spreadsheet export is still year 2019
            Some(f) if f.fract() == 0.0 && n.is_f64() => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

impl QuestionRow {
    pub fn year(&self) -> &str {
        self.year.as_deref().unwrap_or("")
    }

    pub fn paper(&self) -> &str {
        self.paper.as_deref().unwrap_or("")
    }

    pub fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or("")
    }

    /// Stable id: the explicit one, else `<year>_<paper>`.
    pub fn id(&self) -> String {
        match &self.question_id {
            Some(id) => id.clone(),
            None => [self.year(), self.paper()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("_"),
        }
    }

    pub fn title(&self) -> String {
        compose_title(
            &self.id(),
            self.year.as_deref(),
            self.paper.as_deref(),
            self.topic.as_deref(),
        )
    }

    /// Convert to a selection record, filling in the conventional source
    /// locations when the row doesn't name them.
    pub fn to_record(&self) -> SelectionRecord {
        let year = self.year();
        SelectionRecord {
            identifier: self.id(),
            title: Some(self.title()),
            question_source: Some(
                self.pdf_question
                    .clone()
                    .unwrap_or_else(|| format!("papers/{year}.pdf")),
            ),
            question_pages: self.q_pages.clone(),
            solution_source: Some(
                self.pdf_solution
                    .clone()
                    .unwrap_or_else(|| format!("solutions/{year}_Solutions.pdf")),
            ),
            solution_pages: self.s_pages.clone(),
            year: self.year.clone(),
            paper: self.paper.clone(),
            topic: self.topic.clone(),
        }
    }
}

/// Load the question bank from a JSON array of rows. Rows without a topic
/// or year are dropped.
pub fn load_bank<P: AsRef<Path>>(path: P) -> Result<Vec<QuestionRow>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let rows: Vec<QuestionRow> = serde_json::from_slice(&bytes).map_err(|source| Error::Records {
        path: path.to_path_buf(),
        source,
    })?;
    let total = rows.len();
    let rows: Vec<_> = rows
        .into_iter()
        .filter(|r| r.topic.is_some() && r.year.is_some())
        .collect();
    tracing::info!(
        path = %path.display(),
        loaded = rows.len(),
        dropped = total - rows.len(),
        "loaded question bank"
    );
    Ok(rows)
}

/// Optional exact-match filters; `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub year: Option<String>,
    pub paper: Option<String>,
    pub topic: Option<String>,
}

impl Filters {
    pub fn matches(&self, row: &QuestionRow) -> bool {
        fn eq(want: &Option<String>, have: &str) -> bool {
            want.as_deref()
                .map(|w| w.trim().eq_ignore_ascii_case(have.trim()))
                .unwrap_or(true)
        }
        eq(&self.year, row.year()) && eq(&self.paper, row.paper()) && eq(&self.topic, row.topic())
    }

    pub fn apply<'a>(&self, rows: &'a [QuestionRow]) -> Vec<&'a QuestionRow> {
        rows.iter().filter(|r| self.matches(r)).collect()
    }
}

fn paper_rank(paper: &str) -> u8 {
    match paper.trim().to_ascii_uppercase().as_str() {
        "P1" => 1,
        "P2" => 2,
        _ => 3,
    }
}

/// Sort by year, then paper (P1, P2, everything else).
pub fn sort_for_display(rows: &mut [QuestionRow]) {
    rows.sort_by(|a, b| {
        a.year()
            .cmp(b.year())
            .then_with(|| paper_rank(a.paper()).cmp(&paper_rank(b.paper())))
    });
}

/// Draw up to `n` distinct rows at random and sort them for display.
pub fn sample<R: Rng + ?Sized>(rows: &[&QuestionRow], n: usize, rng: &mut R) -> Vec<QuestionRow> {
    let mut picked: Vec<QuestionRow> = rows
        .choose_multiple(rng, n.min(rows.len()))
        .map(|r| (*r).clone())
        .collect();
    sort_for_display(&mut picked);
    picked
}

/// Ids of questions already handed out, persisted between runs.
#[derive(Debug, Clone, Default)]
pub struct History {
    path: Option<PathBuf>,
    used: BTreeSet<String>,
}

impl History {
    /// In-memory history that is never saved.
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file is an empty history.
    pub fn load<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let used = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| Error::Records {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(source) => return Err(Error::Read { path, source }),
        };
        Ok(Self {
            path: Some(path),
            used,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&self.used)
            .map_err(|e| Error::Config(format!("history: {e}")))?;
        std::fs::write(path, bytes).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })
    }

    /// Sample `n` questions not yet used. When fewer than `n` unused remain
    /// the history is reset first. The draw is recorded and saved.
    pub fn sample_unused<R: Rng + ?Sized>(
        &mut self,
        rows: &[&QuestionRow],
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<QuestionRow>> {
        let mut available: Vec<&QuestionRow> = rows
            .iter()
            .copied()
            .filter(|r| !self.contains(&r.id()))
            .collect();
        if available.len() < n {
            tracing::warn!(
                unused = available.len(),
                requested = n,
                "not enough unused questions left; resetting history"
            );
            self.used.clear();
            available = rows.to_vec();
        }

        let picked = sample(&available, n, rng);
        self.used.extend(picked.iter().map(QuestionRow::id));
        self.save()?;
        Ok(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn row(id: &str, year: &str, paper: &str, topic: &str) -> QuestionRow {
        QuestionRow {
            question_id: Some(id.into()),
            year: Some(year.into()),
            paper: Some(paper.into()),
            topic: Some(topic.into()),
            ..Default::default()
        }
    }

    fn bank() -> Vec<QuestionRow> {
        vec![
            row("2021_P2_Q1", "2021", "P2", "Algebra"),
            row("2019_P1_Q4", "2019", "P1", "Calculus"),
            row("2021_P1_Q3", "2021", "P1", "Algebra"),
            row("2020_P2_Q9", "2020", "P2", "Probability"),
            row("2019_P2_Q2", "2019", "P2", "Algebra"),
        ]
    }

    #[test]
    fn test_deserialize_spreadsheet_aliases_and_numbers() {
        let json = r#"[
            {"qid": "2014_P1_Q12", "topic": "Algebra", "year": 2014, "paper": "P1",
             "PDF Question": "papers/2014.pdf", "Q_Pages": "2-3", "s_page_no": 5},
            {"topic": "Calculus", "year": 2015.0, "paper": "P2", "pdf_solution": "  "}
        ]"#;
        let rows: Vec<QuestionRow> = serde_json::from_str(json).unwrap();

        assert_eq!(rows[0].question_id.as_deref(), Some("2014_P1_Q12"));
        assert_eq!(rows[0].year.as_deref(), Some("2014"));
        assert_eq!(rows[0].q_pages.as_deref(), Some("2-3"));
        assert_eq!(rows[0].s_pages.as_deref(), Some("5"));
        assert_eq!(rows[1].year.as_deref(), Some("2015"));
        assert_eq!(rows[1].pdf_solution, None);
        assert_eq!(rows[1].id(), "2015_P2");
    }

    #[test]
    fn test_column_names_match_case_insensitively() {
        let json = r#"[
            {"Question_ID": "2014_P1_Q12", " Topic ": "Algebra", "Year": 2014, "Paper": "P1",
             "PDF Question": "papers/2014.pdf", "Q_PAGES": "2", "S_Page_No": 4}
        ]"#;
        let rows: Vec<QuestionRow> = serde_json::from_str(json).unwrap();

        assert_eq!(
            rows[0],
            QuestionRow {
                question_id: Some("2014_P1_Q12".into()),
                topic: Some("Algebra".into()),
                year: Some("2014".into()),
                paper: Some("P1".into()),
                pdf_question: Some("papers/2014.pdf".into()),
                pdf_solution: None,
                q_pages: Some("2".into()),
                s_pages: Some("4".into()),
            }
        );
    }

    #[test]
    fn test_load_bank_keeps_capitalised_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.json");
        std::fs::write(
            &path,
            r#"[{"Topic": "Algebra", "Year": "2014", "Paper": "P1"}, {"Topic": "Calculus"}]"#,
        )
        .unwrap();

        let rows = load_bank(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id(), "2014_P1");
    }

    #[test]
    fn test_to_record_defaults() {
        let record = QuestionRow {
            question_id: None,
            ..row("", "2018", "P1", "Vectors")
        }
        .to_record();

        assert_eq!(record.identifier, "2018_P1");
        assert_eq!(record.question_source.as_deref(), Some("papers/2018.pdf"));
        assert_eq!(
            record.solution_source.as_deref(),
            Some("solutions/2018_Solutions.pdf")
        );
        assert_eq!(record.title.as_deref(), Some("P1 – 2018 P1 – Vectors"));
    }

    #[test]
    fn test_title() {
        assert_eq!(
            row("2014_P1_Q12", "2014", "P1", "Algebra").title(),
            "Q12 – 2014 P1 – Algebra"
        );
    }

    #[test]
    fn test_filters() {
        let rows = bank();
        let filters = Filters {
            topic: Some("algebra".into()),
            ..Default::default()
        };
        assert_eq!(filters.apply(&rows).len(), 3);

        let filters = Filters {
            year: Some("2021".into()),
            paper: Some("P1".into()),
            topic: None,
        };
        let hits = filters.apply(&rows);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "2021_P1_Q3");

        assert_eq!(Filters::default().apply(&rows).len(), rows.len());
    }

    #[test]
    fn test_sample_is_sorted_and_bounded() {
        let rows = bank();
        let refs: Vec<&QuestionRow> = rows.iter().collect();
        let mut rng = StdRng::seed_from_u64(7);

        let all = sample(&refs, 50, &mut rng);
        let ids: Vec<String> = all.iter().map(QuestionRow::id).collect();
        assert_eq!(
            ids,
            vec!["2019_P1_Q4", "2019_P2_Q2", "2020_P2_Q9", "2021_P1_Q3", "2021_P2_Q1"]
        );

        let two = sample(&refs, 2, &mut rng);
        assert_eq!(two.len(), 2);
        assert_ne!(two[0].id(), two[1].id());
    }

    #[test]
    fn test_history_avoids_repeats_then_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("used.json");
        let rows = bank();
        let refs: Vec<&QuestionRow> = rows.iter().collect();
        let mut rng = StdRng::seed_from_u64(1);

        let mut history = History::load(&path).unwrap();
        assert!(history.is_empty());
        let first = history.sample_unused(&refs, 3, &mut rng).unwrap();
        let second = history.sample_unused(&refs, 2, &mut rng).unwrap();
        let mut seen: Vec<String> = first.iter().chain(&second).map(QuestionRow::id).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 5);

        // persisted
        let reloaded = History::load(&path).unwrap();
        assert_eq!(reloaded.len(), 5);

        // exhausted: resets and still returns a full draw
        let mut history = reloaded;
        let third = history.sample_unused(&refs, 2, &mut rng).unwrap();
        assert_eq!(third.len(), 2);
        assert_eq!(history.len(), 2);
    }
}
