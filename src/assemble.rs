//! Practice-set assembly: cover, then every record's question pages, then
//! every record's solution pages.
//!
//! Building runs in two steps. Prefetch resolves every distinct source
//! reference concurrently (bounded by `max_concurrent_fetches`). Compose then
//! walks the records in order on a blocking thread, reading only the prefetch
//! results, so fetch completion order can never change page order.

use crate::config::{Config, EmptyPagesPolicy};
use crate::error::Result;
use crate::page_range::parse_page_spec;
use crate::pdf::{render_cover, CoverStyle, DocumentBuilder, PdfDocument};
use crate::record::{Section, SelectionRecord};
use crate::source::{Resolution, Resolver, Unavailable};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Something left out of the output, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Skip {
    Cover {
        reason: String,
    },
    Source {
        record: String,
        section: Section,
        reference: Option<String>,
        reason: String,
    },
    Page {
        record: String,
        section: Section,
        reference: String,
        /// 1-based, as the user wrote it
        page: usize,
        page_count: usize,
    },
}

impl std::fmt::Display for Skip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Skip::Cover { reason } => write!(f, "cover: {reason}"),
            Skip::Source {
                record,
                section,
                reference,
                reason,
            } => write!(
                f,
                "{record} [{section}] {}: {reason}",
                reference.as_deref().unwrap_or("-")
            ),
            Skip::Page {
                record,
                section,
                reference,
                page,
                page_count,
            } => write!(
                f,
                "{record} [{section}] {reference}: page {page} of {page_count} does not exist"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub cover_pages: usize,
    pub question_pages: usize,
    pub solution_pages: usize,
    pub skipped: Vec<Skip>,
}

impl BuildReport {
    pub fn total_pages(&self) -> usize {
        self.cover_pages + self.question_pages + self.solution_pages
    }
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub bytes: Vec<u8>,
    pub report: BuildReport,
}

/// Resolution status of one record section, as reported by [`Assembler::check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCheck {
    pub record: String,
    pub section: Section,
    pub reference: Option<String>,
    pub page_count: Option<usize>,
    /// Pages that would be included, 1-based
    pub pages: Vec<usize>,
    /// Requested pages past the end of the document, 1-based
    pub out_of_range: Vec<usize>,
    pub problem: Option<String>,
}

pub struct Assembler {
    config: Config,
    resolver: Arc<Resolver>,
}

impl Assembler {
    pub fn new(config: Config, resolver: Resolver) -> Self {
        Self {
            config,
            resolver: Arc::new(resolver),
        }
    }

    /// Validate `config` and wire up the filesystem cache and HTTP fetcher it names.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let resolver = Resolver::from_config(&config)?;
        Ok(Self::new(config, resolver))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Assemble `records` into one PDF and return its bytes.
    ///
    /// Unavailable sources, out-of-range pages and cover failures are logged
    /// and skipped; only failing to serialize the result is an error.
    pub async fn assemble(
        &self,
        records: &[SelectionRecord],
        include_solutions: bool,
    ) -> Result<Vec<u8>> {
        Ok(self
            .assemble_with_report(records, include_solutions)
            .await?
            .bytes)
    }

    pub async fn assemble_with_report(
        &self,
        records: &[SelectionRecord],
        include_solutions: bool,
    ) -> Result<Assembly> {
        let sections = sections(include_solutions);
        let resolved = self.prefetch(records, &sections).await;

        let records = records.to_vec();
        let policy = self.config.empty_pages;
        let style = CoverStyle::new(self.config.cover_heading.clone());
        let assembly = tokio::task::spawn_blocking(move || {
            compose(&records, &resolved, &sections, policy, |titles| {
                render_cover(titles, &style)
            })
        })
        .await??;

        info!(
            cover = assembly.report.cover_pages,
            questions = assembly.report.question_pages,
            solutions = assembly.report.solution_pages,
            skipped = assembly.report.skipped.len(),
            bytes = assembly.bytes.len(),
            "assembled practice set"
        );
        Ok(assembly)
    }

    /// Resolve every source the build would use and report what would be
    /// included, without producing a document.
    pub async fn check(
        &self,
        records: &[SelectionRecord],
        include_solutions: bool,
    ) -> Vec<SourceCheck> {
        let sections = sections(include_solutions);
        let resolved = self.prefetch(records, &sections).await;
        let policy = self.config.empty_pages;

        let mut loaded = DocumentCache::default();
        let mut checks = Vec::new();
        for &section in &sections {
            for record in records {
                let mut check = SourceCheck {
                    record: record.identifier.clone(),
                    section,
                    reference: None,
                    page_count: None,
                    pages: Vec::new(),
                    out_of_range: Vec::new(),
                    problem: None,
                };
                match record.source(section) {
                    None => check.problem = Some(Unavailable::Empty.to_string()),
                    Some((reference, spec)) => {
                        check.reference = Some(reference.to_string());
                        match loaded.load(reference, &resolved) {
                            Ok(doc) => {
                                let (present, missing) =
                                    doc.partition_pages(&select_pages(doc, spec, policy));
                                check.page_count = Some(doc.page_count());
                                check.pages = present.into_iter().map(|i| i + 1).collect();
                                check.out_of_range =
                                    missing.into_iter().map(|i| i + 1).collect();
                            }
                            Err(reason) => check.problem = Some(reason),
                        }
                    }
                }
                checks.push(check);
            }
        }
        checks
    }

    async fn prefetch(
        &self,
        records: &[SelectionRecord],
        sections: &[Section],
    ) -> HashMap<String, Resolution> {
        let mut references: Vec<String> = Vec::new();
        for &section in sections {
            for record in records {
                if let Some((reference, _)) = record.source(section) {
                    if !references.iter().any(|r| r == reference) {
                        references.push(reference.to_string());
                    }
                }
            }
        }
        debug!(
            sources = references.len(),
            workers = self.config.max_concurrent_fetches,
            "resolving sources"
        );

        stream::iter(references)
            .map(|reference| {
                let resolver = self.resolver.clone();
                async move {
                    let resolution = resolver.resolve(Some(&reference)).await;
                    (reference, resolution)
                }
            })
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .collect()
            .await
    }
}

fn sections(include_solutions: bool) -> Vec<Section> {
    if include_solutions {
        vec![Section::Question, Section::Solution]
    } else {
        vec![Section::Question]
    }
}

/// Parsed documents for one build, so a source shared by several records is
/// parsed once.
#[derive(Default)]
struct DocumentCache {
    docs: HashMap<String, std::result::Result<PdfDocument, String>>,
}

impl DocumentCache {
    fn load(
        &mut self,
        reference: &str,
        resolved: &HashMap<String, Resolution>,
    ) -> std::result::Result<&PdfDocument, String> {
        self.docs
            .entry(reference.to_string())
            .or_insert_with(|| match resolved.get(reference) {
                Some(Resolution::Found(source)) => {
                    PdfDocument::from_bytes(reference, &source.bytes).map_err(|e| format!("{e:#}"))
                }
                Some(Resolution::Unavailable(reason)) => Err(reason.to_string()),
                None => Err("source was not resolved".to_string()),
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

/// Zero-based pages to take from `doc` for a page spec, before range checks.
fn select_pages(doc: &PdfDocument, spec: Option<&str>, policy: EmptyPagesPolicy) -> Vec<usize> {
    let requested = parse_page_spec(spec.unwrap_or(""));
    if !requested.is_empty() {
        return requested;
    }
    match policy {
        EmptyPagesPolicy::WholeDocument => (0..doc.page_count()).collect(),
        EmptyPagesPolicy::Nothing => Vec::new(),
    }
}

fn compose(
    records: &[SelectionRecord],
    resolved: &HashMap<String, Resolution>,
    sections: &[Section],
    policy: EmptyPagesPolicy,
    cover: impl FnOnce(&[String]) -> anyhow::Result<lopdf::Document>,
) -> Result<Assembly> {
    let mut builder = DocumentBuilder::new();
    let mut report = BuildReport::default();

    let titles: Vec<String> = records.iter().map(SelectionRecord::display_title).collect();
    match cover(&titles) {
        Ok(cover) => {
            report.cover_pages = builder.append_all(&PdfDocument::from_document("cover", cover));
        }
        Err(e) => {
            warn!(error = %e, "cover page failed; continuing without it");
            report.skipped.push(Skip::Cover {
                reason: format!("{e:#}"),
            });
        }
    }

    let mut loaded = DocumentCache::default();
    for &section in sections {
        for record in records {
            let appended = append_section(
                &mut builder,
                &mut loaded,
                resolved,
                record,
                section,
                policy,
                &mut report,
            );
            match section {
                Section::Question => report.question_pages += appended,
                Section::Solution => report.solution_pages += appended,
            }
        }
    }

    let bytes = builder.finish()?;
    Ok(Assembly { bytes, report })
}

fn append_section(
    builder: &mut DocumentBuilder,
    loaded: &mut DocumentCache,
    resolved: &HashMap<String, Resolution>,
    record: &SelectionRecord,
    section: Section,
    policy: EmptyPagesPolicy,
    report: &mut BuildReport,
) -> usize {
    let Some((reference, spec)) = record.source(section) else {
        debug!(record = %record.identifier, %section, "no source configured");
        report.skipped.push(Skip::Source {
            record: record.identifier.clone(),
            section,
            reference: None,
            reason: Unavailable::Empty.to_string(),
        });
        return 0;
    };

    let doc = match loaded.load(reference, resolved) {
        Ok(doc) => doc,
        Err(reason) => {
            warn!(record = %record.identifier, %section, reference, %reason, "skipping section");
            report.skipped.push(Skip::Source {
                record: record.identifier.clone(),
                section,
                reference: Some(reference.to_string()),
                reason,
            });
            return 0;
        }
    };

    let indices = select_pages(doc, spec, policy);
    if indices.is_empty() {
        debug!(record = %record.identifier, %section, reference, "page spec selects nothing");
    }

    let (present, missing) = doc.partition_pages(&indices);
    for index in missing {
        warn!(
            record = %record.identifier,
            %section,
            reference,
            page = index + 1,
            page_count = doc.page_count(),
            "page out of range; skipping"
        );
        report.skipped.push(Skip::Page {
            record: record.identifier.clone(),
            section,
            reference: reference.to_string(),
            page: index + 1,
            page_count: doc.page_count(),
        });
    }

    builder.append_pages(doc, &present)
}
