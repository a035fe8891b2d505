use crate::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// What to include when a record's page specification selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPagesPolicy {
    /// An absent or empty spec means the whole source document.
    #[default]
    WholeDocument,
    /// An absent or empty spec means no pages from that source.
    Nothing,
}

impl FromStr for EmptyPagesPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whole" | "all" | "whole-document" => Ok(EmptyPagesPolicy::WholeDocument),
            "none" | "nothing" => Ok(EmptyPagesPolicy::Nothing),
            other => Err(Error::Config(format!(
                "unknown empty-pages policy {:?} (expected \"whole\" or \"none\")",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Append solution pages after all question pages
    pub include_solutions: bool,
    /// Base directory for relative local references
    pub document_root: PathBuf,
    /// Durable store for fetched remote documents
    pub cache_dir: PathBuf,
    /// Per-attempt network timeout
    pub fetch_timeout: Duration,
    /// Attempts per remote fetch, including the first
    pub fetch_attempts: u32,
    /// Worker limit for concurrent resolution
    pub max_concurrent_fetches: usize,
    pub empty_pages: EmptyPagesPolicy,
    /// Banner text on the cover page
    pub cover_heading: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_solutions: true,
            document_root: PathBuf::from("."),
            cache_dir: std::env::temp_dir().join("mintset-cache"),
            fetch_timeout: Duration::from_secs(20),
            fetch_attempts: 3,
            max_concurrent_fetches: 4,
            empty_pages: EmptyPagesPolicy::WholeDocument,
            cover_heading: "Mint Maths Practice Set".to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden by `MINTSET_*` environment variables.
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            include_solutions: env_parse("MINTSET_INCLUDE_SOLUTIONS")
                .unwrap_or(default.include_solutions),
            document_root: std::env::var("MINTSET_DOCUMENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.document_root),
            cache_dir: std::env::var("MINTSET_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.cache_dir),
            fetch_timeout: env_parse("MINTSET_FETCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.fetch_timeout),
            fetch_attempts: env_parse("MINTSET_FETCH_ATTEMPTS").unwrap_or(default.fetch_attempts),
            max_concurrent_fetches: env_parse("MINTSET_MAX_CONCURRENT")
                .unwrap_or(default.max_concurrent_fetches),
            empty_pages: env_parse("MINTSET_EMPTY_PAGES").unwrap_or(default.empty_pages),
            cover_heading: std::env::var("MINTSET_COVER_HEADING")
                .unwrap_or(default.cover_heading),
        }
    }

    /// Apply a command-line `--no-solutions`. The flag can only turn
    /// solutions off, never back on over `MINTSET_INCLUDE_SOLUTIONS=false`.
    pub fn suppress_solutions(mut self, suppress: bool) -> Self {
        if suppress {
            self.include_solutions = false;
        }
        self
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_attempts == 0 {
            return Err(Error::Config("fetch_attempts must be at least 1".into()));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(Error::Config(
                "max_concurrent_fetches must be at least 1".into(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(Error::Config("fetch_timeout must be non-zero".into()));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.include_solutions);
        assert_eq!(config.empty_pages, EmptyPagesPolicy::WholeDocument);
        assert_eq!(config.fetch_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_pages_policy_from_str() {
        assert_eq!(
            "whole".parse::<EmptyPagesPolicy>().unwrap(),
            EmptyPagesPolicy::WholeDocument
        );
        assert_eq!(
            " None ".parse::<EmptyPagesPolicy>().unwrap(),
            EmptyPagesPolicy::Nothing
        );
        assert!("some".parse::<EmptyPagesPolicy>().is_err());
    }

    #[test]
    fn test_include_solutions_from_env_and_flag() {
        std::env::set_var("MINTSET_INCLUDE_SOLUTIONS", "false");
        let from_env = Config::from_env();
        std::env::remove_var("MINTSET_INCLUDE_SOLUTIONS");
        assert!(!from_env.include_solutions);
        assert!(!from_env.suppress_solutions(false).include_solutions);

        assert!(Config::default().suppress_solutions(false).include_solutions);
        assert!(!Config::default().suppress_solutions(true).include_solutions);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = Config {
            max_concurrent_fetches: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
