use anyhow::{anyhow, Result};
use std::collections::BTreeSet;

/// Upper bound on a single page number; larger values are treated as malformed.
pub const MAX_PAGE_NUMBER: u32 = 100_000;

/// One token of a page specification, in the user's 1-based numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRange {
    Single(u32),
    Span { start: u32, end: u32 },
}

impl PageRange {
    /// Parse a single token like "5" or "2-4".
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow!("Empty page range"));
        }

        if let Some(dash_pos) = s.find('-') {
            // "-5" is a negative number, not an open range
            if dash_pos == 0 {
                return Err(anyhow!("Invalid page range: {}", s));
            }

            let start = parse_page_number(&s[..dash_pos])?;
            let end = parse_page_number(&s[dash_pos + 1..])?;
            Ok(PageRange::Span { start, end })
        } else {
            Ok(PageRange::Single(parse_page_number(s)?))
        }
    }

    /// Zero-based indices covered by this token.
    ///
    /// Reversed spans (`5-2`) cover nothing.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let (start, end) = match *self {
            PageRange::Single(n) => (n, n),
            PageRange::Span { start, end } => (start, end),
        };
        (start as usize..=end as usize).map(|page| page - 1)
    }
}

fn parse_page_number(s: &str) -> Result<u32> {
    let s = s.trim();
    let n: u32 = s
        .parse()
        .map_err(|_| anyhow!("Invalid page number: {}", s))?;
    if n == 0 {
        return Err(anyhow!("Page numbers must be >= 1"));
    }
    if n > MAX_PAGE_NUMBER {
        return Err(anyhow!("Page {} exceeds limit {}", n, MAX_PAGE_NUMBER));
    }
    Ok(n)
}

/// Parse a page specification like "2-4,6" into ascending, deduplicated
/// zero-based page indices.
///
/// Tokens are separated by commas and/or whitespace. Tokens that don't parse
/// (non-numeric, zero, negative) are dropped with a debug log; this never fails.
pub fn parse_page_spec(spec: &str) -> Vec<usize> {
    let mut pages = BTreeSet::new();

    for token in spec
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        match PageRange::parse(token) {
            Ok(range) => pages.extend(range.indices()),
            Err(e) => tracing::debug!(token, error = %e, "dropping page token"),
        }
    }

    pages.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_page() {
        let range = PageRange::parse("5").unwrap();
        assert_eq!(range, PageRange::Single(5));
        assert_eq!(range.indices().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_page_range() {
        let range = PageRange::parse("1-5").unwrap();
        assert_eq!(range.indices().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_reverse_range_is_empty() {
        let range = PageRange::parse("5-1").unwrap();
        assert_eq!(range.indices().count(), 0);
        assert_eq!(parse_page_spec("5-1"), Vec::<usize>::new());
    }

    #[test]
    fn test_comma_separated() {
        assert_eq!(parse_page_spec("2-4,6"), vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_whitespace_and_mixed_separators() {
        assert_eq!(parse_page_spec(" 3 1,, 2 "), vec![0, 1, 2]);
        assert_eq!(parse_page_spec("1, 3-4\t7"), vec![0, 2, 3, 6]);
    }

    #[test]
    fn test_empty_and_garbage() {
        assert_eq!(parse_page_spec(""), Vec::<usize>::new());
        assert_eq!(parse_page_spec("   "), Vec::<usize>::new());
        assert_eq!(parse_page_spec("abc"), Vec::<usize>::new());
        assert_eq!(parse_page_spec("a-3,2-b"), Vec::<usize>::new());
    }

    #[test]
    fn test_zero_and_negative_dropped() {
        assert_eq!(parse_page_spec("0,-1,3"), vec![2]);
        // a range touching zero is dropped whole
        assert_eq!(parse_page_spec("0-2,5"), vec![4]);
    }

    #[test]
    fn test_overlapping_ranges_dedup() {
        assert_eq!(parse_page_spec("4,2-5,3"), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_absurd_page_numbers_dropped() {
        assert_eq!(parse_page_spec("2,1-4000000000"), vec![1]);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let spec = "7, 2-3 ,x,2";
        assert_eq!(parse_page_spec(spec), parse_page_spec(spec));
    }
}
