use anyhow::{Context, Result};
use lopdf::Document;

pub struct PdfDocument {
    pub doc: Document,
    /// The reference this document was resolved from, for diagnostics.
    pub reference: String,
}

impl PdfDocument {
    pub fn from_bytes(reference: &str, bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes)
            .with_context(|| format!("Failed to parse PDF: {}", reference))?;
        Ok(PdfDocument {
            doc,
            reference: reference.to_string(),
        })
    }

    pub fn from_document(reference: &str, doc: Document) -> Self {
        PdfDocument {
            doc,
            reference: reference.to_string(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Split requested zero-based indices into those present in this document
    /// and those past its end.
    pub fn partition_pages(&self, indices: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let total = self.page_count();
        indices.iter().copied().partition(|&i| i < total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::marked_pdf;

    #[test]
    fn test_from_bytes_counts_pages() {
        let doc = PdfDocument::from_bytes("mem", &marked_pdf(&["a", "b", "c"])).unwrap();
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let err = PdfDocument::from_bytes("junk.pdf", b"not a pdf").err().unwrap();
        assert!(err.to_string().contains("junk.pdf"));
    }

    #[test]
    fn test_partition_pages() {
        let doc = PdfDocument::from_bytes("mem", &marked_pdf(&["a", "b", "c"])).unwrap();
        let (present, missing) = doc.partition_pages(&[0, 2, 3, 98]);
        assert_eq!(present, vec![0, 2]);
        assert_eq!(missing, vec![3, 98]);
    }
}
