use crate::error::{Error, Result};
use crate::pdf::PdfDocument;
use lopdf::{dictionary, Document, Object, ObjectId};

/// Page attributes a page may inherit from its ancestors in the page tree.
/// They are copied onto each page before it is moved under a new parent.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page tree nesting deeper than this is treated as malformed.
const MAX_TREE_DEPTH: usize = 64;

/// Accumulates pages from any number of source documents, in append order,
/// into one output document.
pub struct DocumentBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append the given zero-based pages of `source`, in the order given.
    ///
    /// Indices past the end of `source` are ignored; callers that care
    /// should split them off first with [`PdfDocument::partition_pages`].
    /// Returns the number of pages appended.
    pub fn append_pages(&mut self, source: &PdfDocument, indices: &[usize]) -> usize {
        if indices.is_empty() {
            return 0;
        }

        // Renumber a private copy past everything we hold so IDs can't collide.
        let mut src = source.doc.clone();
        src.renumber_objects_with(self.doc.max_id + 1);
        let page_ids: Vec<ObjectId> = src.get_pages().into_values().collect();

        let mut appended = Vec::new();
        for &index in indices {
            let Some(&page_id) = page_ids.get(index) else {
                continue;
            };
            let inherited = inherited_attributes(&src, page_id);
            match src.get_dictionary_mut(page_id) {
                Ok(page) => {
                    for (key, value) in inherited {
                        page.set(key.to_vec(), value);
                    }
                    page.set("Parent", Object::Reference(self.pages_id));
                    appended.push(page_id);
                }
                Err(e) => {
                    tracing::warn!(
                        reference = %source.reference,
                        page = index + 1,
                        error = %e,
                        "page object is not a dictionary; skipping"
                    );
                }
            }
        }

        if appended.is_empty() {
            return 0;
        }

        let src_max = src.objects.keys().map(|&(id, _)| id).max().unwrap_or(0);
        self.doc.max_id = self.doc.max_id.max(src.max_id).max(src_max);
        self.doc.objects.extend(src.objects);
        self.kids.extend(&appended);
        appended.len()
    }

    /// Append every page of `source`.
    pub fn append_all(&mut self, source: &PdfDocument) -> usize {
        let all: Vec<usize> = (0..source.page_count()).collect();
        self.append_pages(source, &all)
    }

    /// Build the page tree and catalog, drop objects no page needs, and serialize.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        });
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.prune_objects();

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| Error::Serialize(e.to_string()))?;
        Ok(buffer)
    }
}

/// Collect inheritable attributes the page lacks from its nearest ancestors.
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(&'static [u8], Object)> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };

    let mut missing: Vec<&'static [u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut found = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        if missing.is_empty() || depth >= MAX_TREE_DEPTH {
            break;
        }
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((*key, value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{marked_pdf, page_markers};

    fn source(tags: &[&str]) -> PdfDocument {
        PdfDocument::from_bytes("fixture", &marked_pdf(tags)).unwrap()
    }

    #[test]
    fn test_empty_builder_serializes() {
        let bytes = DocumentBuilder::new().finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }

    #[test]
    fn test_appends_in_given_order_across_documents() {
        let a = source(&["a1", "a2", "a3"]);
        let b = source(&["b1", "b2"]);

        let mut builder = DocumentBuilder::new();
        assert_eq!(builder.append_pages(&a, &[0, 2]), 2);
        assert_eq!(builder.append_all(&b), 2);
        assert_eq!(builder.append_pages(&a, &[1]), 1);
        assert_eq!(builder.page_count(), 5);

        let bytes = builder.finish().unwrap();
        let markers: Vec<_> = page_markers(&bytes).into_iter().flatten().collect();
        assert_eq!(markers, vec!["a1", "a3", "b1", "b2", "a2"]);
    }

    #[test]
    fn test_out_of_range_indices_ignored() {
        let a = source(&["a1"]);
        let mut builder = DocumentBuilder::new();
        assert_eq!(builder.append_pages(&a, &[0, 5]), 1);
        assert_eq!(builder.append_pages(&a, &[7]), 0);
        assert_eq!(builder.page_count(), 1);
    }

    #[test]
    fn test_inherited_attributes_are_flattened() {
        let a = source(&["a1"]);
        let mut builder = DocumentBuilder::new();
        builder.append_all(&a);
        let bytes = builder.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
    }
}
