//! PDF page concatenation
//!
//! Combines several PDF documents into one by renumbering each document's
//! objects into a shared id space, collecting every page in input order, and
//! rebuilding a single page tree and catalog around them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use lopdf::{Dictionary, Document, Object, ObjectId};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while merging documents
#[derive(Error, Debug)]
pub enum MergeError {
    /// An input file could not be parsed as a PDF
    #[error("{0} is not a valid PDF: {1}")]
    InvalidPdf(String, lopdf::Error),

    /// The inputs parsed but contained no pages at all
    #[error("No pages found in the supplied PDF files")]
    NoPages,

    /// The merged document could not be serialized
    #[error("Failed to write merged PDF: {0}")]
    Save(std::io::Error),
}

/// Load each named input file and merge them into a single PDF.
///
/// Inputs are `(declared filename, scratch path)` pairs; the declared name is
/// only used in error messages so callers see the file they uploaded, not a
/// generated scratch name. Page order follows input order.
pub fn merge_files(inputs: &[(String, PathBuf)]) -> Result<Vec<u8>, MergeError> {
    let mut documents = Vec::with_capacity(inputs.len());
    for (name, path) in inputs {
        let doc =
            Document::load(path).map_err(|e| MergeError::InvalidPdf(name.clone(), e))?;
        documents.push(doc);
    }

    let mut merged = merge_documents(documents)?;

    let mut output = Vec::new();
    merged.save_to(&mut output).map_err(MergeError::Save)?;
    Ok(output)
}

/// Merge parsed documents into one, preserving page order.
pub fn merge_documents(documents: Vec<Document>) -> Result<Document, MergeError> {
    let mut max_id: u32 = 1;
    // Pages in a Vec rather than a map: object ids within a source document
    // are not guaranteed to follow page order.
    let mut pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            if let Ok(page) = doc.get_object(page_id) {
                pages.push((page_id, page.clone()));
            }
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                // Each source document's structural nodes are replaced by the
                // rebuilt tree below; pages are re-inserted with a new parent.
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    objects.insert(object_id, object);
                }
            }
        }
    }

    if pages.is_empty() {
        return Err(MergeError::NoPages);
    }

    let mut merged = Document::with_version("1.5");
    merged.objects = objects;
    merged.max_id = max_id;

    let pages_id = merged.new_object_id();
    for (object_id, object) in &pages {
        if let Object::Dictionary(dict) = object {
            let mut page_dict = dict.clone();
            page_dict.set("Parent", Object::Reference(pages_id));
            merged
                .objects
                .insert(*object_id, Object::Dictionary(page_dict));
        }
    }

    let kids: Vec<Object> = pages
        .iter()
        .map(|(object_id, _)| Object::Reference(*object_id))
        .collect();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(pages.len() as i64)),
        ])),
    );

    let catalog_id = merged.new_object_id();
    merged.objects.insert(
        catalog_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ])),
    );
    merged.trailer.set("Root", Object::Reference(catalog_id));

    merged.renumber_objects();
    merged.compress();

    debug!(pages = pages.len(), objects = merged.objects.len(), "Merged documents");
    Ok(merged)
}
