//! PDF composition and assembly.
//!
//! Merging is a structural page-tree concatenation: pages from every part are
//! collected in part order, reparented under a fresh page tree, and written
//! as one document. Never a visual overlay.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document, Object, ObjectId};

use crate::error::{Error, Result};

/// Concatenate the pages of several PDF documents, in order.
///
/// Parts contribute their pages in their own internal page order; parts are
/// appended in slice order. An empty slice produces a valid zero-page
/// document, so a run over zero records still yields a well-formed output.
pub fn merge_documents(parts: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut merged = Document::with_version("1.5");
    let mut next_id: u32 = 1;

    // Page ids in final output order; their objects are patched with the new
    // parent before insertion.
    let mut ordered_page_ids: Vec<ObjectId> = Vec::new();
    let mut page_objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for (part_index, bytes) in parts.iter().enumerate() {
        let mut doc = Document::load_mem(bytes)
            .map_err(|e| Error::Merge(format!("failed to load part {part_index}: {e}")))?;

        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            let page = doc.get_object(page_id).map_err(|e| {
                Error::Merge(format!("part {part_index} has a broken page object: {e}"))
            })?;
            ordered_page_ids.push(page_id);
            page_objects.insert(page_id, page.clone());
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                // The old document structure is rebuilt from scratch
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    merged.objects.insert(object_id, object);
                }
            }
        }
    }

    // Fresh ids must come after every part's renumbered range, or the new
    // page tree would overwrite part objects.
    merged.max_id = next_id.saturating_sub(1);
    let pages_id = merged.new_object_id();

    for page_id in &ordered_page_ids {
        if let Some(Object::Dictionary(dict)) = page_objects.get(page_id) {
            let mut dict = dict.clone();
            dict.set("Parent", Object::Reference(pages_id));
            merged.objects.insert(*page_id, Object::Dictionary(dict));
        }
    }

    let kids: Vec<Object> = ordered_page_ids
        .iter()
        .map(|&id| Object::Reference(id))
        .collect();

    let page_count = i64::try_from(kids.len()).unwrap_or(0);
    let pages_dict = lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(page_count)),
    ]);
    merged.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = merged.add_object(lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    #[allow(clippy::cast_possible_truncation)]
    let new_max_id = merged.objects.len() as u32;
    merged.max_id = new_max_id;
    merged.renumber_objects();
    merged.compress();

    let mut output = Vec::new();
    merged
        .save_to(&mut output)
        .map_err(|e| Error::PdfSave(format!("failed to save merged PDF: {e}")))?;

    Ok(output)
}

/// Merge PDF files into one output file, in slice order.
pub fn merge_files(parts: &[impl AsRef<Path>], output: impl AsRef<Path>) -> Result<()> {
    let mut loaded = Vec::with_capacity(parts.len());
    for part in parts {
        loaded.push(std::fs::read(part.as_ref()).map_err(|e| {
            Error::Merge(format!("failed to read {}: {}", part.as_ref().display(), e))
        })?);
    }
    let merged = merge_documents(&loaded)?;
    std::fs::write(output.as_ref(), merged).map_err(|e| {
        Error::PdfSave(format!(
            "failed to write {}: {}",
            output.as_ref().display(),
            e
        ))
    })
}

/// Number of pages in a PDF byte buffer.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    let doc =
        Document::load_mem(bytes).map_err(|e| Error::Merge(format!("failed to load PDF: {e}")))?;
    Ok(doc.get_pages().len())
}

/// Recover the numeric page index from an artifact name like `page_12.pdf`.
///
/// The assembler sorts on this index, not on the path string, so page 10
/// lands after page 9 instead of after page 1.
pub fn page_index_from_name(path: &Path) -> Option<usize> {
    path.file_stem()?
        .to_str()?
        .rsplit('_')
        .next()?
        .parse()
        .ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use lopdf::Stream;
    use lopdf::content::{Content, Operation};
    use std::path::PathBuf;

    /// Build a minimal one-page PDF whose content stream draws `page_text`.
    pub(crate) fn create_test_pdf(page_text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let page_tree_id = doc.new_object_id();

        let font_id = doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));

        let resources_id = doc.add_object(lopdf::Dictionary::from_iter([(
            "Font",
            Object::Dictionary(lopdf::Dictionary::from_iter([(
                "F1",
                Object::Reference(font_id),
            )])),
        )]));

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(page_text)]),
                Operation::new("ET", vec![]),
            ],
        };

        let content_bytes = content.encode().unwrap_or_default();
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content_bytes));

        let page_id = doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(page_tree_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]));

        let page_tree = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ]);
        doc.objects.insert(page_tree_id, Object::Dictionary(page_tree));

        let catalog_id = doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(page_tree_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        doc.save_to(&mut output).unwrap_or_default();
        output
    }

    #[test]
    fn merge_of_two_parts_concatenates_pages() {
        let front = create_test_pdf("front");
        let back = create_test_pdf("back");

        let merged = merge_documents(&[front, back]).unwrap();
        assert_eq!(page_count(&merged).unwrap(), 2);
    }

    #[test]
    fn merge_of_many_parts_keeps_order() {
        let parts: Vec<Vec<u8>> = (0..5).map(|i| create_test_pdf(&format!("p{i}"))).collect();
        let merged = merge_documents(&parts).unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        assert_eq!(doc.get_pages().len(), 5);
        for (page_no, _) in doc.get_pages() {
            let text = doc.extract_text(&[page_no]).unwrap();
            assert!(
                text.contains(&format!("p{}", page_no - 1)),
                "page {page_no} should carry its own text, got {text:?}"
            );
        }
    }

    #[test]
    fn merged_page_tree_does_not_clobber_part_objects() {
        // The rebuilt Pages/Catalog get ids above every part's range; the
        // first part's fonts and content streams must survive intact.
        let parts: Vec<Vec<u8>> = (0..3).map(|i| create_test_pdf(&format!("p{i}"))).collect();
        let merged = merge_documents(&parts).unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("p0"), "first page lost its content: {text:?}");
    }

    #[test]
    fn merge_of_empty_input_is_a_valid_contentless_pdf() {
        let merged = merge_documents(&[]).unwrap();
        assert!(merged.starts_with(b"%PDF"));
        assert_eq!(page_count(&merged).unwrap(), 0);
    }

    #[test]
    fn merge_of_single_part_round_trips() {
        let single = create_test_pdf("only");
        let merged = merge_documents(std::slice::from_ref(&single)).unwrap();
        assert_eq!(page_count(&merged).unwrap(), 1);
    }

    #[test]
    fn corrupt_part_is_a_merge_error() {
        let good = create_test_pdf("ok");
        let result = merge_documents(&[good, b"not a pdf".to_vec()]);
        assert!(matches!(result, Err(Error::Merge(_))));
    }

    #[test]
    fn page_index_recovery_is_numeric() {
        assert_eq!(
            page_index_from_name(&PathBuf::from("/tmp/x/page_0.pdf")),
            Some(0)
        );
        assert_eq!(
            page_index_from_name(&PathBuf::from("page_12.pdf")),
            Some(12)
        );
        assert_eq!(page_index_from_name(&PathBuf::from("final.pdf")), None);
    }

    #[test]
    fn numeric_index_sorts_ten_after_nine() {
        let mut names: Vec<PathBuf> = vec![
            PathBuf::from("page_10.pdf"),
            PathBuf::from("page_1.pdf"),
            PathBuf::from("page_9.pdf"),
        ];
        names.sort_by_key(|p| page_index_from_name(p).unwrap_or(usize::MAX));
        assert_eq!(
            names,
            vec![
                PathBuf::from("page_1.pdf"),
                PathBuf::from("page_9.pdf"),
                PathBuf::from("page_10.pdf"),
            ]
        );
    }
}
