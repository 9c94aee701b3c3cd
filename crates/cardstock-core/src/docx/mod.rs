//! DOCX template handling.
//!
//! A DOCX file is a ZIP archive whose visible text lives in
//! `word/document.xml`. The template is opened read-only and validated up
//! front; rendering produces a fresh archive with every entry copied raw and
//! only `word/document.xml` rewritten, so the original is never mutated and
//! repeated renders of the same inputs are byte-for-byte identical.

mod substitute;

pub use substitute::substitute_placeholders;

use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{Error, Result};

const DOCUMENT_XML: &str = "word/document.xml";

/// A parsed, validated DOCX template.
pub struct DocxTemplate {
    /// Raw archive bytes, shared by every per-page clone
    bytes: Vec<u8>,
    /// Extracted `word/document.xml`, validated at load time
    document_xml: Vec<u8>,
}

impl DocxTemplate {
    /// Open a template from raw DOCX bytes.
    ///
    /// Fails with [`Error::TemplateInvalid`] if the archive or its
    /// `word/document.xml` cannot be parsed, before any substitution begins.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(&bytes))
            .map_err(|e| Error::TemplateInvalid(format!("not a DOCX archive: {e}")))?;

        let mut document_xml = Vec::new();
        archive
            .by_name(DOCUMENT_XML)
            .map_err(|e| Error::TemplateInvalid(format!("missing {DOCUMENT_XML}: {e}")))?
            .read_to_end(&mut document_xml)
            .map_err(|e| Error::TemplateInvalid(format!("unreadable {DOCUMENT_XML}: {e}")))?;

        validate_document_xml(&document_xml)?;

        drop(archive);
        Ok(Self {
            bytes,
            document_xml,
        })
    }

    /// Open a template from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::TemplateInvalid(format!(
                "failed to read template {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_bytes(bytes)
    }

    /// The validated `word/document.xml` of this template.
    pub fn document_xml(&self) -> &[u8] {
        &self.document_xml
    }

    /// Render a filled clone of this template.
    ///
    /// Every archive entry is copied raw; only `word/document.xml` is
    /// replaced with the substituted body.
    pub fn render(&self, placeholders: &[(String, String)]) -> Result<Vec<u8>> {
        let filled_xml = substitute_placeholders(&self.document_xml, placeholders)?;

        let mut archive = ZipArchive::new(Cursor::new(&self.bytes))
            .map_err(|e| Error::TemplateInvalid(format!("not a DOCX archive: {e}")))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for index in 0..archive.len() {
            let entry = archive
                .by_index(index)
                .map_err(|e| Error::TemplateSave(format!("failed to read archive entry: {e}")))?;

            if entry.name() == DOCUMENT_XML {
                writer
                    .start_file(DOCUMENT_XML, SimpleFileOptions::default())
                    .map_err(|e| Error::TemplateSave(format!("failed to start entry: {e}")))?;
                writer.write_all(&filled_xml)?;
            } else {
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| Error::TemplateSave(format!("failed to copy entry: {e}")))?;
            }
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::TemplateSave(format!("failed to finish archive: {e}")))?;
        Ok(cursor.into_inner())
    }

    /// Render a filled clone directly to a file.
    pub fn render_to_file(
        &self,
        placeholders: &[(String, String)],
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let bytes = self.render(placeholders)?;
        std::fs::write(path.as_ref(), bytes).map_err(|e| {
            Error::TemplateSave(format!(
                "failed to write {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }
}

impl std::fmt::Debug for DocxTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocxTemplate")
            .field("bytes_len", &self.bytes.len())
            .field("document_xml_len", &self.document_xml.len())
            .finish()
    }
}

/// Walk the whole body once so corrupt XML fails at load time.
fn validate_document_xml(document_xml: &[u8]) -> Result<()> {
    let mut reader = quick_xml::Reader::from_reader(document_xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                return Err(Error::TemplateInvalid(format!(
                    "malformed {DOCUMENT_XML}: {e}"
                )));
            }
        }
        buf.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    const CONTENT_TYPES: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
        <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
        <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
        <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
        <Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
        </Types>";

    const RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
        <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
        <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
        </Relationships>";

    /// Zip a minimal DOCX around the given document body XML.
    pub(crate) fn build_docx(body_inner: &str) -> Vec<u8> {
        let document = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body_inner}</w:body></w:document>"
        );

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", RELS),
            ("word/document.xml", document.as_str()),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn extract_document_xml(docx: &[u8]) -> String {
        let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_XML)
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn loads_valid_docx() {
        let docx = build_docx("<w:p><w:r><w:t>hello</w:t></w:r></w:p>");
        let template = DocxTemplate::from_bytes(docx).unwrap();
        assert!(!template.document_xml().is_empty());
    }

    #[test]
    fn rejects_non_zip_bytes() {
        let result = DocxTemplate::from_bytes(b"definitely not a zip".to_vec());
        assert!(matches!(result, Err(Error::TemplateInvalid(_))));
    }

    #[test]
    fn rejects_zip_without_document_xml() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("other.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"nope").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let result = DocxTemplate::from_bytes(bytes);
        assert!(matches!(result, Err(Error::TemplateInvalid(_))));
    }

    #[test]
    fn rejects_corrupt_document_xml() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCUMENT_XML, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<w:document><w:body></mismatched>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let result = DocxTemplate::from_bytes(bytes);
        assert!(matches!(result, Err(Error::TemplateInvalid(_))));
    }

    #[test]
    fn render_substitutes_and_preserves_other_entries() {
        let docx = build_docx("<w:p><w:r><w:t>NAME_1</w:t></w:r></w:p>");
        let template = DocxTemplate::from_bytes(docx).unwrap();

        let filled = template
            .render(&[("NAME_1".to_string(), "Ann".to_string())])
            .unwrap();

        let xml = extract_document_xml(&filled);
        assert!(xml.contains("Ann"));
        assert!(!xml.contains("NAME_1"));

        let mut archive = ZipArchive::new(Cursor::new(&filled)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"[Content_Types].xml".to_string()));
        assert!(names.contains(&"_rels/.rels".to_string()));
    }

    #[test]
    fn render_does_not_mutate_the_template() {
        let docx = build_docx("<w:p><w:r><w:t>NAME_1</w:t></w:r></w:p>");
        let template = DocxTemplate::from_bytes(docx).unwrap();

        let _ = template
            .render(&[("NAME_1".to_string(), "Ann".to_string())])
            .unwrap();

        let xml = String::from_utf8(template.document_xml().to_vec()).unwrap();
        assert!(xml.contains("NAME_1"));
    }

    #[test]
    fn repeated_renders_are_byte_identical() {
        let docx = build_docx("<w:p><w:r><w:t>NAME_1</w:t></w:r></w:p>");
        let template = DocxTemplate::from_bytes(docx).unwrap();
        let pairs = vec![("NAME_1".to_string(), "Ann".to_string())];

        let first = template.render(&pairs).unwrap();
        let second = template.render(&pairs).unwrap();
        assert_eq!(first, second);
    }
}
