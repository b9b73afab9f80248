//! Word (.docx) lore documents
//!
//! Only paragraph text is read: every `w:p` in `word/document.xml` becomes
//! one line, built from the `w:t` runs it contains.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use super::narrative::StoryError;

/// Archive member holding the document body
const DOCUMENT_XML: &str = "word/document.xml";

/// Paragraph text of a .docx file, joined with newlines
pub fn docx_text(path: &Path) -> Result<String, StoryError> {
    debug!(?path, "docx_text: called");
    let document = |reason: String| StoryError::Document {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|source| StoryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| document(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_XML)
        .map_err(|e| document(format!("{}: {}", DOCUMENT_XML, e)))?
        .read_to_string(&mut xml)
        .map_err(|e| document(format!("{}: {}", DOCUMENT_XML, e)))?;

    let paragraphs = paragraphs(&xml).map_err(document)?;
    debug!(count = paragraphs.len(), "docx_text: read paragraphs");
    Ok(paragraphs.join("\n"))
}

/// Text of each `w:p` element, in document order
pub fn paragraphs(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = false;
                    paragraphs.push(std::mem::take(&mut current));
                }
                b"t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if in_paragraph => current.push('\t'),
                b"br" if in_paragraph => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                current.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    /// Write a minimal .docx whose body holds `body` (the inside of `w:body`)
    pub(crate) fn write_docx(path: &Path, body: &str) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
            .unwrap();
        zip.start_file(DOCUMENT_XML, options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
        .unwrap();
        zip.finish().unwrap();
    }

    /// One `w:p` per line, each line a single run
    pub(crate) fn body(lines: &[&str]) -> String {
        lines
            .iter()
            .map(|line| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", line))
            .collect()
    }

    #[test]
    fn test_paragraphs_join_runs() {
        let xml = r#"<w:document xmlns:w="x"><w:body>
            <w:p><w:r><w:t>Quest </w:t></w:r><w:r><w:t>Description: go</w:t></w:r></w:p>
            <w:p/>
            <w:p><w:r><w:t>Salt &amp; iron</w:t><w:tab/><w:t>end</w:t></w:r></w:p>
        </w:body></w:document>"#;

        assert_eq!(
            paragraphs(xml).unwrap(),
            vec!["Quest Description: go".to_string(), String::new(), "Salt & iron\tend".to_string()]
        );
    }

    #[test]
    fn test_paragraphs_ignore_non_text_elements() {
        let xml = r#"<w:document xmlns:w="x"><w:body><w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Bold</w:t></w:r></w:p></w:body></w:document>"#;
        assert_eq!(paragraphs(xml).unwrap(), vec!["Bold".to_string()]);
    }

    #[test]
    fn test_docx_text() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("lore.docx");
        write_docx(&path, &body(&["Quest Description: Find the lantern.", "Branching Factor: 1-2"]));

        assert_eq!(
            docx_text(&path).unwrap(),
            "Quest Description: Find the lantern.\nBranching Factor: 1-2"
        );
    }

    #[test]
    fn test_docx_text_not_an_archive() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("lore.docx");
        std::fs::write(&path, "plain text pretending to be Word").unwrap();
        assert!(matches!(docx_text(&path), Err(StoryError::Document { .. })));
    }

    #[test]
    fn test_docx_text_missing_body() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("lore.docx");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("other.xml", zip::write::SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<x/>").unwrap();
        zip.finish().unwrap();

        let err = docx_text(&path).unwrap_err();
        assert!(err.to_string().contains(DOCUMENT_XML));
    }
}
