//! Plain-text extraction from the main document part.
//!
//! Only paragraphs that are direct children of `w:body` contribute; each is
//! trimmed, empty ones are dropped and the rest are joined with newlines.

use crate::error::FormatError;
use crate::formatting::docx::{DocxPackage, DOCUMENT_PART};
use crate::formatting::xml::{XmlDocument, XmlElement};

pub fn extract_docx_text(bytes: &[u8]) -> Result<String, FormatError> {
    let package = DocxPackage::open(bytes)?;
    let document = package
        .xml_part(DOCUMENT_PART)?
        .ok_or_else(|| FormatError::MissingPart(DOCUMENT_PART.to_string()))?;
    Ok(document_text(&document))
}

pub fn document_text(document: &XmlDocument) -> String {
    let Some(body) = document.root.child("w:body") else {
        return String::new();
    };
    body.elements()
        .filter(|e| e.is("w:p"))
        .map(paragraph_text)
        .filter_map(|text| {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut out = String::new();
    collect(paragraph, &mut out);
    out
}

fn collect(element: &XmlElement, out: &mut String) {
    for child in element.elements() {
        match child.name.as_str() {
            "w:r" => run_text(child, out),
            // Text boxes hold their own paragraphs; deletions are not visible text.
            "w:p" | "w:del" | "w:moveFrom" => {}
            _ => collect(child, out),
        }
    }
}

fn run_text(run: &XmlElement, out: &mut String) {
    for child in run.elements() {
        match child.name.as_str() {
            "w:t" => out.push_str(&child.text()),
            "w:tab" | "w:ptab" => out.push('\t'),
            "w:br" | "w:cr" => out.push('\n'),
            "w:noBreakHyphen" => out.push('-'),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatting::fixtures::DocxBuilder;

    #[test]
    fn test_joins_non_empty_paragraphs() {
        let bytes = DocxBuilder::new()
            .paragraph("  First paragraph.  ")
            .paragraph("")
            .paragraph("Second paragraph.")
            .build();
        assert_eq!(
            extract_docx_text(&bytes).unwrap(),
            "First paragraph.\nSecond paragraph."
        );
    }

    #[test]
    fn test_concatenates_runs_and_specials() {
        let xml = r#"<w:document xmlns:w="w"><w:body><w:p><w:r><w:t>A</w:t><w:tab/><w:t>B</w:t></w:r><w:hyperlink><w:r><w:t xml:space="preserve"> link</w:t></w:r></w:hyperlink><w:r><w:br/><w:t>C</w:t></w:r><w:del><w:r><w:delText>gone</w:delText></w:r></w:del></w:p></w:body></w:document>"#;
        let document = XmlDocument::parse("word/document.xml", xml).unwrap();
        assert_eq!(document_text(&document), "A\tB link\nC");
    }

    #[test]
    fn test_table_text_is_not_body_text() {
        let bytes = DocxBuilder::new()
            .paragraph("Before")
            .table(&[&["Cell 1", "Cell 2"]])
            .paragraph("After")
            .build();
        assert_eq!(extract_docx_text(&bytes).unwrap(), "Before\nAfter");
    }

    #[test]
    fn test_empty_document() {
        let bytes = DocxBuilder::new().build();
        assert_eq!(extract_docx_text(&bytes).unwrap(), "");
    }

    #[test]
    fn test_entities_are_decoded() {
        let bytes = DocxBuilder::new().paragraph("Tom & Jerry <3").build();
        assert_eq!(extract_docx_text(&bytes).unwrap(), "Tom & Jerry <3");
    }
}
