//! In-memory DOCX packages for tests.

use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const NAMESPACE: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const LETTER_SECTION: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1800" w:bottom="1440" w:left="1800" w:header="720" w:footer="720" w:gutter="0"/><w:cols w:space="720"/></w:sectPr>"#;

pub const DEFAULT_STYLES: &str = r#"<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:asciiTheme="minorHAnsi" w:hAnsiTheme="minorHAnsi" w:eastAsiaTheme="minorEastAsia" w:cstheme="minorBidi"/><w:sz w:val="24"/><w:szCs w:val="24"/></w:rPr></w:rPrDefault><w:pPrDefault/></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style>"#;

pub struct DocxBuilder {
    body: String,
    section: Option<String>,
    styles: Option<String>,
    with_document: bool,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self {
            body: String::new(),
            section: Some(LETTER_SECTION.to_string()),
            styles: Some(DEFAULT_STYLES.to_string()),
            with_document: true,
        }
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape(text)
        ));
        self
    }

    /// A paragraph whose runs carry explicit font, size and spacing.
    pub fn styled_paragraph(mut self, runs: &[&str], font: &str, size_pt: u32) -> Self {
        self.body.push_str(r#"<w:p><w:pPr><w:spacing w:before="480" w:after="360" w:line="480" w:lineRule="auto"/></w:pPr>"#);
        for text in runs {
            self.body.push_str(&format!(
                r#"<w:r><w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}"/><w:b/><w:sz w:val="{half}"/></w:rPr><w:t xml:space="preserve">{text}</w:t></w:r>"#,
                font = font,
                half = size_pt * 2,
                text = escape(*text)
            ));
        }
        self.body.push_str("</w:p>");
        self
    }

    pub fn heading(mut self, level: u8, text: &str) -> Self {
        self.body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading{level}"/></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#,
            level = level,
            text = escape(text)
        ));
        self
    }

    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.body.push_str("<w:tbl><w:tblPr/>");
        for row in rows {
            self.body.push_str("<w:tr>");
            for cell in *row {
                self.body.push_str(&format!(
                    r#"<w:tc><w:p><w:r><w:rPr><w:rFonts w:ascii="Courier New"/><w:sz w:val="18"/></w:rPr><w:t>{}</w:t></w:r></w:p></w:tc>"#,
                    escape(*cell)
                ));
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        self
    }

    pub fn raw(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    pub fn without_section(mut self) -> Self {
        self.section = None;
        self
    }

    pub fn without_styles(mut self) -> Self {
        self.styles = None;
        self
    }

    pub fn without_document(mut self) -> Self {
        self.with_document = false;
        self
    }

    pub fn document_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{ns}"><w:body>{body}{section}</w:body></w:document>"#,
            ns = NAMESPACE,
            body = self.body,
            section = self.section.as_deref().unwrap_or("")
        )
    }

    pub fn build(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let mut add = |name: &str, content: &str| {
            writer.start_file(name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        };

        add("[Content_Types].xml", CONTENT_TYPES);
        add("_rels/.rels", ROOT_RELS);
        if self.with_document {
            add("word/document.xml", &self.document_xml());
        }
        if let Some(styles) = &self.styles {
            add(
                "word/styles.xml",
                &format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{}">{}</w:styles>"#,
                    NAMESPACE, styles
                ),
            );
        }

        writer.finish().unwrap().into_inner()
    }
}
