//! Format-only rewrite of a DOCX document.
//!
//! The engine edits formatting metadata in `word/styles.xml` and
//! `word/document.xml` and never touches text nodes, so the plain text of the
//! output equals the plain text of the input. Every other package part is
//! copied through unchanged.

use tracing::{debug, error, warn};

use crate::error::FormatError;
use crate::formatting::docx::{DocxPackage, DOCUMENT_PART, STYLES_PART};
use crate::formatting::extract::{document_text, extract_docx_text};
use crate::formatting::profiles::FormatProfile;
use crate::formatting::units::{cm_to_twips, line_multiple, pt_to_half_points, pt_to_twips};
use crate::formatting::xml::{XmlDocument, XmlElement, XmlNode};

// Child sequences from the WordprocessingML schema. Word rejects parts whose
// property children are out of order, so inserted elements follow these.
const STYLES_ORDER: &[&str] = &["w:docDefaults", "w:latentStyles", "w:style"];
const DOC_DEFAULTS_ORDER: &[&str] = &["w:rPrDefault", "w:pPrDefault"];
const STYLE_ORDER: &[&str] = &[
    "w:name", "w:aliases", "w:basedOn", "w:next", "w:link", "w:autoRedefine", "w:hidden",
    "w:uiPriority", "w:semiHidden", "w:unhideWhenUsed", "w:qFormat", "w:locked", "w:personal",
    "w:personalCompose", "w:personalReply", "w:rsid", "w:pPr", "w:rPr", "w:tblPr", "w:trPr",
    "w:tcPr", "w:tblStylePr",
];
const PARAGRAPH_ORDER: &[&str] = &["w:pPr"];
const RUN_ORDER: &[&str] = &["w:rPr"];
const PPR_ORDER: &[&str] = &[
    "w:pStyle", "w:keepNext", "w:keepLines", "w:pageBreakBefore", "w:framePr", "w:widowControl",
    "w:numPr", "w:suppressLineNumbers", "w:pBdr", "w:shd", "w:tabs", "w:suppressAutoHyphens",
    "w:kinsoku", "w:wordWrap", "w:overflowPunct", "w:topLinePunct", "w:autoSpaceDE",
    "w:autoSpaceDN", "w:bidi", "w:adjustRightInd", "w:snapToGrid", "w:spacing", "w:ind",
    "w:contextualSpacing", "w:mirrorIndents", "w:suppressOverlap", "w:jc", "w:textDirection",
    "w:textAlignment", "w:textboxTightWrap", "w:outlineLvl", "w:divId", "w:cnfStyle", "w:rPr",
    "w:sectPr", "w:pPrChange",
];
const RPR_ORDER: &[&str] = &[
    "w:rStyle", "w:rFonts", "w:b", "w:bCs", "w:i", "w:iCs", "w:caps", "w:smallCaps", "w:strike",
    "w:dstrike", "w:outline", "w:shadow", "w:emboss", "w:imprint", "w:noProof", "w:snapToGrid",
    "w:vanish", "w:webHidden", "w:color", "w:spacing", "w:w", "w:kern", "w:position", "w:sz",
    "w:szCs", "w:highlight", "w:u", "w:effect", "w:bdr", "w:shd", "w:fitText", "w:vertAlign",
    "w:rtl", "w:cs", "w:em", "w:lang", "w:eastAsianLayout", "w:specVanish", "w:oMath",
];
const SECT_ORDER: &[&str] = &[
    "w:headerReference", "w:footerReference", "w:footnotePr", "w:endnotePr", "w:type", "w:pgSz",
    "w:pgMar", "w:paperSrc", "w:pgBorders", "w:lnNumType", "w:pgNumType", "w:cols",
    "w:formProt", "w:vAlign", "w:noEndnote", "w:titlePg", "w:textDirection", "w:bidi",
    "w:rtlGutter", "w:docGrid", "w:printerSettings", "w:sectPrChange",
];

const FONT_SLOTS: [&str; 4] = ["w:ascii", "w:hAnsi", "w:eastAsia", "w:cs"];
const THEME_FONT_SLOTS: [&str; 4] = ["w:asciiTheme", "w:hAnsiTheme", "w:eastAsiaTheme", "w:cstheme"];
// These take precedence over explicit before/after values when present.
const SPACING_OVERRIDES: [&str; 4] = [
    "w:beforeLines",
    "w:afterLines",
    "w:beforeAutospacing",
    "w:afterAutospacing",
];

/// Header/footer distance and gutter for page margins created from scratch.
const DEFAULT_HEADER_TWIPS: &str = "720";
const DEFAULT_GUTTER_TWIPS: &str = "0";

/// Result of a format-only rewrite.
#[derive(Debug, Clone)]
pub struct FormattedDocument {
    pub bytes: Vec<u8>,
    /// Plain text of the source document.
    pub text: String,
    /// Whether the output extracts to exactly `text`.
    pub text_preserved: bool,
    pub report: RewriteReport,
}

/// What each pass touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteReport {
    pub default_style_updated: bool,
    pub sections: usize,
    pub body_paragraphs: usize,
    pub table_paragraphs: usize,
    pub runs: usize,
    pub headings: usize,
}

/// A profile expressed in the document's native units.
struct NativeFormat<'a> {
    font: &'a str,
    half_points: String,
    before: String,
    after: String,
    line: String,
    page_width: String,
    page_height: String,
    margin_top: String,
    margin_bottom: String,
    margin_left: String,
    margin_right: String,
}

impl<'a> NativeFormat<'a> {
    fn new(profile: &'a FormatProfile) -> Self {
        Self {
            font: profile.font_family,
            half_points: pt_to_half_points(profile.font_size_pt).to_string(),
            before: pt_to_twips(profile.spacing_before_pt).to_string(),
            after: pt_to_twips(profile.spacing_after_pt).to_string(),
            line: line_multiple(profile.line_spacing).to_string(),
            page_width: cm_to_twips(profile.page_width_cm).to_string(),
            page_height: cm_to_twips(profile.page_height_cm).to_string(),
            margin_top: cm_to_twips(profile.margins.top).to_string(),
            margin_bottom: cm_to_twips(profile.margins.bottom).to_string(),
            margin_left: cm_to_twips(profile.margins.left).to_string(),
            margin_right: cm_to_twips(profile.margins.right).to_string(),
        }
    }
}

/// Applies `profile` to a DOCX document, returning the rewritten package and
/// the plain text of the source.
pub fn apply(source: &[u8], profile: &FormatProfile) -> Result<FormattedDocument, FormatError> {
    let mut package = DocxPackage::open(source)?;
    let mut document = package
        .xml_part(DOCUMENT_PART)?
        .ok_or_else(|| FormatError::MissingPart(DOCUMENT_PART.to_string()))?;

    let text = document_text(&document);
    let native = NativeFormat::new(profile);
    let mut report = RewriteReport::default();

    match package.xml_part(STYLES_PART)? {
        Some(mut styles) => {
            report.default_style_updated = rewrite_default_style(&mut styles, &native);
            package.set_xml_part(STYLES_PART, &styles);
        }
        None => warn!("Document has no styles part, skipping default style rewrite"),
    }

    {
        let body = document_body(&mut document)?;
        report.sections = rewrite_sections(body, &native);

        let (paragraphs, runs) = override_body_paragraphs(body, &native);
        report.body_paragraphs = paragraphs;
        report.runs += runs;

        let (paragraphs, runs) = override_tables(body, &native);
        report.table_paragraphs = paragraphs;
        report.runs += runs;

        report.headings = preserve_headings(body);
    }

    package.set_xml_part(DOCUMENT_PART, &document);
    let bytes = package.to_bytes()?;

    let text_after = extract_docx_text(&bytes)?;
    let text_preserved = text_after == text;
    if !text_preserved {
        error!(
            profile = profile.name,
            before_chars = text.chars().count(),
            after_chars = text_after.chars().count(),
            "Text content changed during format-only processing"
        );
    }

    debug!(profile = profile.name, ?report, "Format-only rewrite finished");

    Ok(FormattedDocument {
        bytes,
        text,
        text_preserved,
        report,
    })
}

fn document_body(document: &mut XmlDocument) -> Result<&mut XmlElement, FormatError> {
    document
        .root
        .child_mut("w:body")
        .ok_or_else(|| FormatError::Xml {
            part: DOCUMENT_PART.to_string(),
            message: "document has no w:body element".to_string(),
        })
}

/// Pass 1: document defaults and the default paragraph style.
fn rewrite_default_style(styles: &mut XmlDocument, native: &NativeFormat<'_>) -> bool {
    let defaults = styles.root.ensure_child("w:docDefaults", STYLES_ORDER);
    let run_defaults = defaults
        .ensure_child("w:rPrDefault", DOC_DEFAULTS_ORDER)
        .ensure_child("w:rPr", &[]);
    apply_run_properties(run_defaults, native);
    let paragraph_defaults = defaults
        .ensure_child("w:pPrDefault", DOC_DEFAULTS_ORDER)
        .ensure_child("w:pPr", &[]);
    apply_spacing(paragraph_defaults, native);

    let Some(style) = default_paragraph_style(&mut styles.root) else {
        warn!("No default paragraph style found in styles part");
        return false;
    };
    apply_run_properties(style.ensure_child("w:rPr", STYLE_ORDER), native);
    apply_spacing(style.ensure_child("w:pPr", STYLE_ORDER), native);
    true
}

fn default_paragraph_style(styles: &mut XmlElement) -> Option<&mut XmlElement> {
    let is_paragraph_style = |e: &XmlElement| {
        e.is("w:style") && e.attr("w:type").as_deref() == Some("paragraph")
    };
    let is_default = |e: &XmlElement| {
        matches!(e.attr("w:default").as_deref(), Some("1" | "true" | "on"))
    };

    let index = styles
        .children
        .iter()
        .position(|n| matches!(n, XmlNode::Element(e) if is_paragraph_style(e) && is_default(e)))
        .or_else(|| {
            styles.children.iter().position(|n| {
                matches!(n, XmlNode::Element(e)
                    if is_paragraph_style(e) && e.attr("w:styleId").as_deref() == Some("Normal"))
            })
        })?;

    match &mut styles.children[index] {
        XmlNode::Element(style) => Some(style),
        _ => None,
    }
}

/// Pass 2: page size and margins of every section.
fn rewrite_sections(body: &mut XmlElement, native: &NativeFormat<'_>) -> usize {
    if !body.has_child("w:sectPr") {
        body.children
            .push(XmlNode::Element(XmlElement::new("w:sectPr")));
    }

    let mut sections = 0;
    for child in body.elements_mut() {
        let section = if child.is("w:sectPr") {
            Some(child)
        } else if child.is("w:p") {
            child
                .child_mut("w:pPr")
                .and_then(|ppr| ppr.child_mut("w:sectPr"))
        } else {
            None
        };
        if let Some(section) = section {
            apply_page_geometry(section, native);
            sections += 1;
        }
    }
    sections
}

fn apply_page_geometry(section: &mut XmlElement, native: &NativeFormat<'_>) {
    let size = section.ensure_child("w:pgSz", SECT_ORDER);
    size.set_attr("w:w", &native.page_width);
    size.set_attr("w:h", &native.page_height);

    let created = !section.has_child("w:pgMar");
    let margins = section.ensure_child("w:pgMar", SECT_ORDER);
    margins.set_attr("w:top", &native.margin_top);
    margins.set_attr("w:right", &native.margin_right);
    margins.set_attr("w:bottom", &native.margin_bottom);
    margins.set_attr("w:left", &native.margin_left);
    if created {
        margins.set_attr("w:header", DEFAULT_HEADER_TWIPS);
        margins.set_attr("w:footer", DEFAULT_HEADER_TWIPS);
        margins.set_attr("w:gutter", DEFAULT_GUTTER_TWIPS);
    }
}

/// Pass 3: explicit formatting on every top-level paragraph and its runs.
fn override_body_paragraphs(body: &mut XmlElement, native: &NativeFormat<'_>) -> (usize, usize) {
    let mut paragraphs = 0;
    let mut runs = 0;
    for paragraph in body.elements_mut().filter(|e| e.is("w:p")) {
        runs += override_paragraph(paragraph, native);
        paragraphs += 1;
    }
    (paragraphs, runs)
}

/// Pass 4: the same override for paragraphs inside table cells, including
/// nested tables.
fn override_tables(container: &mut XmlElement, native: &NativeFormat<'_>) -> (usize, usize) {
    let mut paragraphs = 0;
    let mut runs = 0;
    for table in container.elements_mut().filter(|e| e.is("w:tbl")) {
        for row in table.elements_mut().filter(|e| e.is("w:tr")) {
            for cell in row.elements_mut().filter(|e| e.is("w:tc")) {
                for block in cell.elements_mut() {
                    if block.is("w:p") {
                        runs += override_paragraph(block, native);
                        paragraphs += 1;
                    }
                }
                let (nested_paragraphs, nested_runs) = override_tables(cell, native);
                paragraphs += nested_paragraphs;
                runs += nested_runs;
            }
        }
    }
    (paragraphs, runs)
}

/// Pass 5: heading paragraphs keep their style reference. The pass only
/// counts them; heading-specific rules hook in here.
fn preserve_headings(body: &XmlElement) -> usize {
    let headings = body
        .elements()
        .filter(|e| e.is("w:p") && is_heading(e))
        .count();
    debug!(headings, "Heading paragraphs left with their styles");
    headings
}

pub fn is_heading(paragraph: &XmlElement) -> bool {
    let Some(properties) = paragraph.child("w:pPr") else {
        return false;
    };
    if properties.has_child("w:outlineLvl") {
        return true;
    }
    properties
        .child("w:pStyle")
        .and_then(|style| style.attr("w:val"))
        .map(|name| {
            let name = name.to_ascii_lowercase();
            name.starts_with("heading") || name == "title" || name == "subtitle"
        })
        .unwrap_or(false)
}

fn override_paragraph(paragraph: &mut XmlElement, native: &NativeFormat<'_>) -> usize {
    apply_spacing(paragraph.ensure_child("w:pPr", PARAGRAPH_ORDER), native);
    let mut runs = 0;
    for_each_run(paragraph, &mut |run| {
        apply_run_properties(run.ensure_child("w:rPr", RUN_ORDER), native);
        runs += 1;
    });
    runs
}

/// Visits the runs of a paragraph, including runs wrapped in hyperlinks,
/// smart tags, fields and revisions, without entering nested paragraphs.
fn for_each_run(element: &mut XmlElement, visit: &mut dyn FnMut(&mut XmlElement)) {
    for child in element.elements_mut() {
        match child.name.as_str() {
            "w:r" => visit(child),
            "w:p" | "w:pPr" => {}
            _ => for_each_run(child, visit),
        }
    }
}

fn apply_run_properties(rpr: &mut XmlElement, native: &NativeFormat<'_>) {
    let fonts = rpr.ensure_child("w:rFonts", RPR_ORDER);
    for slot in THEME_FONT_SLOTS {
        fonts.remove_attr(slot);
    }
    for slot in FONT_SLOTS {
        fonts.set_attr(slot, native.font);
    }
    rpr.ensure_child("w:sz", RPR_ORDER)
        .set_attr("w:val", &native.half_points);
    rpr.ensure_child("w:szCs", RPR_ORDER)
        .set_attr("w:val", &native.half_points);
}

fn apply_spacing(ppr: &mut XmlElement, native: &NativeFormat<'_>) {
    let spacing = ppr.ensure_child("w:spacing", PPR_ORDER);
    for attribute in SPACING_OVERRIDES {
        spacing.remove_attr(attribute);
    }
    spacing.set_attr("w:before", &native.before);
    spacing.set_attr("w:after", &native.after);
    spacing.set_attr("w:line", &native.line);
    spacing.set_attr("w:lineRule", "auto");
}
