use serde::Serialize;

/// Margins in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    pub const fn uniform(cm: f64) -> Self {
        Self {
            top: cm,
            bottom: cm,
            left: cm,
            right: cm,
        }
    }
}

/// Page geometry, font and spacing applied to a document.
///
/// Lengths are in the units a typesetter would state them in: page size and
/// margins in centimetres, font size and paragraph spacing in points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatProfile {
    pub name: &'static str,
    pub page_width_cm: f64,
    pub page_height_cm: f64,
    pub margins: Margins,
    pub font_family: &'static str,
    pub font_size_pt: f64,
    pub line_spacing: f64,
    pub spacing_before_pt: f64,
    pub spacing_after_pt: f64,
}

pub const DEFAULT_PROFILE: &str = "standard_clean";

/// A4, 2.54cm margins, Calibri 11, 1.15 line spacing.
pub static STANDARD_CLEAN: FormatProfile = FormatProfile {
    name: "standard_clean",
    page_width_cm: 21.0,
    page_height_cm: 29.7,
    margins: Margins::uniform(2.54),
    font_family: "Calibri",
    font_size_pt: 11.0,
    line_spacing: 1.15,
    spacing_before_pt: 0.0,
    spacing_after_pt: 6.0,
};

/// A4, 2.0cm margins, Calibri 11, single spacing.
pub static COMPACT_CLEAN: FormatProfile = FormatProfile {
    name: "compact_clean",
    page_width_cm: 21.0,
    page_height_cm: 29.7,
    margins: Margins::uniform(2.0),
    font_family: "Calibri",
    font_size_pt: 11.0,
    line_spacing: 1.0,
    spacing_before_pt: 0.0,
    spacing_after_pt: 4.0,
};

/// A4, 2.5cm margins, Arial 14, 1.5 line spacing.
pub static LARGE_READABLE: FormatProfile = FormatProfile {
    name: "large_readable",
    page_width_cm: 21.0,
    page_height_cm: 29.7,
    margins: Margins::uniform(2.5),
    font_family: "Arial",
    font_size_pt: 14.0,
    line_spacing: 1.5,
    spacing_before_pt: 0.0,
    spacing_after_pt: 10.0,
};

static PROFILES: [&FormatProfile; 3] = [&STANDARD_CLEAN, &COMPACT_CLEAN, &LARGE_READABLE];

/// Every registered profile, default first.
pub fn all() -> &'static [&'static FormatProfile] {
    &PROFILES
}

pub fn lookup(name: &str) -> Option<&'static FormatProfile> {
    PROFILES.iter().copied().find(|p| p.name == name)
}

pub fn is_registered(name: &str) -> bool {
    lookup(name).is_some()
}

/// Resolves a profile by name, falling back to the default profile.
pub fn resolve(name: &str) -> &'static FormatProfile {
    lookup(name).unwrap_or(&STANDARD_CLEAN)
}

pub fn names() -> Vec<&'static str> {
    PROFILES.iter().map(|p| p.name).collect()
}
