pub mod docx;
pub mod engine;
pub mod extract;
pub mod profiles;
pub mod units;
pub mod xml;

#[cfg(test)]
pub(crate) mod fixtures;

pub use engine::{apply, FormattedDocument, RewriteReport};
pub use profiles::{FormatProfile, DEFAULT_PROFILE};
