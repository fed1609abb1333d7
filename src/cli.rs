use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use crate::error::CliError;
use crate::formatting::{engine, profiles, RewriteReport, DEFAULT_PROFILE};

#[derive(Parser, Debug)]
#[command(name = "docformat", version, about = "Asynchronous DOCX reformatting service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run the HTTP intake and background workers (default)
    Serve,
    /// Format a single document locally
    Format {
        /// Source .docx file
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the formatted document
        #[arg(short, long)]
        output: PathBuf,
        /// Format profile to apply
        #[arg(short, long, default_value = DEFAULT_PROFILE, value_parser = parse_profile)]
        profile: String,
    },
    /// List the registered format profiles
    Profiles,
}

fn parse_profile(value: &str) -> Result<String, String> {
    if profiles::is_registered(value) {
        Ok(value.to_string())
    } else {
        Err(format!(
            "unknown profile '{}', expected one of: {}",
            value,
            profiles::names().join(", ")
        ))
    }
}

/// Outcome of a local `format` run.
#[derive(Debug)]
pub struct FormatSummary {
    pub characters: usize,
    pub text_preserved: bool,
    pub report: RewriteReport,
}

pub fn run_format(input: &Path, output: &Path, profile: &str) -> Result<FormatSummary, CliError> {
    let source = std::fs::read(input).map_err(|source| CliError::Read {
        path: input.display().to_string(),
        source,
    })?;

    let profile = profiles::resolve(profile);
    info!("Formatting {} with profile {}", input.display(), profile.name);
    let formatted = engine::apply(&source, profile)?;

    std::fs::write(output, &formatted.bytes).map_err(|source| CliError::Write {
        path: output.display().to_string(),
        source,
    })?;

    Ok(FormatSummary {
        characters: formatted.text.chars().count(),
        text_preserved: formatted.text_preserved,
        report: formatted.report,
    })
}

/// One line per profile, default marked with `*`.
pub fn profile_table() -> String {
    profiles::all()
        .iter()
        .map(|p| {
            format!(
                "{} {:<16} {:.1}x{:.1}cm  margins {:.2}/{:.2}/{:.2}/{:.2}cm  {} {}pt  line {}  spacing {}/{}pt",
                if p.name == DEFAULT_PROFILE { "*" } else { " " },
                p.name,
                p.page_width_cm,
                p.page_height_cm,
                p.margins.top,
                p.margins.bottom,
                p.margins.left,
                p.margins.right,
                p.font_family,
                p.font_size_pt,
                p.line_spacing,
                p.spacing_before_pt,
                p.spacing_after_pt,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
