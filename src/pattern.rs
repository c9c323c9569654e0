use regex::{Regex, RegexBuilder};

use crate::error::Failure;

pub const DEFAULT_VOLUME_PATTERN: &str = r"v(?:ol|olume)?\D?(\d+)";
pub const DEFAULT_CHAPTER_PATTERN: &str = r"c(?:h(?:apter)?)?(?:\D)?(\d+([\.|x|p]\d+)?)";

/// Compiled filename patterns. Every pattern is case-insensitive and carries
/// at least one capturing group.
#[derive(Debug, Clone, Default)]
pub struct ExtractionPatterns {
    pub volume: Option<Regex>,
    pub chapter: Option<Regex>,
    pub title: Option<Regex>,
}

impl ExtractionPatterns {
    /// Compiles the user-supplied patterns, falling back to the built-in
    /// volume and chapter defaults. There is no default title pattern.
    pub fn compile(
        volume: Option<&str>,
        chapter: Option<&str>,
        title: Option<&str>,
    ) -> Result<Self, Failure> {
        let volume = compile_one(volume.unwrap_or(DEFAULT_VOLUME_PATTERN))
            .map_err(Failure::InvalidVolumePattern)?;
        let chapter = compile_one(chapter.unwrap_or(DEFAULT_CHAPTER_PATTERN))
            .map_err(Failure::InvalidChapterPattern)?;
        let title = title
            .map(compile_one)
            .transpose()
            .map_err(Failure::InvalidTitlePattern)?;

        tracing::info!(volume = %volume, chapter = %chapter, title = ?title.as_ref().map(Regex::as_str), "using patterns");

        Ok(Self {
            volume: Some(volume),
            chapter: Some(chapter),
            title,
        })
    }
}

fn compile_one(pattern: &str) -> Result<Regex, String> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|err| format!("{pattern}: {err}"))?;
    if regex.captures_len() < 2 {
        return Err(format!("{pattern}: pattern has no capturing group"));
    }
    Ok(regex)
}
