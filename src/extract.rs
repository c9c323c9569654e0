use regex::Regex;

use crate::pattern::ExtractionPatterns;

/// Sentinel volume for "not specified".
pub const NO_VOLUME: i64 = -1;
/// Sentinel chapter when the chapter pattern does not match.
pub const NO_CHAPTER: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub volume: i64,
    pub chapter_raw: String,
    pub title: String,
}

/// Pulls volume, raw chapter and title out of a file path.
pub fn extract(subject: &str, patterns: &ExtractionPatterns) -> Extracted {
    Extracted {
        volume: extract_volume(subject, patterns.volume.as_ref()),
        chapter_raw: extract_chapter(subject, patterns.chapter.as_ref()),
        title: extract_title(subject, patterns.title.as_ref()),
    }
}

fn extract_volume(subject: &str, pattern: Option<&Regex>) -> i64 {
    let Some(capture) = pattern
        .and_then(|re| re.captures(subject))
        .and_then(|caps| caps.get(1))
    else {
        return NO_VOLUME;
    };

    match capture.as_str().parse::<i64>() {
        Ok(volume) => volume,
        Err(err) => {
            tracing::warn!(file = subject, capture = capture.as_str(), %err, "volume is not a number");
            NO_VOLUME
        }
    }
}

fn extract_chapter(subject: &str, pattern: Option<&Regex>) -> String {
    let Some(capture) = pattern
        .and_then(|re| re.captures(subject))
        .and_then(|caps| caps.get(1))
    else {
        return NO_CHAPTER.to_owned();
    };

    // Filenames use `x` and `p` as well as `.` between chapter and sub-chapter.
    capture
        .as_str()
        .chars()
        .map(|ch| match ch {
            'x' | 'X' | 'p' | 'P' => '.',
            other => other,
        })
        .collect()
}

fn extract_title(subject: &str, pattern: Option<&Regex>) -> String {
    let Some(caps) = pattern.and_then(|re| re.captures(subject)) else {
        return String::new();
    };
    caps.iter()
        .skip(1)
        .last()
        .flatten()
        .map(|m| m.as_str().to_owned())
        .unwrap_or_default()
}
