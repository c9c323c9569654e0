use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization as _;
use unicode_normalization::char::is_combining_mark;
use walkdir::WalkDir;

use crate::error::Failure;

const ARCHIVE_EXTENSION: &str = ".zip";

/// Recursively collects `.zip` files under `dir`, sorted with [`locale_cmp`].
pub fn scan_archives(dir: &Path) -> Result<Vec<PathBuf>, Failure> {
    tracing::info!(dir = %dir.display(), "scanning directory");

    let mut found = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|err| {
            tracing::error!(%err, "directory walk failed");
            Failure::ScanFailed(err.path().unwrap_or(dir).to_path_buf())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_archive = entry
            .file_name()
            .to_string_lossy()
            .to_lowercase()
            .ends_with(ARCHIVE_EXTENSION);
        if is_archive {
            found.push(entry.into_path());
        }
    }

    sort_paths(&mut found);
    tracing::info!(count = found.len(), "scan done");
    Ok(found)
}

pub fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| locale_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
}

/// Human-oriented string order. Letters compare without accents or case
/// first (`é` sorts next to `e`, not after `z`). Ties go to the unaccented
/// form, then lowercase before uppercase, and byte order settles the rest.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let base = base_letters(a).cmp(base_letters(b));
    if base != Ordering::Equal {
        return base;
    }

    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    if folded != Ordering::Equal {
        return folded;
    }

    for (x, y) in a.chars().zip(b.chars()) {
        if x == y {
            continue;
        }
        match (x.is_lowercase(), y.is_lowercase()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }
    a.cmp(b)
}

fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
}

pub fn is_locale_sorted(paths: &[PathBuf]) -> bool {
    paths.is_sorted_by(|a, b| {
        locale_cmp(&a.to_string_lossy(), &b.to_string_lossy()) != Ordering::Greater
    })
}
