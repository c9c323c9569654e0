use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::chapter;
use crate::cli::GenerateArgs;
use crate::error::Failure;
use crate::extract::{Extracted, extract};
use crate::formats::{Manifest, ManifestEntry};
use crate::pattern::ExtractionPatterns;
use crate::scan;
use crate::store::{self, JsonLayout};

pub const DEFAULT_LANGUAGE: i64 = 1;
pub const DEFAULT_GROUPS: [i64; 3] = [0, 0, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateDefaults {
    pub groups: [i64; 3],
    pub language: i64,
}

impl Default for TemplateDefaults {
    fn default() -> Self {
        Self {
            groups: DEFAULT_GROUPS,
            language: DEFAULT_LANGUAGE,
        }
    }
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let template_path = PathBuf::from(args.template.as_deref().ok_or(Failure::TemplateMissing)?);
    if template_path.exists() && !args.force {
        anyhow::bail!(
            "template output already exists (pass --force to overwrite): {}",
            template_path.display()
        );
    }

    let defaults = TemplateDefaults {
        groups: match args.group.as_deref() {
            Some(raw) => parse_groups(raw)?,
            None => DEFAULT_GROUPS,
        },
        language: match args.language.as_deref() {
            Some(raw) => parse_language(raw)?,
            None => DEFAULT_LANGUAGE,
        },
    };

    let patterns = ExtractionPatterns::compile(
        args.volume_regex.as_deref(),
        args.chapter_regex.as_deref(),
        args.title_regex.as_deref(),
    )?;

    let files = scan::scan_archives(Path::new(&args.directory))?;
    let manifest = build(&files, &patterns, defaults).context("build template")?;

    write_manifest(&template_path, &manifest)?;
    tracing::info!(
        template = %template_path.display(),
        entries = manifest.len(),
        "template generated"
    );
    println!(
        "Template with {} entries written to {}",
        manifest.len(),
        template_path.display()
    );
    Ok(())
}

/// Turns a sorted file list into template entries, one per file, in input
/// order. Chapter padding is computed over the whole batch.
pub fn build(
    files: &[PathBuf],
    patterns: &ExtractionPatterns,
    defaults: TemplateDefaults,
) -> anyhow::Result<Manifest> {
    if !scan::is_locale_sorted(files) {
        anyhow::bail!("template input files must be sorted before building");
    }

    let subjects = files
        .iter()
        .map(|file| file.to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    let extracted = subjects
        .iter()
        .map(|subject| extract(subject, patterns))
        .collect::<Vec<Extracted>>();

    let raw_chapters = extracted
        .iter()
        .map(|e| e.chapter_raw.clone())
        .collect::<Vec<_>>();
    let chapters = chapter::normalize(&raw_chapters, &subjects);

    let [group, group_2, group_3] = defaults.groups;
    let manifest = files
        .iter()
        .zip(extracted)
        .zip(chapters)
        .map(|((file, extracted), chapter)| ManifestEntry {
            file: file.clone(),
            title: extracted.title,
            volume: extracted.volume,
            chapter,
            group,
            group_2,
            group_3,
            language: defaults.language,
        })
        .collect();
    Ok(manifest)
}

pub fn write_manifest(path: &Path, manifest: &Manifest) -> anyhow::Result<()> {
    store::write_json_atomic(path, manifest, JsonLayout::Pretty)
        .with_context(|| format!("write template: {}", path.display()))
        .context(Failure::TemplateInaccessible(path.to_path_buf()))
}

pub fn read_manifest(path: &Path) -> anyhow::Result<Manifest> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read template: {}", path.display()))
        .context(Failure::TemplateInaccessible(path.to_path_buf()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("parse template: {}", path.display()))
        .context(Failure::TemplateBroken(path.to_path_buf()))
}

/// Parses `"657,12"` into three group ids; missing slots become `0`.
pub fn parse_groups(raw: &str) -> Result<[i64; 3], Failure> {
    let mut groups = DEFAULT_GROUPS;
    for (slot, part) in groups.iter_mut().zip(raw.split(',')) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        *slot = part
            .parse()
            .map_err(|_| Failure::InvalidGroupId(part.to_owned()))?;
    }
    Ok(groups)
}

pub fn parse_language(raw: &str) -> Result<i64, Failure> {
    raw.trim()
        .parse()
        .map_err(|_| Failure::InvalidLanguage(raw.to_owned()))
}
