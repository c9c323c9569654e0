//! Sequential, resumable upload of template entries.
//!
//! Entries are submitted strictly one after another: the remote upload session
//! is single-flight per account. The first failure stops the run and reports
//! its position so the operator can restart with `--resume`.

use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::Context as _;
use async_trait::async_trait;
use glob::glob;
use thiserror::Error;

use crate::cli::UploadArgs;
use crate::config::Settings;
use crate::error::Failure;
use crate::formats::{Manifest, ManifestEntry, NO_GROUP};
use crate::remote::Session;
use crate::{extract, scan, template};

/// Why a single submission failed. Every kind halts the run the same way.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("could not read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid status code {0}")]
    Status(u16),
    #[error("server rejected the chapter: {0}")]
    Rejected(String),
}

/// A template entry with its sentinels resolved into what goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSubmission {
    pub file: PathBuf,
    pub title: String,
    pub volume: Option<i64>,
    pub chapter: String,
    pub group: i64,
    pub group_2: Option<i64>,
    pub group_3: Option<i64>,
    pub language: i64,
}

impl ChapterSubmission {
    pub fn from_entry(entry: &ManifestEntry, fallback_group: i64) -> Self {
        let optional_group = |id: i64| (id != NO_GROUP).then_some(id);
        Self {
            file: entry.file.clone(),
            title: entry.title.clone(),
            volume: (entry.volume != extract::NO_VOLUME).then_some(entry.volume),
            chapter: entry.chapter.to_string(),
            group: if entry.group == NO_GROUP {
                fallback_group
            } else {
                entry.group
            },
            group_2: optional_group(entry.group_2),
            group_3: optional_group(entry.group_3),
            language: entry.language,
        }
    }

    /// Text fields of the upload form, in order. Unset optional groups are
    /// left out entirely; an unset volume is sent blank.
    pub fn form_fields(&self, manga_id: u64) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("manga_id", manga_id.to_string()),
            ("chapter_name", self.title.clone()),
            (
                "volume_number",
                self.volume.map(|v| v.to_string()).unwrap_or_default(),
            ),
            ("chapter_number", self.chapter.clone()),
            ("group_id", self.group.to_string()),
        ];
        if let Some(group) = self.group_2 {
            fields.push(("group_id_2", group.to_string()));
        }
        if let Some(group) = self.group_3 {
            fields.push(("group_id_3", group.to_string()));
        }
        fields.push(("lang_id", self.language.to_string()));
        fields
    }
}

#[async_trait]
pub trait ChapterSink: Send + Sync {
    async fn submit(&self, manga_id: u64, chapter: &ChapterSubmission) -> Result<(), SubmitError>;
}

#[derive(Debug)]
pub struct UploadFailure {
    /// Zero-based index of the failed entry.
    pub position: usize,
    pub reason: SubmitError,
}

impl UploadFailure {
    /// 1-based position that retries the failed entry.
    pub fn retry_position(&self) -> usize {
        self.position + 1
    }

    /// 1-based position that skips the failed entry.
    pub fn skip_position(&self) -> usize {
        self.position + 2
    }
}

#[derive(Debug)]
pub enum UploadOutcome {
    Done { submitted: usize },
    Failed(UploadFailure),
}

#[derive(Debug)]
pub struct TemplateReport {
    pub template: PathBuf,
    pub outcome: UploadOutcome,
}

pub async fn run(args: UploadArgs, settings: &Settings) -> anyhow::Result<()> {
    let raw_manga = args.manga.as_deref().unwrap_or_default();
    let manga_id = raw_manga
        .trim()
        .parse::<u64>()
        .map_err(|_| Failure::InvalidMangaId(raw_manga.to_owned()))?;
    let raw_template = args.template.as_deref().ok_or(Failure::TemplateMissing)?;
    if args.resume == 0 {
        anyhow::bail!("--resume is 1-based and must be at least 1");
    }
    let fallback_group = args.fallback_group.unwrap_or(settings.fallback_group);

    let templates = expand_templates(raw_template)?;
    if templates.len() > 1 {
        println!("Batch-uploading {} templates:", templates.len());
        for template in &templates {
            println!("\t{}", template.display());
        }
    }

    let session = Session::open(settings)?;
    if !session.is_logged_in().await? {
        return Err(Failure::NotLoggedIn.into());
    }

    let reports = run_batch(templates, args.resume, manga_id, &session, fallback_group).await?;

    let mut halted = 0;
    for report in &reports {
        match &report.outcome {
            UploadOutcome::Done { submitted } => {
                println!(
                    "All done: {} ({submitted} chapters uploaded)",
                    report.template.display()
                );
            }
            UploadOutcome::Failed(failure) => {
                halted += 1;
                println!(
                    "Error: upload of {} stopped at position {}: {}",
                    report.template.display(),
                    failure.retry_position(),
                    failure.reason
                );
                println!(
                    "To retry this chapter later, use --resume {}",
                    failure.retry_position()
                );
                println!(
                    "To skip this chapter, use --resume {}",
                    failure.skip_position()
                );
            }
        }
    }

    if halted > 0 {
        return Err(Failure::UploadHalted(halted).into());
    }
    Ok(())
}

/// Processes templates first-in first-out; each finishes (or fails) before the
/// next one is read. A template that cannot be read aborts the batch.
pub async fn run_batch(
    templates: Vec<PathBuf>,
    start_position: usize,
    manga_id: u64,
    sink: &dyn ChapterSink,
    fallback_group: i64,
) -> anyhow::Result<Vec<TemplateReport>> {
    let mut queue = VecDeque::from(templates);
    let mut reports = Vec::with_capacity(queue.len());

    while let Some(template) = queue.pop_front() {
        tracing::info!(template = %template.display(), "processing template");
        let manifest = template::read_manifest(&template)?;
        let outcome = run_manifest(manifest, start_position, manga_id, sink, fallback_group)
            .await
            .with_context(|| format!("upload template: {}", template.display()))?;
        reports.push(TemplateReport { template, outcome });
    }

    Ok(reports)
}

/// Submits entries from the 1-based `start_position` onward and stops at the
/// first failure.
pub async fn run_manifest(
    manifest: Manifest,
    start_position: usize,
    manga_id: u64,
    sink: &dyn ChapterSink,
    fallback_group: i64,
) -> anyhow::Result<UploadOutcome> {
    if start_position == 0 {
        anyhow::bail!("start position is 1-based, got 0");
    }

    let mut submitted = 0;
    for (position, entry) in manifest.iter().enumerate().skip(start_position - 1) {
        let chapter = ChapterSubmission::from_entry(entry, fallback_group);
        tracing::info!(
            position = position + 1,
            volume = ?chapter.volume,
            chapter = %chapter.chapter,
            file = %chapter.file.display(),
            "uploading"
        );

        if let Err(reason) = sink.submit(manga_id, &chapter).await {
            tracing::error!(position = position + 1, %reason, "upload failed");
            return Ok(UploadOutcome::Failed(UploadFailure { position, reason }));
        }
        submitted += 1;
    }

    Ok(UploadOutcome::Done { submitted })
}

/// Expands a template glob (`*`, `?`, `[..]`, in any path component) into
/// the matching files, sorted. A path without wildcards is returned as is,
/// even when it does not exist yet.
pub fn expand_templates(raw: &str) -> anyhow::Result<Vec<PathBuf>> {
    if !raw.contains(['*', '?']) {
        return Ok(vec![PathBuf::from(raw)]);
    }

    let mut matched = Vec::new();
    for entry in glob(raw).with_context(|| format!("invalid template pattern: {raw}"))? {
        let path = entry.context("read template match")?;
        if path.is_file() {
            matched.push(path);
        }
    }

    if matched.is_empty() {
        return Err(Failure::NoTemplatesMatched(raw.to_owned()).into());
    }
    scan::sort_paths(&mut matched);
    Ok(matched)
}
