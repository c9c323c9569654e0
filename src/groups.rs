//! Local snapshot of the remote group list, and fuzzy search over it.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context as _;
use regex::Regex;

use crate::cli::GroupSearchArgs;
use crate::config::Settings;
use crate::error::Failure;
use crate::formats::GroupRecord;
use crate::remote::Session;
use crate::similarity;
use crate::store::{self, JsonLayout};

pub const MIN_SCORE: f64 = 0.4;
pub const MAX_RESULTS: usize = 10;

static GROUP_OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<option data-subtext='([^<]*)' value='([0-9]+)'>([^<]+)<")
        .expect("group option pattern is valid")
});

#[derive(Debug, Clone, PartialEq)]
pub struct GroupMatch {
    pub record: GroupRecord,
    pub score: f64,
}

pub async fn update(settings: &Settings) -> anyhow::Result<()> {
    let session = Session::open(settings)?;
    tracing::info!("retrieving group list (the list is empty unless logged in)");
    let html = session.fetch_group_listing().await?;

    let records = parse_listing(&html);
    save_cache(&settings.group_cache, &records)?;
    tracing::info!(
        count = records.len(),
        cache = %settings.group_cache.display(),
        "group cache updated"
    );
    println!("Group cache updated with {} groups", records.len());
    Ok(())
}

pub fn search_command(args: GroupSearchArgs, settings: &Settings) -> anyhow::Result<()> {
    let term = args.term.join(" ");
    if term.trim().is_empty() {
        anyhow::bail!("not enough search terms specified");
    }

    let records = load_cache(&settings.group_cache)?;
    let matches = search(&records, &term);
    if matches.is_empty() {
        println!("No matches found.");
        return Ok(());
    }

    println!("Best matches (max. {MAX_RESULTS}):\n");
    println!(" ID\tNAME (SCORE)");
    println!("==============================");
    for found in &matches {
        println!(
            " {}\t{} ({:.2})",
            found.record.id, found.record.name, found.score
        );
    }
    Ok(())
}

/// Extracts groups from the upload page's `<option>` list. The first
/// occurrence of an id wins.
pub fn parse_listing(html: &str) -> Vec<GroupRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for caps in GROUP_OPTION.captures_iter(html) {
        let Ok(id) = caps[2].parse::<u64>() else {
            tracing::warn!(raw = &caps[2], "skipping group with unparsable id");
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        records.push(GroupRecord {
            id,
            name: caps[3].to_owned(),
            open: caps[1].is_empty(),
        });
    }
    records
}

/// Replaces the cache file wholesale.
pub fn save_cache(path: &Path, records: &[GroupRecord]) -> anyhow::Result<()> {
    store::write_json_atomic(path, &records, JsonLayout::Compact)
        .with_context(|| format!("write group cache: {}", path.display()))
}

pub fn load_cache(path: &Path) -> anyhow::Result<Vec<GroupRecord>> {
    store::read_json(path)
        .with_context(|| format!("read group cache: {}", path.display()))?
        .ok_or_else(|| Failure::GroupCacheMissing(path.to_path_buf()).into())
}

/// Ranks open groups by name similarity to `term`, best first.
pub fn search(records: &[GroupRecord], term: &str) -> Vec<GroupMatch> {
    let mut matches = records
        .iter()
        .filter(|record| record.open)
        .map(|record| GroupMatch {
            score: similarity::compare(&record.name, term),
            record: record.clone(),
        })
        .filter(|found| found.score >= MIN_SCORE)
        .collect::<Vec<_>>();
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(MAX_RESULTS);
    matches
}
