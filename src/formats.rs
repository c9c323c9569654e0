use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::chapter::ChapterId;

/// Group id meaning "no group set" in a template.
pub const NO_GROUP: i64 = -1;

/// One row of an upload template. Field names follow the template files users
/// already edit by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: PathBuf,
    #[serde(default)]
    pub title: String,
    pub volume: i64,
    pub chapter: ChapterId,
    pub group: i64,
    #[serde(default = "no_group")]
    pub group_2: i64,
    #[serde(default = "no_group")]
    pub group_3: i64,
    pub language: i64,
}

pub type Manifest = Vec<ManifestEntry>;

fn no_group() -> i64 {
    NO_GROUP
}

/// A scanlation group as listed by the remote upload page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: u64,
    pub name: String,
    pub open: bool,
}
