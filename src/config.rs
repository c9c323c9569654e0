use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://mangadex.org";
pub const DEFAULT_CONFIG_FILE: &str = "./config.json";
pub const DEFAULT_COOKIE_FILE: &str = "./bulkup-cookies.json";
pub const DEFAULT_GROUP_CACHE: &str = "./groupcache.json";
/// Group the remote service uses for "no group / unknown". Sent whenever a
/// template's primary group is `-1`.
pub const DEFAULT_FALLBACK_GROUP: i64 = 2;

/// Optional `config.json` next to the working directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub username: Option<String>,
    pub password: Option<String>,
    pub base_url: Option<String>,
    pub cookie_file: Option<PathBuf>,
    pub group_cache: Option<PathBuf>,
    pub fallback_group: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: Url,
    pub cookie_file: PathBuf,
    pub group_cache: PathBuf,
    pub fallback_group: i64,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Settings {
    /// Environment (`BULKUP_*`) over the config file over built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("BULKUP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        let file = read_config_file(&config_path)?;
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    fn resolve(
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let base_url = env("BULKUP_BASE_URL")
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let base_url = Url::parse(&base_url).with_context(|| format!("parse base url: {base_url}"))?;

        let fallback_group = match env("BULKUP_FALLBACK_GROUP") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid BULKUP_FALLBACK_GROUP={raw:?}"))?,
            None => file.fallback_group.unwrap_or(DEFAULT_FALLBACK_GROUP),
        };

        Ok(Self {
            base_url,
            cookie_file: env("BULKUP_COOKIE_FILE")
                .map(PathBuf::from)
                .or(file.cookie_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COOKIE_FILE)),
            group_cache: env("BULKUP_GROUP_CACHE")
                .map(PathBuf::from)
                .or(file.group_cache)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GROUP_CACHE)),
            fallback_group,
            username: env("BULKUP_USERNAME").or(file.username),
            password: env("BULKUP_PASSWORD").or(file.password),
        })
    }
}

fn read_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let config = crate::store::read_json::<ConfigFile>(path)
        .with_context(|| format!("read config file: {}", path.display()))?;
    if config.is_some() {
        tracing::debug!(path = %path.display(), "loaded config file");
    }
    Ok(config.unwrap_or_default())
}
