//! Session cookies persisted to a JSON file between invocations.
//!
//! `login` writes the cookies, later `upload` and `group update` runs read
//! them back. Every `Set-Cookie` received is written through to disk.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Failure;
use crate::store::{self, JsonLayout};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub domain: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug)]
pub struct FileCookieStore {
    path: PathBuf,
    cookies: Mutex<Vec<StoredCookie>>,
}

impl FileCookieStore {
    /// Opens the cookie file, creating an empty one when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Failure> {
        let path = path.into();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                std::fs::write(&path, "")
                    .map_err(|_| Failure::CookieStoreInaccessible(path.clone()))?;
                String::new()
            }
            Err(err) => {
                tracing::error!(path = %path.display(), %err, "cookie file unreadable");
                return Err(Failure::CookieStoreInaccessible(path));
            }
        };

        let cookies = if text.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&text).map_err(|err| {
                tracing::error!(path = %path.display(), %err, "cookie file does not parse");
                Failure::CookieStoreBroken(path.clone())
            })?
        };

        Ok(Self {
            path,
            cookies: Mutex::new(cookies),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Vec<StoredCookie> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredCookie>> {
        self.cookies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn apply(&self, header: &str, url: &Url) -> bool {
        let Some(parsed) = parse_set_cookie(header, url) else {
            return false;
        };

        let mut cookies = self.lock();
        cookies.retain(|c| !(c.domain == parsed.cookie.domain && c.name == parsed.cookie.name));
        if !parsed.expired {
            cookies.push(parsed.cookie);
        }
        true
    }

    /// Blocking write on the calling runtime thread; requests are issued one
    /// at a time, so nothing else is waiting on it.
    fn persist(&self) {
        let cookies = self.snapshot();
        if let Err(err) = store::write_json_atomic(&self.path, &cookies, JsonLayout::Pretty) {
            tracing::warn!(path = %self.path.display(), ?err, "failed to persist cookies");
        }
    }
}

impl reqwest::cookie::CookieStore for FileCookieStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let mut changed = false;
        for header in cookie_headers {
            if let Ok(header) = header.to_str() {
                changed |= self.apply(header, url);
            }
        }
        if changed {
            self.persist();
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let host = url.host_str()?;
        let header = self
            .lock()
            .iter()
            .filter(|c| domain_matches(host, &c.domain))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

struct ParsedCookie {
    cookie: StoredCookie,
    expired: bool,
}

fn parse_set_cookie(header: &str, url: &Url) -> Option<ParsedCookie> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut domain = url.host_str()?.to_ascii_lowercase();
    let mut expired = false;
    for attribute in parts {
        let (key, val) = attribute.split_once('=').unwrap_or((attribute, ""));
        match key.trim().to_ascii_lowercase().as_str() {
            "domain" => {
                let val = val.trim().trim_start_matches('.').to_ascii_lowercase();
                if !val.is_empty() {
                    domain = val;
                }
            }
            "max-age" => expired = val.trim().parse::<i64>().is_ok_and(|age| age <= 0),
            _ => {}
        }
    }

    let value = value.trim().trim_matches('"');
    if value.is_empty() || value == "deleted" {
        expired = true;
    }

    Some(ParsedCookie {
        cookie: StoredCookie {
            domain,
            name: name.to_owned(),
            value: value.to_owned(),
        },
        expired,
    })
}

fn domain_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}
