use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

/// Failures an operator has to act on. Each one maps to a fixed process exit
/// code so wrapper scripts can tell them apart.
#[derive(Debug, Error)]
pub enum Failure {
    #[error("scanning the directory failed: {0}")]
    ScanFailed(PathBuf),
    #[error("no template files matched: {0}")]
    NoTemplatesMatched(String),
    #[error("invalid volume pattern: {0}")]
    InvalidVolumePattern(String),
    #[error("invalid chapter pattern: {0}")]
    InvalidChapterPattern(String),
    #[error("invalid title pattern: {0}")]
    InvalidTitlePattern(String),
    #[error("no template file has been specified")]
    TemplateMissing,
    #[error("template file is inaccessible: {0}")]
    TemplateInaccessible(PathBuf),
    #[error("template file is broken: {0}")]
    TemplateBroken(PathBuf),
    #[error("no username was provided")]
    MissingUsername,
    #[error("no password was provided")]
    MissingPassword,
    #[error("cookie file is inaccessible: {0}")]
    CookieStoreInaccessible(PathBuf),
    #[error("cookie file is broken: {0}")]
    CookieStoreBroken(PathBuf),
    #[error("login request failed")]
    LoginRequestFailed,
    #[error("login check failed")]
    LoginCheckFailed,
    #[error("not logged in, probably wrong username or password")]
    LoginRejected,
    #[error("invalid language id: {0:?}")]
    InvalidLanguage(String),
    #[error("invalid manga id: {0:?}")]
    InvalidMangaId(String),
    #[error("invalid group id: {0:?}")]
    InvalidGroupId(String),
    #[error("you are not logged in, run `login` first")]
    NotLoggedIn,
    #[error("group cache not found at {0}, run `group update` first")]
    GroupCacheMissing(PathBuf),
    #[error("retrieving the group list failed")]
    GroupListingFailed,
    #[error("{0} template(s) stopped before completion")]
    UploadHalted(usize),
    #[error(transparent)]
    InvalidUsage(#[from] clap::Error),
}

impl Failure {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ScanFailed(_) | Self::NoTemplatesMatched(_) => 1,
            Self::InvalidVolumePattern(_) => 2,
            Self::InvalidChapterPattern(_) => 3,
            Self::TemplateMissing | Self::TemplateInaccessible(_) => 4,
            Self::MissingUsername => 5,
            Self::MissingPassword => 6,
            Self::CookieStoreInaccessible(_) => 7,
            Self::CookieStoreBroken(_) => 8,
            Self::LoginRequestFailed => 9,
            Self::LoginCheckFailed => 10,
            Self::LoginRejected => 11,
            Self::InvalidLanguage(_) => 12,
            Self::InvalidMangaId(_) => 13,
            Self::TemplateBroken(_) => 14,
            Self::NotLoggedIn => 15,
            Self::InvalidTitlePattern(_) => 16,
            Self::GroupCacheMissing(_) => 17,
            Self::InvalidGroupId(_) => 18,
            Self::UploadHalted(_) => 19,
            Self::GroupListingFailed => 20,
            Self::InvalidUsage(_) => 21,
        }
    }
}

/// Picks the exit code for an error chain. A [`Failure`] is found whether it
/// is the root cause or was attached as context; anything else exits with 1.
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let code = err.downcast_ref::<Failure>().map_or(1, Failure::exit_code);
    ExitCode::from(code)
}
