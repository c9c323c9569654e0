use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::REFERER;
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;
use url::Url;

use crate::config::Settings;
use crate::cookies::FileCookieStore;
use crate::error::Failure;
use crate::upload::{ChapterSink, ChapterSubmission, SubmitError};

const USER_AGENT: &str = concat!("bulkup/", env!("CARGO_PKG_VERSION"));
/// Appears in any page that still shows the login form.
const LOGIN_FORM_MARKER: &str = "login_username";
const ACTIONS_PATH: &str = "/ajax/actions.ajax.php";

/// Cookie-backed HTTP session with the remote service.
pub struct Session {
    client: reqwest::Client,
    base_url: Url,
    cookies: Arc<FileCookieStore>,
}

impl Session {
    pub fn open(settings: &Settings) -> anyhow::Result<Self> {
        let cookies = Arc::new(FileCookieStore::open(&settings.cookie_file)?);
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_provider(Arc::clone(&cookies))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            cookies,
        })
    }

    pub fn cookie_store(&self) -> &FileCookieStore {
        &self.cookies
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("join {path} onto {}", self.base_url))
    }

    fn action_url(&self, function: &str) -> anyhow::Result<Url> {
        let mut url = self.url(ACTIONS_PATH)?;
        url.query_pairs_mut().append_pair("function", function);
        Ok(url)
    }

    /// Posts the login form. Whether the login worked is only known after
    /// [`Session::is_logged_in`].
    pub async fn login(&self, username: &str, password: &str) -> anyhow::Result<()> {
        let endpoint = self.action_url("login")?;
        let form = Form::new()
            .text("login_username", username.to_owned())
            .text("login_password", password.to_owned())
            .text("remember_me", "1");

        let response = self
            .client
            .post(endpoint.clone())
            .header(REFERER, self.url("/login")?.as_str())
            .header("X-Requested-With", "XMLHttpRequest")
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("POST {endpoint}"))
            .context(Failure::LoginRequestFailed)?;
        tracing::debug!(status = %response.status(), "login form posted");
        Ok(())
    }

    /// Fetches a member-only page and looks for the login form on it. The
    /// status code is not consulted, only the body.
    pub async fn is_logged_in(&self) -> anyhow::Result<bool> {
        let endpoint = self.url("/follows")?;
        let response = self
            .client
            .get(endpoint.clone())
            .send()
            .await
            .with_context(|| format!("GET {endpoint}"))
            .context(Failure::LoginCheckFailed)?;
        tracing::debug!(status = %response.status(), "login check answered");
        let body = response
            .text()
            .await
            .context("read login check body")
            .context(Failure::LoginCheckFailed)?;
        Ok(!body.contains(LOGIN_FORM_MARKER))
    }

    /// Returns the HTML of the upload page, which lists every group.
    pub async fn fetch_group_listing(&self) -> anyhow::Result<String> {
        let endpoint = self.url("/upload/1")?;
        let response = self
            .client
            .get(endpoint.clone())
            .header(REFERER, self.url("/")?.as_str())
            .send()
            .await
            .with_context(|| format!("GET {endpoint}"))
            .context(Failure::GroupListingFailed)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(anyhow::anyhow!("unexpected status {status} from {endpoint}")
                .context(Failure::GroupListingFailed));
        }
        response
            .text()
            .await
            .context("read group listing body")
            .context(Failure::GroupListingFailed)
    }

    async fn upload_form(
        &self,
        manga_id: u64,
        chapter: &ChapterSubmission,
    ) -> Result<Form, SubmitError> {
        let file_error = |source| SubmitError::File {
            path: chapter.file.clone(),
            source,
        };
        let file = tokio::fs::File::open(&chapter.file)
            .await
            .map_err(file_error)?;
        let length = file.metadata().await.map_err(file_error)?.len();
        let file_name = chapter
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chapter.zip".to_owned());

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, length)
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(|err| SubmitError::Transport(describe(&err)))?;

        let form = chapter
            .form_fields(manga_id)
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value))
            .part("file", part);
        Ok(form)
    }
}

#[async_trait]
impl ChapterSink for Session {
    async fn submit(&self, manga_id: u64, chapter: &ChapterSubmission) -> Result<(), SubmitError> {
        let endpoint = self
            .action_url("chapter_upload")
            .map_err(|err| SubmitError::Transport(format!("{err:#}")))?;
        let referer = self
            .url(&format!("/upload/{manga_id}"))
            .map_err(|err| SubmitError::Transport(format!("{err:#}")))?;
        let form = self.upload_form(manga_id, chapter).await?;

        let response = self
            .client
            .post(endpoint)
            .header(REFERER, referer.as_str())
            .header("X-Requested-With", "XMLHttpRequest")
            .multipart(form)
            .send()
            .await
            .map_err(|err| SubmitError::Transport(describe(&err)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SubmitError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|err| SubmitError::Transport(describe(&err)))?;
        if !body.is_empty() {
            return Err(SubmitError::Rejected(body));
        }
        Ok(())
    }
}

/// `reqwest::Error` hides the interesting part (connection refused, DNS, ...)
/// in its source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
