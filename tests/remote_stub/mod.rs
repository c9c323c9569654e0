use std::io::Read as _;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

pub const SESSION_COOKIE: &str = "session=ok";

#[derive(Debug, Clone)]
pub struct RemoteStubConfig {
    /// Password the login endpoint accepts.
    pub password: String,
    /// Chapter number whose upload is answered with an error body.
    pub reject_chapter: Option<String>,
    /// Status of the member-only page; the body alone decides the login state.
    pub follows_status: u16,
    pub listing_status: u16,
    pub listing_html: String,
}

impl Default for RemoteStubConfig {
    fn default() -> Self {
        Self {
            password: "secret".to_owned(),
            reject_chapter: None,
            follows_status: 200,
            listing_status: 200,
            listing_html: String::new(),
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedUpload {
    pub manga_id: String,
    pub chapter: String,
    pub volume: String,
    pub group: String,
    pub group_2: Option<String>,
    pub language: String,
    pub file_name: Option<String>,
}

pub struct RemoteStub {
    pub base_url: String,
    uploads: Arc<Mutex<Vec<ReceivedUpload>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RemoteStub {
    pub fn spawn(config: RemoteStubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start remote stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let uploads = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&uploads);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                let has_session = request.headers().iter().any(|header| {
                    header.field.equiv("Cookie") && header.value.as_str().contains(SESSION_COOKIE)
                });
                let mut raw = Vec::new();
                let _ = request.as_reader().read_to_end(&mut raw);
                let body = String::from_utf8_lossy(&raw).into_owned();

                let response = match url.as_str() {
                    "/ajax/actions.ajax.php?function=login" => {
                        if field(&body, "login_password").as_deref() == Some(&config.password) {
                            let cookie = tiny_http::Header::from_bytes(
                                &b"Set-Cookie"[..],
                                format!("{SESSION_COOKIE}; Path=/").as_bytes(),
                            )
                            .expect("cookie header");
                            tiny_http::Response::from_string("").with_header(cookie)
                        } else {
                            tiny_http::Response::from_string("Incorrect username or password.")
                        }
                    }
                    "/follows" => {
                        let page = if has_session {
                            "<h1>Follows</h1>"
                        } else {
                            "<form><input name='login_username'></form>"
                        };
                        tiny_http::Response::from_string(page)
                            .with_status_code(config.follows_status)
                    }
                    "/ajax/actions.ajax.php?function=chapter_upload" => {
                        if !has_session {
                            tiny_http::Response::from_string("not logged in")
                                .with_status_code(403)
                        } else {
                            let upload = ReceivedUpload {
                                manga_id: field(&body, "manga_id").unwrap_or_default(),
                                chapter: field(&body, "chapter_number").unwrap_or_default(),
                                volume: field(&body, "volume_number").unwrap_or_default(),
                                group: field(&body, "group_id").unwrap_or_default(),
                                group_2: field(&body, "group_id_2"),
                                language: field(&body, "lang_id").unwrap_or_default(),
                                file_name: file_name(&body),
                            };
                            let rejected =
                                config.reject_chapter.as_deref() == Some(upload.chapter.as_str());
                            recorded.lock().expect("uploads lock").push(upload);
                            if rejected {
                                tiny_http::Response::from_string("Chapter already exists.")
                            } else {
                                tiny_http::Response::from_string("")
                            }
                        }
                    }
                    "/upload/1" => tiny_http::Response::from_string(config.listing_html.clone())
                        .with_status_code(config.listing_status),
                    _ => tiny_http::Response::from_string("not found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            uploads,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[allow(dead_code)]
    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.uploads.lock().expect("uploads lock").clone()
    }

    #[allow(dead_code)]
    pub fn uploaded_chapters(&self) -> Vec<String> {
        self.uploads()
            .into_iter()
            .map(|upload| upload.chapter)
            .collect()
    }
}

impl Drop for RemoteStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Value of a text part in a multipart body.
fn field(body: &str, name: &str) -> Option<String> {
    let marker = format!("name=\"{name}\"\r\n\r\n");
    let start = body.find(&marker)? + marker.len();
    let end = body[start..].find("\r\n")?;
    Some(body[start..start + end].to_owned())
}

fn file_name(body: &str) -> Option<String> {
    let marker = "name=\"file\"; filename=\"";
    let start = body.find(marker)? + marker.len();
    let end = body[start..].find('"')?;
    Some(body[start..start + end].to_owned())
}
