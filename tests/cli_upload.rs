mod remote_stub;

use std::fs;
use std::path::Path;

use predicates::prelude::*;
use remote_stub::{RemoteStub, RemoteStubConfig};
use serde_json::json;

struct Workspace {
    temp: tempfile::TempDir,
}

impl Workspace {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            temp: tempfile::TempDir::new()?,
        })
    }

    fn path(&self) -> &Path {
        self.temp.path()
    }

    fn command(&self, stub: &RemoteStub) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bulkup");
        cmd.current_dir(self.path())
            .env("BULKUP_BASE_URL", &stub.base_url)
            .env("BULKUP_CONFIG", self.path().join("config.json"))
            .env("BULKUP_COOKIE_FILE", self.path().join("cookies.json"))
            .env("BULKUP_GROUP_CACHE", self.path().join("groupcache.json"))
            .env_remove("BULKUP_USERNAME")
            .env_remove("BULKUP_PASSWORD")
            .env_remove("BULKUP_FALLBACK_GROUP");
        cmd
    }

    fn seed_session(&self) -> anyhow::Result<()> {
        fs::write(
            self.path().join("cookies.json"),
            r#"[{"domain": "127.0.0.1", "name": "session", "value": "ok"}]"#,
        )?;
        Ok(())
    }

    /// Writes a template with one entry per chapter number, each pointing at
    /// its own archive.
    fn template(&self, name: &str, chapters: &[&str]) -> anyhow::Result<String> {
        let entries = chapters
            .iter()
            .map(|chapter| -> anyhow::Result<serde_json::Value> {
                let file = self.path().join(format!("c{chapter}.zip"));
                fs::write(&file, b"PK")?;
                Ok(json!({
                    "file": file,
                    "title": "",
                    "volume": 1,
                    "chapter": chapter,
                    "group": 657,
                    "group_2": -1,
                    "group_3": -1,
                    "language": 1,
                }))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(&entries)?)?;
        Ok(path.to_string_lossy().into_owned())
    }
}

#[test]
fn login_persists_session_for_later_uploads() -> anyhow::Result<()> {
    let stub = RemoteStub::spawn(RemoteStubConfig::default());
    let ws = Workspace::new()?;

    ws.command(&stub)
        .args(["login", "-u", "reader", "-p", "secret"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Login successful as \"reader\""));
    let cookies = fs::read_to_string(ws.path().join("cookies.json"))?;
    assert!(cookies.contains("\"session\""));

    let template = ws.template("template.json", &["1", "2"])?;
    ws.command(&stub)
        .args(["upload", "-t", &template, "-m", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All done"));

    let uploads = stub.uploads();
    assert_eq!(stub.uploaded_chapters(), vec!["1", "2"]);
    assert_eq!(uploads[0].manga_id, "42");
    assert_eq!(uploads[0].volume, "1");
    assert_eq!(uploads[0].group, "657");
    assert_eq!(uploads[0].group_2, None);
    assert_eq!(uploads[0].language, "1");
    assert_eq!(uploads[0].file_name.as_deref(), Some("c1.zip"));
    Ok(())
}

#[test]
fn login_state_is_read_from_the_page_body_not_the_status() -> anyhow::Result<()> {
    let stub = RemoteStub::spawn(RemoteStubConfig {
        follows_status: 500,
        ..RemoteStubConfig::default()
    });
    let ws = Workspace::new()?;

    ws.command(&stub)
        .args(["login", "-u", "reader", "-p", "secret"])
        .assert()
        .success();
    ws.command(&stub)
        .args(["login", "-u", "reader", "-p", "wrong"])
        .assert()
        .code(11);
    Ok(())
}

#[test]
fn login_credentials_can_come_from_config_file() -> anyhow::Result<()> {
    let stub = RemoteStub::spawn(RemoteStubConfig::default());
    let ws = Workspace::new()?;
    fs::write(
        ws.path().join("config.json"),
        r#"{"username": "reader", "password": "secret"}"#,
    )?;

    ws.command(&stub).arg("login").assert().success();
    Ok(())
}

#[test]
fn login_failures_have_distinct_exit_codes() -> anyhow::Result<()> {
    let stub = RemoteStub::spawn(RemoteStubConfig::default());
    let ws = Workspace::new()?;

    ws.command(&stub).args(["login", "-p", "secret"]).assert().code(5);
    ws.command(&stub).args(["login", "-u", "reader"]).assert().code(6);
    ws.command(&stub)
        .args(["login", "-u", "reader", "-p", "wrong"])
        .assert()
        .code(11)
        .stdout(predicate::str::contains("Login successful").not());

    fs::write(ws.path().join("cookies.json"), "{ not json")?;
    ws.command(&stub)
        .args(["login", "-u", "reader", "-p", "secret"])
        .assert()
        .code(8);
    Ok(())
}

#[test]
fn upload_requires_a_session() -> anyhow::Result<()> {
    let stub = RemoteStub::spawn(RemoteStubConfig::default());
    let ws = Workspace::new()?;
    let template = ws.template("template.json", &["1"])?;

    ws.command(&stub)
        .args(["upload", "-t", &template, "-m", "42"])
        .assert()
        .code(15);
    assert!(stub.uploads().is_empty());
    Ok(())
}

#[test]
fn upload_validates_arguments_before_contacting_the_server() -> anyhow::Result<()> {
    let stub = RemoteStub::spawn(RemoteStubConfig::default());
    let ws = Workspace::new()?;
    ws.seed_session()?;
    let template = ws.template("template.json", &["1"])?;

    ws.command(&stub)
        .args(["upload", "-t", &template, "-m", "abc"])
        .assert()
        .code(13);
    ws.command(&stub)
        .args(["upload", "-t", &template])
        .assert()
        .code(13);
    ws.command(&stub).args(["upload", "-m", "42"]).assert().code(4);
    ws.command(&stub)
        .args(["upload", "-t", "nothing-*.json", "-m", "42"])
        .assert()
        .code(1);
    ws.command(&stub)
        .args(["upload", "-t", "missing.json", "-m", "42"])
        .assert()
        .code(4);

    fs::write(ws.path().join("broken.json"), "[{\"file\": ")?;
    ws.command(&stub)
        .args(["upload", "-t", "broken.json", "-m", "42"])
        .assert()
        .code(14);

    assert!(stub.uploads().is_empty());
    Ok(())
}

#[test]
fn rejected_chapter_halts_with_resume_hints() -> anyhow::Result<()> {
    let stub = RemoteStub::spawn(RemoteStubConfig {
        reject_chapter: Some("3".to_owned()),
        ..RemoteStubConfig::default()
    });
    let ws = Workspace::new()?;
    ws.seed_session()?;
    let template = ws.template("template.json", &["1", "2", "3", "4", "5"])?;

    ws.command(&stub)
        .args(["upload", "-t", &template, "-m", "42"])
        .assert()
        .code(19)
        .stdout(
            predicate::str::contains("Chapter already exists.")
                .and(predicate::str::contains("--resume 3"))
                .and(predicate::str::contains("--resume 4")),
        );
    assert_eq!(stub.uploaded_chapters(), vec!["1", "2", "3"]);

    ws.command(&stub)
        .args(["upload", "-t", &template, "-m", "42", "--resume", "4"])
        .assert()
        .success();
    assert_eq!(stub.uploaded_chapters(), vec!["1", "2", "3", "4", "5"]);
    Ok(())
}

#[test]
fn resume_past_the_end_uploads_nothing() -> anyhow::Result<()> {
    let stub = RemoteStub::spawn(RemoteStubConfig::default());
    let ws = Workspace::new()?;
    ws.seed_session()?;
    let template = ws.template("template.json", &["1", "2"])?;

    ws.command(&stub)
        .args(["upload", "-t", &template, "-m", "42", "-r", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 chapters uploaded"));
    assert!(stub.uploads().is_empty());
    Ok(())
}

#[test]
fn no_group_sentinels_use_the_fallback_group() -> anyhow::Result<()> {
    let stub = RemoteStub::spawn(RemoteStubConfig::default());
    let ws = Workspace::new()?;
    ws.seed_session()?;
    fs::write(ws.path().join("c1.zip"), b"PK")?;
    let entry = json!([{
        "file": ws.path().join("c1.zip"),
        "volume": -1,
        "chapter": 1,
        "group": -1,
        "group_2": 12,
        "group_3": -1,
        "language": 2,
    }]);
    fs::write(ws.path().join("template.json"), entry.to_string())?;

    ws.command(&stub)
        .args(["upload", "-t", "template.json", "-m", "42"])
        .assert()
        .success();
    ws.command(&stub)
        .args(["upload", "-t", "template.json", "-m", "42"])
        .args(["--fallback-group", "9"])
        .assert()
        .success();
    ws.command(&stub)
        .env("BULKUP_FALLBACK_GROUP", "7")
        .args(["upload", "-t", "template.json", "-m", "42"])
        .assert()
        .success();

    let uploads = stub.uploads();
    let groups = uploads.iter().map(|u| u.group.as_str()).collect::<Vec<_>>();
    assert_eq!(groups, vec!["2", "9", "7"]);
    assert_eq!(uploads[0].volume, "");
    assert_eq!(uploads[0].chapter, "1");
    assert_eq!(uploads[0].group_2.as_deref(), Some("12"));
    assert_eq!(uploads[0].language, "2");
    Ok(())
}

#[test]
fn glob_uploads_templates_in_order_and_continues_after_failure() -> anyhow::Result<()> {
    let stub = RemoteStub::spawn(RemoteStubConfig {
        reject_chapter: Some("2".to_owned()),
        ..RemoteStubConfig::default()
    });
    let ws = Workspace::new()?;
    ws.seed_session()?;
    ws.template("batch/t2.json", &["10", "11"])?;
    ws.template("batch/t1.json", &["1", "2", "3"])?;
    ws.template("batch/other.json", &["99"])?;

    ws.command(&stub)
        .args(["upload", "-t", "batch/t?.json", "-m", "42"])
        .assert()
        .code(19)
        .stdout(
            predicate::str::contains("Batch-uploading 2 templates")
                .and(predicate::str::contains("--resume 2"))
                .and(predicate::str::contains("t2.json (2 chapters uploaded)")),
        );
    assert_eq!(stub.uploaded_chapters(), vec!["1", "2", "10", "11"]);
    Ok(())
}
