use crate::cli::LoginArgs;
use crate::config::Settings;
use crate::error::Failure;
use crate::remote::Session;

pub async fn run(args: LoginArgs, settings: &Settings) -> anyhow::Result<()> {
    let username = args
        .username
        .or_else(|| settings.username.clone())
        .ok_or(Failure::MissingUsername)?;
    let password = args
        .password
        .or_else(|| settings.password.clone())
        .ok_or(Failure::MissingPassword)?;

    let session = Session::open(settings)?;
    tracing::info!(
        username = %username,
        cookies = %session.cookie_store().path().display(),
        "logging in"
    );
    session.login(&username, &password).await?;

    if !session.is_logged_in().await? {
        return Err(Failure::LoginRejected.into());
    }
    println!("Login successful as \"{username}\"");
    Ok(())
}
