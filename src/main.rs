use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return bulkup::error::exit_code_for(&err);
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    bulkup::logging::init().context("init logging")?;

    let cli = match bulkup::cli::Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => {
            err.print().context("print help")?;
            return Ok(());
        }
        Err(err) => return Err(bulkup::error::Failure::InvalidUsage(err).into()),
    };
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        bulkup::cli::Command::Generate(args) => {
            bulkup::template::run(args).context("generate")?;
        }
        bulkup::cli::Command::Login(args) => {
            let settings = bulkup::config::Settings::load().context("load settings")?;
            bulkup::login::run(args, &settings).await.context("login")?;
        }
        bulkup::cli::Command::Upload(args) => {
            let settings = bulkup::config::Settings::load().context("load settings")?;
            bulkup::upload::run(args, &settings)
                .await
                .context("upload")?;
        }
        bulkup::cli::Command::Group {
            command: bulkup::cli::GroupCommand::Update,
        } => {
            let settings = bulkup::config::Settings::load().context("load settings")?;
            bulkup::groups::update(&settings)
                .await
                .context("group update")?;
        }
        bulkup::cli::Command::Group {
            command: bulkup::cli::GroupCommand::Search(args),
        } => {
            let settings = bulkup::config::Settings::load().context("load settings")?;
            bulkup::groups::search_command(args, &settings).context("group search")?;
        }
    }

    Ok(())
}
