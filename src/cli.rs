use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a directory for archives and write an upload template.
    Generate(GenerateArgs),
    /// Log in and store the session cookies.
    Login(LoginArgs),
    /// Upload every chapter listed in one or more templates.
    Upload(UploadArgs),
    /// Maintain and search the local group cache.
    Group {
        #[command(subcommand)]
        command: GroupCommand,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Directory to scan for `.zip` archives.
    #[arg(short, long)]
    pub directory: String,

    /// Output path of the template (e.g. `/path/template.json`).
    #[arg(short, long)]
    pub template: Option<String>,

    /// Case-insensitive volume pattern; group 1 is the volume number.
    #[arg(short, long = "volume-regex")]
    pub volume_regex: Option<String>,

    /// Case-insensitive chapter pattern; group 1 is the chapter number.
    #[arg(short, long = "chapter-regex")]
    pub chapter_regex: Option<String>,

    /// Case-insensitive title pattern; the last group is the title.
    #[arg(short = 'n', long = "title-regex")]
    pub title_regex: Option<String>,

    /// Up to three comma-separated group ids (e.g. `657,12`); `-1` means unset.
    #[arg(short, long, allow_hyphen_values = true)]
    pub group: Option<String>,

    /// Language id (default: 1, English).
    #[arg(short, long)]
    pub language: Option<String>,

    /// Overwrite an existing template.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(short, long)]
    pub username: Option<String>,

    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Template path, or a pattern with `*`/`?` in the file name to upload
    /// several templates in order.
    #[arg(short, long)]
    pub template: Option<String>,

    /// Id of the manga the chapters belong to.
    #[arg(short, long)]
    pub manga: Option<String>,

    /// 1-based template position to start at.
    #[arg(short, long, default_value_t = 1)]
    pub resume: usize,

    /// Group id sent in place of a `-1` primary group.
    #[arg(long)]
    pub fallback_group: Option<i64>,
}

#[derive(Debug, Subcommand)]
pub enum GroupCommand {
    /// Rebuild the group cache from the remote upload page (requires login).
    Update,
    /// Fuzzy-search open groups in the cache.
    Search(GroupSearchArgs),
}

#[derive(Debug, Args)]
pub struct GroupSearchArgs {
    /// Search term; several words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub term: Vec<String>,
}
