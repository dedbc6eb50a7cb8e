use a11ysnap_lib::{ResourceKind, Viewport};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "a11ysnap")]
#[command(
    version,
    about = "a11ysnap - Capture accessibility snapshots of web pages",
    long_about = "a11ysnap\n\nModes:\n- capture: load a page (live URL via Playwright, or a local HTML file) and emit its accessibility tree plus every interactive element with a unique selector and bounds.\n- inspect: summarize a previously saved snapshot.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output (progress and debug logs on stderr)")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) to set defaults for viewport/timeouts/scan options; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture an accessibility snapshot of a page
    Capture(CaptureArgs),

    /// Summarize a saved snapshot
    Inspect {
        #[arg(long, value_name = "PATH", help = "Snapshot JSON written by `a11ysnap capture`")]
        snapshot: PathBuf,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
pub struct CaptureArgs {
    #[arg(long, help = "Page to capture (http(s)/file URL, or a local .html file)")]
    pub input: String,

    #[arg(long, value_enum, help = "Override type detection for input")]
    pub input_type: Option<InputType>,

    #[arg(
        long,
        default_value = "1280x720",
        help = "Viewport dimensions (WIDTHxHEIGHT)"
    )]
    pub viewport: Viewport,

    #[arg(long, value_enum, default_value = "json", help = "Output format")]
    pub format: OutputFormat,

    #[arg(long, short, help = "Output file path (stdout if omitted)")]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        default_value = "30",
        help = "Bound (seconds) on the capture itself, after the page has loaded"
    )]
    pub timeout: u64,

    #[arg(
        long,
        default_value = "30",
        help = "Navigation timeout (seconds) for URL rendering"
    )]
    pub nav_timeout: u64,

    #[arg(
        long,
        value_name = "CHARS",
        help = "Truncate element text to this many characters"
    )]
    pub max_text_length: Option<usize>,

    #[arg(long, help = "Drop interactive elements that render with zero width or height")]
    pub visible_only: bool,

    #[arg(long, help = "Show the browser window instead of running headless")]
    pub headed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InputType {
    Url,
    Html,
}

impl From<InputType> for ResourceKind {
    fn from(value: InputType) -> Self {
        match value {
            InputType::Url => ResourceKind::Url,
            InputType::Html => ResourceKind::Html,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
