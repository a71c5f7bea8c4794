//! CLI argument definitions using clap derive

use crate::response::parse_http_date;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Imagix - path-addressed image derivative cache
///
/// Maps source images to cache URLs that embed the source mtime,
/// generates derivatives on demand and sweeps stale ones.
#[derive(Parser, Debug)]
#[command(name = "imagix")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "IMAGIX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding original images (overrides paths.source)
    #[arg(long, global = true, env = "IMAGIX_SOURCE_ROOT")]
    pub source_root: Option<PathBuf>,

    /// Directory derivatives are written to (overrides paths.destination)
    #[arg(long, global = true, env = "IMAGIX_DESTINATION_ROOT")]
    pub destination_root: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the cache URL for a source image
    Url(UrlArgs),

    /// Print the source path and format encoded in a cache URL
    Source(DestinationArgs),

    /// Print the URL a cache path should currently be served under
    Effective(DestinationArgs),

    /// Generate the derivative for a cache path and print its location
    Compile(DestinationArgs),

    /// Serve a cache path as a CGI response on stdout
    Send(SendArgs),

    /// Remove cached variants of one source image
    Unlink(UnlinkArgs),

    /// Remove cached variants across the whole cache
    Remove(RemoveArgs),

    /// List configured formats
    Formats(FormatsArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the url command
#[derive(Parser, Debug)]
pub struct UrlArgs {
    /// Source path relative to the source root, e.g. /photos/cat.jpg
    pub source: String,

    /// Format name
    pub format: String,
}

/// Arguments for commands taking a cache path
#[derive(Parser, Debug)]
pub struct DestinationArgs {
    /// Cache path, e.g. /photos/cat@thumb@1700000000.jpg
    pub destination: String,
}

/// Arguments for the send command
#[derive(Parser, Debug)]
pub struct SendArgs {
    /// Cache path requested by the client
    pub destination: String,

    /// Value of the client's If-Modified-Since header
    #[arg(long, value_parser = parse_if_modified_since)]
    pub if_modified_since: Option<SystemTime>,
}

/// Arguments for the unlink command
#[derive(Parser, Debug)]
pub struct UnlinkArgs {
    /// Source path whose variants should be removed
    pub source: String,

    /// Only remove this format
    #[arg(short, long)]
    pub format: Option<String>,

    /// Only remove files at least this many seconds old
    #[arg(short, long, value_parser = parse_lifetime)]
    pub lifetime: Option<Duration>,
}

/// Arguments for the remove command
#[derive(Parser, Debug)]
pub struct RemoveArgs {
    /// Only remove this format
    #[arg(short, long)]
    pub format: Option<String>,

    /// Only remove files at least this many seconds old (default: from config)
    #[arg(short, long, value_parser = parse_lifetime)]
    pub lifetime: Option<Duration>,

    /// Show what would be removed
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt when clearing everything
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the formats command
#[derive(Parser, Debug)]
pub struct FormatsArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Parse a lifetime in whole seconds
fn parse_lifetime(s: &str) -> Result<Duration, String> {
    s.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| format!("invalid lifetime '{s}': expected whole seconds"))
}

/// Parse an HTTP date such as "Sun, 06 Nov 1994 08:49:37 GMT"
fn parse_if_modified_since(s: &str) -> Result<SystemTime, String> {
    parse_http_date(s).ok_or_else(|| format!("invalid HTTP date '{s}'"))
}
