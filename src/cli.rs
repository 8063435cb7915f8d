use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::view::StatusFilter;

#[derive(Parser, Debug)]
#[command(name = "lithium-facilities")]
#[command(version, about = "Browse and maintain a directory of lithium battery recycling facilities")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// SQLite database path (defaults to the platform data directory)
    #[arg(long, env = "LITHIUM_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Bearer token enabling write operations
    #[arg(long, env = "LITHIUM_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Base URL of a remote facility directory; reads and writes go there
    #[arg(long, env = "LITHIUM_REMOTE", global = true)]
    pub remote: Option<String>,

    /// HTTP timeout for the remote directory
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Custom snapshot cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Seed the local store from a GeoJSON or JSONL file
    Import {
        /// FeatureCollection, JSON array or JSON Lines file
        file: PathBuf,

        /// Keep existing facilities, overwriting ones with matching ids
        #[arg(short, long)]
        merge: bool,
    },

    /// Replace the local store with the remote directory listing
    Sync {
        /// Do not refresh the offline snapshot
        #[arg(long)]
        no_cache: bool,
    },

    /// List facilities with filter and search applied
    List {
        /// all, operating, construction or planned
        #[arg(short, long, default_value = "all")]
        status: StatusFilter,

        /// Case-insensitive match on name, company or address
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Include hidden rows, flagged as not visible
        #[arg(short, long)]
        all: bool,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one facility with its timeline and documents
    Show { id: String },

    /// Summary cards, status counts and chart series
    Summary,

    /// Map markers as JSON
    Markers {
        /// Scale marker radius by processing capacity
        #[arg(long)]
        sized: bool,
    },

    /// Create a facility from a JSON record or feature
    Create {
        /// File path, or - for stdin
        #[arg(long)]
        json: String,
    },

    /// Apply a partial update, e.g. '{"status":"Operating"}'
    Update {
        id: String,

        /// JSON object of fields to change; null clears a field
        #[arg(long)]
        json: String,
    },

    /// Delete a facility
    Delete { id: String },

    /// Attach a link or stored file to a facility
    DocAdd {
        id: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// http(s) URL for a link document
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        url: Option<String>,

        /// Storage path for a file document
        #[arg(long)]
        file: Option<String>,

        /// File size in bytes
        #[arg(long, requires = "file")]
        size: Option<u64>,
    },

    /// Remove a document from a facility
    DocRm { id: String, doc_id: String },

    /// Interactive terminal browser
    Browse,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_options() {
        let cli = Cli::try_parse_from([
            "lithium-facilities",
            "--db",
            "x.db",
            "list",
            "--status",
            "planned",
            "-q",
            "redw",
        ])
        .unwrap();

        assert_eq!(cli.global.db, Some(PathBuf::from("x.db")));
        assert_eq!(cli.global.timeout_secs, 30);
        match cli.command {
            Commands::List { status, search, .. } => {
                assert_eq!(status, StatusFilter::PlannedOrPilot);
                assert_eq!(search.as_deref(), Some("redw"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_doc_add_requires_target() {
        assert!(Cli::try_parse_from(["lithium-facilities", "doc-add", "a", "--name", "n"]).is_err());
        assert!(Cli::try_parse_from([
            "lithium-facilities", "doc-add", "a", "--name", "n", "--url", "https://x.org", "--file", "p",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["lithium-facilities", "doc-add", "a", "--name", "n", "--file", "p"]).is_ok());
    }

    #[test]
    fn test_bad_status_rejected() {
        assert!(Cli::try_parse_from(["lithium-facilities", "list", "--status", "closed"]).is_err());
    }
}
