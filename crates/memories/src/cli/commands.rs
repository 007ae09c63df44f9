//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Memories - per-event photo and video storage
#[derive(Parser, Debug)]
#[command(name = "memories")]
#[command(about = "Per-event photo and video storage with quotas and signed links", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (skips the layered lookup)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mint a direct-upload URL
    UploadUrl {
        /// Event namespace
        event: String,

        /// File name the upload will be stored under
        name: String,

        /// MIME type of the upload
        mime: String,
    },

    /// Upload a local file
    Upload {
        /// Event namespace
        event: String,

        /// Path to the file
        path: PathBuf,

        /// MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
    },

    /// List an event's files, newest first
    List {
        /// Event namespace
        event: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Show how much of an event's quota is used
    Usage {
        /// Event namespace
        event: String,
    },

    /// Mint a share link for one file
    Share {
        /// Event namespace
        event: String,

        /// Stored file name (as shown by `list`)
        name: String,

        /// Link lifetime in seconds
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Show size and type of one file
    Info {
        /// Event namespace
        event: String,

        /// Stored file name (as shown by `list`)
        name: String,
    },

    /// Delete one file
    Delete {
        /// Event namespace
        event: String,

        /// Stored file name (as shown by `list`)
        name: String,
    },

    /// Delete every file of an event
    Purge {
        /// Event namespace
        event: String,
    },
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from([
            "memories",
            "--verbose",
            "upload",
            "evt1",
            "photos/cake.jpg",
            "--mime",
            "image/jpeg",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Upload { event, path, mime } => {
                assert_eq!(event, "evt1");
                assert_eq!(path, PathBuf::from("photos/cake.jpg"));
                assert_eq!(mime.as_deref(), Some("image/jpeg"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_format() {
        let cli = Cli::try_parse_from(["memories", "list", "evt1", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List {
                format: OutputFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn test_global_flags_after_command() {
        let cli = Cli::try_parse_from([
            "memories",
            "share",
            "evt1",
            "1700000000000-a.jpg",
            "--ttl",
            "60",
            "--config",
            "custom.toml",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(cli.json_logs);
        assert!(matches!(cli.command, Commands::Share { ttl: Some(60), .. }));
    }
}
