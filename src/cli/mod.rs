//! Command-line surface over [`LibraryStorage`](mw_app::LibraryStorage).

mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub use run::run;

#[derive(Debug, Parser)]
#[command(name = "midweave")]
#[command(about = "Curate a Midjourney style reference library", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Admin password, required by commands that change the library
    #[arg(short, long, global = true)]
    pub password: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List cached entries, most recently modified first
    List {
        /// Only featured entries
        #[arg(short, long)]
        featured: bool,
    },
    /// Search entries by any text field
    Search { query: String },
    /// Show one entry
    Show { id: String },
    /// Create an entry from local image files
    Save(SaveArgs),
    /// Edit an existing entry
    Update(UpdateArgs),
    /// Delete entries and their images
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Rebuild the cache from the remote store
    Resync,
    /// Drop the cache and rebuild it from scratch
    ForceResync,
    /// Run image analysis without saving anything
    Analyze {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Write the cache contents as JSON
    Export {
        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Replace the cache contents from an export
    Import { file: PathBuf },
    /// Check the admin password
    Login,
}

#[derive(Debug, Args)]
pub struct SaveArgs {
    #[arg(short, long)]
    pub title: String,

    /// Style reference code
    #[arg(short, long)]
    pub sref: String,

    #[arg(long, default_value = "")]
    pub prompt: String,

    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Image file to upload (repeatable)
    #[arg(short, long = "image", required = true)]
    pub images: Vec<PathBuf>,

    #[arg(short, long)]
    pub featured: bool,

    #[arg(long, default_value = "")]
    pub notes: String,

    /// Caption the first image before saving
    #[arg(long)]
    pub analyze: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub id: String,

    #[arg(short, long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(short, long)]
    pub sref: Option<String>,

    #[arg(long)]
    pub prompt: Option<String>,

    /// Replace the images with these files (repeatable)
    #[arg(short, long = "image")]
    pub images: Vec<PathBuf>,

    #[arg(short, long)]
    pub featured: Option<bool>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_save_with_repeated_images() {
        let cli = Cli::try_parse_from([
            "midweave",
            "--password",
            "hunter2",
            "save",
            "--title",
            "Koi",
            "--sref",
            "2811",
            "--image",
            "a.png",
            "--image",
            "b.png",
        ])
        .expect("save should parse");

        assert_eq!(cli.password.as_deref(), Some("hunter2"));
        match cli.command {
            Commands::Save(args) => {
                assert_eq!(args.title, "Koi");
                assert_eq!(args.images.len(), 2);
                assert!(!args.analyze);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_save_requires_an_image() {
        let result = Cli::try_parse_from(["midweave", "save", "--title", "Koi", "--sref", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_featured_takes_a_value() {
        let cli = Cli::try_parse_from(["midweave", "update", "7", "--featured", "false"])
            .expect("update should parse");
        match cli.command {
            Commands::Update(args) => {
                assert_eq!(args.id, "7");
                assert_eq!(args.featured, Some(false));
                assert!(args.images.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
