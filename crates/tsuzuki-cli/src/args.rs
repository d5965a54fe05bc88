use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Download new episodes of the anime on your AniList watching list.
#[derive(Parser, Debug)]
#[command(name = "tsuzuki", version)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll the watching list until interrupted
    Run,
    /// Run a single cycle and print what happened
    Check,
    /// Show tracked series
    List,
    /// Change how a series is searched
    Edit(EditArgs),
    /// Drop a series and its download history
    Forget {
        /// AniList media id
        media_id: u64,
    },
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// AniList media id
    pub media_id: u64,

    /// Offset added to episode numbers when searching
    #[arg(long, value_name = "N")]
    pub starting_episode: Option<u32>,

    /// Title to search instead of the AniList one
    #[arg(long, value_name = "TITLE", conflicts_with = "clear_alt_title")]
    pub alt_title: Option<String>,

    /// Go back to searching the AniList title
    #[arg(long)]
    pub clear_alt_title: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_edit_flags() {
        let cli = Cli::parse_from([
            "tsuzuki",
            "edit",
            "154587",
            "--starting-episode",
            "12",
            "--alt-title",
            "Frieren S2",
        ]);
        match cli.command {
            Command::Edit(args) => {
                assert_eq!(args.media_id, 154587);
                assert_eq!(args.starting_episode, Some(12));
                assert_eq!(args.alt_title.as_deref(), Some("Frieren S2"));
                assert!(!args.clear_alt_title);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_alt_title_conflicts_with_clear() {
        let result = Cli::try_parse_from([
            "tsuzuki",
            "edit",
            "1",
            "--alt-title",
            "x",
            "--clear-alt-title",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tsuzuki", "check", "-v", "--config", "/tmp/c.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
