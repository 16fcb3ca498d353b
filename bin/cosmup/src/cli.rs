use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cosmup_deploy::RecipeKind;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "cosmup")]
#[command(
    author,
    version,
    about = "Deploy and wire up CosmWasm contracts from declarative recipes"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "COSMUP_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Cosmup.toml configuration file, or a directory containing one.
    ///
    /// If not provided, ./Cosmup.toml is used when it exists. Every key can be
    /// overridden with a COSMUP_<SECTION>__<KEY> environment variable.
    #[arg(short, long, alias = "conf", env = "COSMUP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a recipe.
    Run {
        /// The recipe to run (see `cosmup list`).
        recipe: RecipeKind,

        /// Simulate the ledger in memory instead of talking to the RPC endpoint.
        #[arg(long, env = "COSMUP_DRY_RUN")]
        dry_run: bool,

        /// Continue from the first step that did not complete in the last saved
        /// report of this recipe.
        #[arg(long)]
        resume: bool,
    },

    /// Print the steps of a recipe as JSON without running it.
    Plan {
        recipe: RecipeKind,
    },

    /// List the available recipes.
    List,

    /// Sanitize a JSON message and print its base64 encoding.
    Encode {
        /// The message, as JSON.
        json: String,
    },

    /// Decode a base64 message and print it as JSON.
    Decode {
        data: String,
    },

    /// Write the default configuration.
    InitConfig {
        /// Destination file. Defaults to ./Cosmup.toml.
        path: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from(["cosmup", "-v", "debug", "run", "presale-vesting", "--dry-run"]);
        assert_eq!(cli.verbosity, LevelFilter::DEBUG);
        match cli.command {
            Command::Run {
                recipe,
                dry_run,
                resume,
            } => {
                assert_eq!(recipe, RecipeKind::PresaleVesting);
                assert!(dry_run);
                assert!(!resume);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_recipe_rejected() {
        assert!(Cli::try_parse_from(["cosmup", "run", "airdrop"]).is_err());
    }
}
