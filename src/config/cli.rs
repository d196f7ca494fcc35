use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "tarot")]
#[command(about = "Draw tarot spreads and manage the local card image cache")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "tarot-config.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON logs instead of the compact console format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Draw a spread and write the card images and reading to a directory
    Draw {
        /// Card pool: all, major or minor
        #[arg(long, default_value = "all")]
        scope: String,

        /// Formation name as listed in the formation table
        #[arg(long)]
        formation: String,

        /// Output directory for card images and reading text
        #[arg(long, default_value = "./reading")]
        out: String,

        /// Override the RNG seed from config
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Download every card image into the cache
    Prime {
        /// Override the number of parallel downloads
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// List the formations available in the catalog
    Formations,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_draw_command() {
        let cli = CliConfig::parse_from([
            "tarot",
            "--config",
            "custom.toml",
            "draw",
            "--scope",
            "major",
            "--formation",
            "圣三角",
            "--seed",
            "7",
        ]);

        assert_eq!(cli.config, "custom.toml");
        match cli.command {
            Command::Draw {
                scope,
                formation,
                out,
                seed,
            } => {
                assert_eq!(scope, "major");
                assert_eq!(formation, "圣三角");
                assert_eq!(out, "./reading");
                assert_eq!(seed, Some(7));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_prime_command() {
        let cli = CliConfig::parse_from(["tarot", "-v", "prime", "--concurrency", "2"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, "tarot-config.toml");
        assert!(matches!(
            cli.command,
            Command::Prime {
                concurrency: Some(2)
            }
        ));
    }
}
