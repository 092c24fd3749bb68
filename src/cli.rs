// Command line definition, kept apart from the command implementations

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "figcursor", about = "Builds XCursor themes from vector sprite catalogs", version)]
pub(crate) struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Build a theme from a local directory of SVG components
    Build {
        /// Directory of `cursor=..., variant=..., size=...` SVG files
        #[arg(short, long, value_name = "DIR")]
        source: PathBuf,
        /// Theme settings; defaults apply when omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Build a theme from the sprite components of a Figma file
    #[cfg(feature = "remote")]
    Figma {
        #[arg(long, value_name = "KEY")]
        file_key: String,
        #[arg(long, env = "FIGMA_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Download every export declared in a Figma file
    #[cfg(feature = "remote")]
    Export {
        #[arg(long, value_name = "KEY")]
        file_key: String,
        #[arg(long, env = "FIGMA_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
    },
    /// Print the images stored in an Xcursor file
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Write a theme.toml with default settings
    InitConfig {
        #[arg(value_name = "FILE", default_value = "theme.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct OutputArgs {
    /// Directory receiving one theme directory per variant
    #[arg(short, long, value_name = "DIR", conflicts_with = "install")]
    pub(crate) output: Option<PathBuf>,
    /// Write into ~/.icons
    #[arg(long)]
    pub(crate) install: bool,
    /// Worker threads; 0 uses one per core
    #[arg(short = 'j', long, default_value_t = 0)]
    pub(crate) threads: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_command() {
        let cli = Cli::try_parse_from([
            "figcursor", "build", "--source", "sprites", "--output", "out", "-j", "4", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Build { source, config, output } => {
                assert_eq!(source, PathBuf::from("sprites"));
                assert!(config.is_none());
                assert_eq!(output.output, Some(PathBuf::from("out")));
                assert_eq!(output.threads, 4);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn output_and_install_are_exclusive() {
        let result = Cli::try_parse_from([
            "figcursor", "build", "--source", "s", "--output", "out", "--install",
        ]);
        assert!(result.is_err());
    }
}
