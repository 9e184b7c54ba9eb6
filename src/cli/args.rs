//! CLI argument definitions using clap derive

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// packwright - buildpack layer lifecycle engine
///
/// Detects which toolchains an application needs and builds cached,
/// environment-scoped layers for them.
#[derive(Parser, Debug)]
#[command(name = "packwright")]
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
    #[arg(short, long, global = true, env = "PACKWRIGHT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run detect and print each buildpack's decision
    Detect(DetectArgs),

    /// Run the full detect and build lifecycle
    Build(BuildArgs),

    /// Show the behavior selected for a tool version
    Select(SelectArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Options shared by detect and build
#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    /// Application directory
    #[arg(default_value = ".")]
    pub app: PathBuf,

    /// Force a runtime; buildpacks for other runtimes opt out
    #[arg(long, env = "PACKWRIGHT_RUNTIME")]
    pub runtime: Option<String>,

    /// Stack id of the build image
    #[arg(long, env = "PACKWRIGHT_STACK_ID")]
    pub stack_id: Option<String>,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub detect: DetectArgs,

    /// Layers directory (defaults to <app>/.packwright/layers)
    #[arg(short, long)]
    pub layers: Option<PathBuf>,

    /// Keep development tooling available at launch (`--dev-mode=false` turns
    /// off a config file default)
    #[arg(
        long,
        env = "PACKWRIGHT_DEVMODE",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub dev_mode: Option<bool>,

    /// Print the resulting launch environment
    #[arg(long)]
    pub print_env: bool,
}

/// Arguments for the select command
#[derive(Parser, Debug)]
pub struct SelectArgs {
    #[command(subcommand)]
    pub tool: SelectTool,
}

#[derive(Subcommand, Debug)]
pub enum SelectTool {
    /// npm install command and prune support
    Npm {
        /// Discovered npm version, e.g. 8.3.1
        #[arg(value_name = "VERSION")]
        npm_version: String,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

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
