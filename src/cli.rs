//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "weave")]
#[command(version, about = "Incremental static-site build engine", long_about = None)]
pub struct Cli {
    /// Control colored output
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the site once and exit
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        args: BuildArgs,
    },

    /// Build the site, then watch for changes and re-render incrementally
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        args: BuildArgs,
    },
}

/// Arguments shared by `build` and `watch`.
#[derive(Parser, Clone)]
pub struct BuildArgs {
    /// Project root (must contain `content/` and `theme/`)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Production build (minified output)
    #[arg(short = 'p', long)]
    pub production: bool,

    /// Verbose output
    #[arg(short = 'V', long)]
    pub verbose: bool,
}
