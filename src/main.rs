mod cli;
mod engine;
mod index;
mod logger;
mod markdown;
mod provider;
mod render;
mod scheduler;
mod site;
mod state;
mod tree;
mod utils;

use clap::{ColorChoice, Parser};
use cli::{BuildArgs, Cli, Commands};
use engine::Engine;

fn main() {
    if let Err(e) = run() {
        log!("error"; "{e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    state::setup_shutdown_handler()?;
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }

    match cli.command {
        Commands::Build { args } => run_build(&args),
        Commands::Watch { args } => run_watch(&args),
    }
}

fn run_build(args: &BuildArgs) -> anyhow::Result<()> {
    logger::set_verbose(args.verbose);
    let mut engine = Engine::new(&args.path, args.production)?;
    engine.build()
}

fn run_watch(args: &BuildArgs) -> anyhow::Result<()> {
    logger::set_verbose(args.verbose);
    let mut engine = Engine::new(&args.path, args.production)?;
    engine.build()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(engine.watch())
}
