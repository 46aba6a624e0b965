mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    activity, apply, init, inspect, validate, ActivityArgs, ApplyArgs, InitArgs, InspectArgs,
    ValidateArgs,
};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Quire CLI - work on exported stories from the terminal
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Quire project with a starter story
    Init(InitArgs),

    /// Check an exported story against the story schema
    Validate(ValidateArgs),

    /// Print an overview of a story
    Inspect(InspectArgs),

    /// Dispatch a list of commands against a story
    Apply(ApplyArgs),

    /// Show who is working on what
    Activity(ActivityArgs),
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()
        .map_err(|err| anyhow::anyhow!("Cannot get current directory: {}", err))?
        .display()
        .to_string();

    let config = Config::load(&cwd)?;
    init_logging(&config);

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Validate(args) => validate(args, &cwd),
        Command::Inspect(args) => inspect(args, &cwd),
        Command::Apply(args) => apply(args, &cwd),
        Command::Activity(args) => activity(args, &cwd),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
