use std::path::PathBuf;
use clap::{Parser, Subcommand};
use log::{debug, LevelFilter};
use config::load_config;

mod commands;
mod config;

#[derive(Parser, Debug)]
#[command(name = "spi")]
#[command(about = "A small Pascal interpreter.", version)]
struct Cli {
    /// Path to a TOML config file (defaults to ./spi.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print debug logs on the console.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze and execute a program, then print its global variables.
    Run {
        file: PathBuf,

        /// Log scope entry, exit and symbol tables.
        #[arg(long)]
        scope: bool,

        /// Log the call stack on every procedure entry and exit.
        #[arg(long)]
        stack: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,

        /// Most nested procedure calls allowed (1 to 2048).
        #[arg(long, value_parser = config::parse_call_depth)]
        max_depth: Option<usize>,
    },
    /// Print a program in canonical layout.
    Fmt {
        file: PathBuf,
    },
    /// Evaluate expressions or one-line programs interactively.
    Repl,
}

fn main() {
    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;
    let mut options = config.interpreter.clone();

    if let Commands::Run { scope, stack, max_depth, .. } = &cli.command {
        options.log_scope |= *scope;
        options.log_stack |= *stack;
        if let Some(depth) = max_depth {
            options.max_call_depth = *depth;
        }
    }

    let mut console_level = config.logger.console_filter()?;
    if cli.verbose {
        console_level = console_level.max(LevelFilter::Debug);
    }
    if options.log_scope || options.log_stack {
        console_level = console_level.max(LevelFilter::Info);
    }
    spi_logger::init(config.logger.dir.as_ref(), console_level, config.logger.file_filter()?)?;
    debug!("Effective options: {:?}", options);

    match &cli.command {
        Commands::Run { file, json, .. } => commands::run::run(file, &options, *json),
        Commands::Fmt { file } => commands::fmt::fmt(file),
        Commands::Repl => commands::repl::repl(&options),
    }
}
