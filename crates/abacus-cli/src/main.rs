use abacus_cli::{Args, logging::init_logging, shell};
use abacus_core::{AutoSaveObserver, Calculator, CalculatorConfig, LoggingObserver};
use anyhow::Context;
use clap::Parser;
use std::env;
use std::io;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let base_dir = match args.base_dir {
        Some(dir) => dir,
        None => env::current_dir().context("cannot determine working directory")?,
    };
    let mut config = CalculatorConfig::load(&base_dir, args.config.as_deref())?;
    config.validate()?;

    init_logging(&config.log_file())?;
    info!(version = env!("CARGO_PKG_VERSION"), base_dir = %base_dir.display(), "Starting calculator");

    let mut calc = Calculator::new(config)?;
    calc.add_observer(Box::new(LoggingObserver));
    calc.add_observer(Box::new(AutoSaveObserver));

    if args.load {
        calc.load_history()?;
    }

    println!("Calculator started. Type 'help' for commands.");
    shell::run(&mut calc, io::stdin().lock(), io::stdout().lock())?;

    info!(records = calc.len(), "Calculator session ended");
    Ok(())
}
