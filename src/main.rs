// src/main.rs

// lazy_lambda
// Evaluates one lambda-calculus expression under call-by-name and prints its normal form.

use clap::Parser as ClapParser;
use tracing::Level;

use lazy_lambda::{interpret_with, EvalConfig};

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The expression to evaluate, e.g. "(\x.x + 1) 2".
    expression: String,

    /// Fail after this many reduction steps instead of running forever.
    #[arg(long)]
    max_steps: Option<u64>,

    /// Limit on nested evaluation of operands, conditions and list elements.
    #[arg(long, default_value_t = 10_000)]
    max_depth: usize,

    /// Raise log verbosity (-v debug, -vv trace). Logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    let mut config = EvalConfig::default().with_max_depth(cli.max_depth);
    if let Some(limit) = cli.max_steps {
        config = config.with_max_steps(limit);
    }

    match interpret_with(&cli.expression, &config) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
