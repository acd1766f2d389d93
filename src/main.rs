// src/main.rs

use std::error::Error as _;

use lhpci::errors::{LhpciError, Result};
use lhpci::{cli, logging, run};

const STDOUT_DUMP_LIMIT: usize = 4000;

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        report(&err);
        std::process::exit(1);
    }
}

async fn run_main() -> Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}

fn report(err: &LhpciError) {
    eprintln!("lhpci error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }

    if let Some((stdout, stderr)) = err.captured_output() {
        if !stdout.is_empty() {
            let truncated: String = stdout.chars().take(STDOUT_DUMP_LIMIT).collect();
            eprintln!("\n{truncated}");
        }
        if !stderr.is_empty() {
            eprintln!("\n{stderr}");
        }
    }
}
