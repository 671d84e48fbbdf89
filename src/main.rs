//! Keysift CLI: search a password list against an encrypted SQLCipher database.

use anyhow::Result;
use clap::Parser;
use keysift::engine::arg_parser::Cli;
use keysift::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
