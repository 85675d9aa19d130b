//! Keygen command - print a fresh master key.

use colored::Colorize;

use crate::error::CliResult;
use crate::output;

pub fn run(json: bool) -> CliResult<()> {
    let key = certdesk_crypto::generate_master_key()?;

    if json {
        output::json(&serde_json::json!({ "master_key": key }))?;
        return Ok(());
    }

    println!();
    println!("  {}", key.bright_white().bold());
    println!();
    output::info("Store it outside the data directory, for example:");
    println!("      export CERTDESK_ENCRYPTION_MASTER_KEY={}", key);
    output::warn("Keys encrypted under a lost master key cannot be recovered");
    Ok(())
}
