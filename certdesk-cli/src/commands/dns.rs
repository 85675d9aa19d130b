//! Challenges and check commands.

use colored::Colorize;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::{CliError, CliResult};
use crate::output;

/// Print the TXT records of an order, as a list or zone-file lines.
pub async fn challenges(ctx: &AppContext, id: Uuid, zone: bool, json: bool) -> CliResult<()> {
    if zone {
        print!("{}", ctx.orchestrator.txt_template(id).await?);
        return Ok(());
    }

    let challenges = ctx.orchestrator.challenges(id).await?;
    if json {
        output::json(&challenges)?;
    } else if challenges.is_empty() {
        output::warn("This order has no challenges");
    } else {
        println!();
        output::challenge_list(&challenges);
        println!();
    }
    Ok(())
}

/// Look the records up and report which are visible.
pub async fn check(ctx: &AppContext, id: Uuid, json: bool) -> CliResult<()> {
    let readiness = ctx.orchestrator.pre_verify_dns(id).await?;

    if json {
        output::json(&readiness)?;
    } else {
        println!();
        output::check_results(&readiness.results);
        println!();
    }

    if readiness.ready {
        if !json {
            output::info(&format!(
                "All records are visible, run {}",
                format!("certdesk finalize {}", id).bright_white()
            ));
        }
        Ok(())
    } else if readiness.results.is_empty() {
        Err(CliError::NotReady(format!("order {} has no challenges", id)))
    } else {
        let missing = readiness.results.iter().filter(|r| !r.matched).count();
        Err(CliError::NotReady(format!(
            "{} of {} records are not visible yet",
            missing,
            readiness.results.len()
        )))
    }
}
