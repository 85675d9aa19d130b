//! Finalize command - confirm challenges with the CA and download the certificate.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::{CliError, CliResult};
use crate::output;

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]));
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub async fn run(ctx: &AppContext, id: Uuid, skip_check: bool, json: bool) -> CliResult<()> {
    let order = ctx.orchestrator.get_order(id).await?;

    if !order.is_ready() && !skip_check {
        let readiness = ctx.orchestrator.pre_verify_dns(id).await?;
        if !readiness.ready {
            if !json {
                output::check_results(&readiness.results);
            }
            return Err(CliError::NotReady(format!(
                "DNS records for {} are not visible yet; publish them or pass --skip-check",
                id
            )));
        }
    }

    let pb = (!json).then(|| spinner("Waiting for the CA to validate and issue..."));
    let result = ctx.orchestrator.finalize(id).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let order = result?;

    if json {
        output::json(&order)?;
        return Ok(());
    }

    output::success(&format!("Certificate issued for {}", order.domains.join(", ")));
    output::order_details(&order);
    output::info(&format!(
        "Download it with {}",
        format!("certdesk export {} --format zip", order.id).bright_white()
    ));
    Ok(())
}
