//! List, show and delete orders.

use dialoguer::Confirm;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::{CliError, CliResult};
use crate::output;

pub async fn list(ctx: &AppContext, json: bool) -> CliResult<()> {
    let orders = ctx.orchestrator.list_orders().await?;

    if json {
        output::json(&orders)?;
    } else if orders.is_empty() {
        output::info("No orders yet");
    } else {
        println!();
        output::order_table(&orders);
        println!();
    }
    Ok(())
}

pub async fn show(ctx: &AppContext, id: Uuid, json: bool) -> CliResult<()> {
    let order = ctx.orchestrator.get_order(id).await?;
    let challenges = ctx.orchestrator.challenges(id).await?;

    if json {
        output::json(&serde_json::json!({ "order": order, "challenges": challenges }))?;
        return Ok(());
    }

    output::order_details(&order);
    if !challenges.is_empty() {
        output::challenge_list(&challenges);
        println!();
    }
    Ok(())
}

pub async fn delete(ctx: &AppContext, id: Uuid, yes: bool) -> CliResult<()> {
    let order = ctx.orchestrator.get_order(id).await?;

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete order {} for {}?",
                order.id,
                order.domains.join(", ")
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            return Err(CliError::Aborted);
        }
    }

    ctx.orchestrator.delete_order(id).await?;
    output::success(&format!("Deleted order {}", id));
    Ok(())
}
