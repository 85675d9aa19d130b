//! Order command - create an order and print the records to publish.

use certdesk_crypto::KeyType;
use certdesk_issuer::{CreateOrderRequest, IssuerError, render_txt_template};
use colored::Colorize;

use crate::context::AppContext;
use crate::error::CliResult;
use crate::output;

pub async fn run(
    ctx: &AppContext,
    email: &str,
    domains: &[String],
    key_type: KeyType,
    key_size: u32,
    json: bool,
) -> CliResult<()> {
    let request = CreateOrderRequest::new(email, domains).with_key(key_type, key_size);

    let created = match ctx.orchestrator.create_order(request).await {
        Ok(created) => created,
        Err(IssuerError::OrderIncomplete { order_id, source }) => {
            let challenges = ctx.orchestrator.challenges(order_id).await.unwrap_or_default();
            output::warn(&format!("Order {} was only partly created", order_id));
            if !challenges.is_empty() {
                output::challenge_list(&challenges);
            }
            println!(
                "\n  {} {}",
                "Remove it with:".dimmed(),
                format!("certdesk delete {}", order_id).bright_white()
            );
            return Err(IssuerError::OrderIncomplete { order_id, source }.into());
        }
        Err(err) => return Err(err.into()),
    };

    if json {
        output::json(&created)?;
        return Ok(());
    }

    output::success(&format!("Order {} created", created.order.id));
    println!();
    print!("{}", render_txt_template(&created.challenges));
    println!();
    output::info(&format!(
        "Publish the records, then run {}",
        format!("certdesk check {}", created.order.id).bright_white()
    ));
    Ok(())
}
