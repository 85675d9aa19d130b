//! Terminal output helpers.

use certdesk_dns::DnsCheckResult;
use certdesk_issuer::{CertificateOrder, CertificateStatus, ChallengeState, DnsChallenge};
use colored::{ColoredString, Colorize};
use serde::Serialize;

pub fn success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn warn(msg: &str) {
    println!("  {} {}", "⚠".yellow().bold(), msg.yellow());
}

pub fn info(msg: &str) {
    println!("  {} {}", "→".cyan(), msg);
}

pub fn error(msg: &str) {
    eprintln!("  {} {}", "✗".red().bold(), msg.red());
}

pub fn json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status(status: CertificateStatus) -> ColoredString {
    match status {
        CertificateStatus::Pending => status.as_str().yellow(),
        CertificateStatus::Ready => status.as_str().green().bold(),
        CertificateStatus::Failed => status.as_str().red().bold(),
    }
}

fn challenge_status(state: ChallengeState) -> ColoredString {
    match state {
        ChallengeState::Pending => state.to_string().yellow(),
        ChallengeState::Verified => state.to_string().green(),
        ChallengeState::Failed => state.to_string().red(),
    }
}

fn date(value: Option<chrono::DateTime<chrono::Utc>>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One line per order, newest first.
pub fn order_table(orders: &[CertificateOrder]) {
    println!(
        "  {:<36}  {:<8}  {:<10}  {}",
        "ID".bright_white().bold(),
        "STATUS".bright_white().bold(),
        "EXPIRES".bright_white().bold(),
        "DOMAINS".bright_white().bold()
    );
    for order in orders {
        let expires = order
            .expires_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<36}  {:<8}  {:<10}  {}",
            order.id,
            status(order.status),
            expires,
            order.domains.join(", ")
        );
    }
}

pub fn order_details(order: &CertificateOrder) {
    let field = |name: &str, value: &str| {
        println!("  {:<12} {}", format!("{}:", name).bright_white().bold(), value);
    };

    println!();
    field("Order", &order.id.to_string());
    println!(
        "  {:<12} {}",
        "Status:".bright_white().bold(),
        status(order.status)
    );
    field("Email", &order.email);
    field("Domains", &order.domains.join(", "));
    field("Key", &format!("{} {}", order.key_type, order.key_size));
    field("Created", &date(Some(order.created_at)));
    if order.is_ready() {
        field("Issued", &date(order.issued_at));
        field("Expires", &date(order.expires_at));
        field("Serial", order.serial.as_deref().unwrap_or("-"));
        field("SHA-256", order.fingerprint.as_deref().unwrap_or("-"));
    }
    if let Some(message) = &order.error_message {
        println!("  {:<12} {}", "Error:".bright_white().bold(), message.red());
    }
    println!();
}

pub fn challenge_list(challenges: &[DnsChallenge]) {
    for challenge in challenges {
        let checked = match (challenge.dns_checked_at, challenge.dns_check_ok) {
            (None, _) => "not checked".dimmed(),
            (Some(_), true) => "visible".green(),
            (Some(_), false) => "not visible".yellow(),
        };
        println!(
            "  {} {} [{}, dns {}]",
            "•".cyan(),
            challenge.domain.bright_white().bold(),
            challenge_status(challenge.status),
            checked
        );
        println!("      {} {}", "name: ".dimmed(), challenge.txt_host);
        println!("      {} {}", "value:".dimmed(), challenge.txt_value.cyan());
    }
}

pub fn check_results(results: &[DnsCheckResult]) {
    for result in results {
        if result.matched {
            success(&format!("{} ({})", result.domain, result.txt_host));
            continue;
        }

        warn(&format!("{} ({})", result.domain, result.txt_host));
        println!("      {} {}", "expected:".dimmed(), result.expected_value);
        if result.found_values.is_empty() {
            println!("      {} {}", "found:   ".dimmed(), "nothing".dimmed());
        }
        for value in &result.found_values {
            println!("      {} {}", "found:   ".dimmed(), value);
        }
        if let Some(err) = &result.error {
            println!("      {} {}", "error:   ".dimmed(), err.red());
        }
    }
}
