//! `recall ask`: answer one question from the command line.

use anyhow::Result;
use std::time::Duration;

use crate::app::Services;
use crate::config::Config;

pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let services = Services::from_config(config).await?;
    let timeout = Duration::from_secs(config.server.request_timeout_secs);

    let answer = tokio::time::timeout(timeout, services.query.answer(question))
        .await
        .map_err(|_| anyhow::anyhow!("query timed out after {}s", timeout.as_secs()))??;

    println!("{}", answer.text);
    if !answer.sources.is_empty() {
        println!();
        println!("Sources:");
        for (i, s) in answer.sources.iter().enumerate() {
            let when = if s.timestamp.is_empty() {
                String::new()
            } else {
                format!(" ({})", s.timestamp)
            };
            println!(
                "  {}. {} in #{}{} ({:.1}% relevant)",
                i + 1,
                s.author,
                s.channel,
                when,
                s.relevance
            );
        }
    }
    Ok(())
}
