use std::error::Error;

use chrono::Local;

use crate::api::ConversationSummary;
use crate::cli::Context;
use crate::core::providers::display_name;

pub(crate) fn format_summary(summary: &ConversationSummary) -> String {
    let mut line = match summary.updated_at {
        Some(at) => format!("{}  ", at.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
        None => String::new(),
    };
    line.push_str(&format!("#{}  {}", summary.id, summary.display_title()));
    let details: Vec<String> = [summary.mode.clone(), display_name(&summary.provider)]
        .into_iter()
        .filter(|detail| !detail.is_empty())
        .collect();
    if !details.is_empty() {
        line.push_str(&format!("  [{}]", details.join(" · ")));
    }
    line
}

pub async fn list_history(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let conversations = ctx.client.list_conversations().await?;
    if conversations.is_empty() {
        println!("No saved conversations.");
        return Ok(());
    }

    println!("🗂  Conversations ({})", conversations.len());
    println!();
    for summary in &conversations {
        println!("{}", format_summary(summary));
    }
    Ok(())
}
