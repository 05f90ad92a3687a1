//! Private server checks and file browsing

use std::error::Error;

use crate::api::FileItem;
use crate::cli::Context;

pub(crate) fn format_item(item: &FileItem) -> String {
    let is_dir = matches!(item.kind.as_str(), "dir" | "directory" | "folder");
    match (is_dir, item.size) {
        (true, _) => format!("📁 {}/", item.name),
        (false, Some(size)) => format!("📄 {} ({size} bytes)", item.name),
        (false, None) => format!("📄 {}", item.name),
    }
}

pub async fn test_connection(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let result = ctx
        .client
        .test_connection(ctx.config.private_server.to_payload())
        .await?;

    let message = result.message.unwrap_or_default();
    if result.ok {
        println!("✅ Connection OK {message}");
        Ok(())
    } else {
        eprintln!("❌ Connection failed {message}");
        for (key, value) in &result.details {
            eprintln!("  {key}: {value}");
        }
        std::process::exit(1);
    }
}

pub async fn list_files(ctx: &Context, path: &str) -> Result<(), Box<dyn Error>> {
    let server = &ctx.config.private_server;
    if !server.enabled {
        eprintln!("❌ The private server connection is disabled");
        eprintln!("💡 Enable it with: flames config set server.enabled on");
        std::process::exit(2);
    }

    let items = ctx.client.list_files(server.to_payload(), path).await?;
    if items.is_empty() {
        println!("(empty)");
    }
    for item in &items {
        println!("{}", format_item(item));
    }
    Ok(())
}
