//! Model listing functionality
//!
//! Asks the backend which models the configured provider offers. When the
//! configured model is no longer offered, the first listed one is selected
//! and saved.

use std::error::Error;

use crate::api::ModelsRequest;
use crate::cli::Context;
use crate::core::providers::{display_name, select_model};

pub async fn list_models(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let settings = &ctx.config.provider;
    let request = ModelsRequest {
        provider: settings.provider.clone(),
        base_url: settings.base_url.clone(),
        api_key: settings.api_key.clone(),
    };

    println!("🤖 Available Models for {}", display_name(&settings.provider));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    let models = ctx.client.list_models(&request).await?;
    if models.is_empty() {
        println!("No models found for this provider.");
        return Ok(());
    }

    let selected = select_model(&settings.model, &models);
    let current = selected.as_deref().unwrap_or(settings.model.as_str());

    println!("Found {} models:", models.len());
    println!();
    for model in &models {
        let marker = if model.id == current { "*" } else { " " };
        match model.name.as_deref().filter(|name| *name != model.id) {
            Some(name) => println!("{marker} {} ({name})", model.id),
            None => println!("{marker} {}", model.id),
        }
    }
    println!();

    if let Some(model) = selected {
        let provider = settings.provider.clone();
        ctx.save_with(|config| {
            if config.provider.provider == provider {
                config.set_value("model", &model)?;
            }
            Ok(())
        })?;
        println!(
            "⚠️  {} is not offered by this provider; selected {model}",
            settings.model
        );
    } else {
        println!("* = current model");
    }
    Ok(())
}
