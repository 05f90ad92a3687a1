use std::error::Error;

use crate::cli::{AgentCommands, Context};
use crate::core::agents::{Agent, AgentRoster, RunMode};

pub(crate) fn format_agent(agent: &Agent) -> String {
    let mut flags = Vec::new();
    if !agent.active {
        flags.push("inactive");
    }
    if !agent.parallel {
        flags.push("sequential-only");
    }
    let mut line = format!(
        "{}  {}  {}/{}  t={:.1}",
        agent.id, agent.name, agent.provider, agent.model, agent.temperature
    );
    if !flags.is_empty() {
        line.push_str(&format!("  ({})", flags.join(", ")));
    }
    if !agent.system.trim().is_empty() {
        line.push_str(&format!("\n    system: {}", agent.system.trim()));
    }
    line
}

fn print_roster(roster: &AgentRoster) {
    println!("Agents ({} mode):", roster.mode.as_str());
    if roster.agents.is_empty() {
        println!("  (none)");
    }
    for agent in &roster.agents {
        println!("  {}", format_agent(agent));
    }
}

pub fn run_agents(ctx: &Context, command: AgentCommands) -> Result<(), Box<dyn Error>> {
    match command {
        AgentCommands::List => {
            print_roster(&ctx.config.agents);
            Ok(())
        }
        AgentCommands::Add {
            name,
            provider,
            model,
            system,
            temperature,
        } => {
            let mut added = String::new();
            ctx.save_with(|config| {
                let roster = &mut config.agents;
                let id = roster.add(&name).id.clone();
                roster.update(&id, |agent| {
                    if let Some(provider) = provider {
                        agent.provider = provider;
                    }
                    if let Some(model) = model {
                        agent.model = model;
                    }
                    if let Some(system) = system {
                        agent.system = system;
                    }
                    if let Some(temperature) = temperature {
                        agent.temperature = temperature;
                    }
                });
                added = id;
                Ok(())
            })?;
            println!("✅ Added agent: {added}");
            Ok(())
        }
        AgentCommands::Remove { id } => {
            ctx.save_with(|config| match config.agents.remove(&id) {
                Some(_) => Ok(()),
                None => Err(format!("no agent with id '{id}'").into()),
            })?;
            println!("✅ Removed agent: {id}");
            Ok(())
        }
        AgentCommands::Mode { mode } => {
            let mode = RunMode::parse(&mode)
                .ok_or_else(|| format!("unknown run mode '{mode}' (expected parallel or sequential)"))?;
            ctx.save_with(|config| {
                config.agents.mode = mode;
                Ok(())
            })?;
            println!("✅ Set agent run mode to: {}", mode.as_str());
            Ok(())
        }
    }
}
