use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_error, output_json, output_success};
use crate::cli::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Show server information from API root endpoint")]
    Info,

    #[command(about = "Check server health status from API /health endpoint")]
    Health,
}

pub async fn handle(cmd: ServerCommands, ctx: &Context) -> anyhow::Result<()> {
    let (client, _) = ctx.client()?;

    match cmd {
        ServerCommands::Info => {
            let info = client.info().await?;
            match ctx.output_format {
                OutputFormat::Json => output_json(&info),
                OutputFormat::Text => {
                    println!("Server:  {}", client.server());
                    println!("Name:    {}", info["name"].as_str().unwrap_or(""));
                    println!("Version: {}", info["version"].as_str().unwrap_or(""));
                    Ok(())
                }
            }
        }
        ServerCommands::Health => match client.health().await {
            Ok(health) => output_success(
                &ctx.output_format,
                &format!("{} is up", client.server()),
                Some(json!({ "health": health })),
            ),
            Err(e) => {
                output_error(&ctx.output_format, &format!("{} is down: {}", client.server(), e), Some("DOWN"))?;
                std::process::exit(2);
            }
        },
    }
}
