use chrono::Utc;
use clap::Subcommand;
use serde_json::{json, Map, Value};

use crate::cli::utils::{entry_detail, entry_row, entry_table_header, output_empty_collection, output_json, output_success};
use crate::cli::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum EntryCommands {
    #[command(about = "List all entries, newest first")]
    List,

    #[command(about = "Show one entry")]
    Show {
        #[arg(help = "Entry ID")]
        id: String,
    },

    #[command(about = "Create an entry")]
    New {
        #[arg(long, help = "Title")]
        title: String,
        #[arg(long, default_value = "", help = "Body text")]
        body: String,
    },

    #[command(about = "Edit an entry you own")]
    Edit {
        #[arg(help = "Entry ID")]
        id: String,
        #[arg(long, help = "New title")]
        title: Option<String>,
        #[arg(long, help = "New body text")]
        body: Option<String>,
    },

    #[command(about = "Delete an entry you own")]
    Delete {
        #[arg(help = "Entry ID")]
        id: String,
    },
}

pub async fn handle(cmd: EntryCommands, ctx: &Context) -> anyhow::Result<()> {
    let (client, _) = ctx.client()?;

    match cmd {
        EntryCommands::List => {
            let entries = client.list_entries().await?;
            let entries = entries.as_array().cloned().unwrap_or_default();

            if entries.is_empty() {
                return output_empty_collection(&ctx.output_format, "entries", "No entries yet");
            }

            match ctx.output_format {
                OutputFormat::Json => output_json(&json!({ "entries": entries })),
                OutputFormat::Text => {
                    let now = Utc::now();
                    println!("{}", entry_table_header());
                    println!("{}", "-".repeat(100));
                    for entry in &entries {
                        println!("{}", entry_row(entry, ctx.locale, now));
                    }
                    Ok(())
                }
            }
        }
        EntryCommands::Show { id } => {
            let entry = client.get_entry(&id).await?;
            match ctx.output_format {
                OutputFormat::Json => output_json(&json!({ "entry": entry })),
                OutputFormat::Text => {
                    print!("{}", entry_detail(&entry, ctx.locale, Utc::now()));
                    Ok(())
                }
            }
        }
        EntryCommands::New { title, body } => {
            let created = client.create_entry(&title, &body).await?;
            let id = created["id"].as_str().unwrap_or_default().to_string();
            output_success(
                &ctx.output_format,
                &format!("Created entry {}", id),
                Some(json!({ "id": id })),
            )
        }
        EntryCommands::Edit { id, title, body } => {
            let patch = edit_patch(title, body)?;
            client.update_entry(&id, &patch).await?;
            output_success(&ctx.output_format, &format!("Updated entry {}", id), Some(json!({ "id": id })))
        }
        EntryCommands::Delete { id } => {
            client.delete_entry(&id).await?;
            output_success(&ctx.output_format, &format!("Deleted entry {}", id), Some(json!({ "id": id })))
        }
    }
}

fn edit_patch(title: Option<String>, body: Option<String>) -> anyhow::Result<Value> {
    let mut patch = Map::new();
    if let Some(title) = title {
        patch.insert("title".into(), Value::String(title));
    }
    if let Some(body) = body {
        patch.insert("body".into(), Value::String(body));
    }
    if patch.is_empty() {
        anyhow::bail!("Nothing to update; pass --title and/or --body");
    }
    Ok(Value::Object(patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_sends_only_given_fields() {
        assert_eq!(edit_patch(Some("t".into()), None).unwrap(), json!({ "title": "t" }));
        assert_eq!(
            edit_patch(Some("t".into()), Some("b".into())).unwrap(),
            json!({ "title": "t", "body": "b" })
        );
        assert!(edit_patch(None, None).is_err());
    }
}
