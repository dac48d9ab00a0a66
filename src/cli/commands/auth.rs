use std::io::{self, BufRead, Write};

use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::config::{save_session, SessionConfig};
use crate::cli::utils::{output_json, output_success};
use crate::cli::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Create an account and log in")]
    Register {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Display name")]
        name: Option<String>,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Login to server")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout from server")]
    Logout,

    #[command(about = "Show current user information")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, ctx: &Context) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Register { email, name, password } => {
            let password = password_or_prompt(password)?;
            let (client, _) = ctx.client()?;
            let session = client
                .register(&email, &password, name.as_deref().unwrap_or(""))
                .await?;
            remember(&client.server().to_string(), &email, &session)?;

            output_success(
                &ctx.output_format,
                &format!("Registered and logged in as {}", user_label(&session)),
                Some(json!({ "user": session["user"] })),
            )
        }
        AuthCommands::Login { email, password } => {
            let password = password_or_prompt(password)?;
            let (client, _) = ctx.client()?;
            let session = client.login(&email, &password).await?;
            remember(&client.server().to_string(), &email, &session)?;

            output_success(
                &ctx.output_format,
                &format!("Logged in as {}", user_label(&session)),
                Some(json!({ "user": session["user"] })),
            )
        }
        AuthCommands::Logout => {
            let (client, session) = ctx.client()?;
            if session.token.is_some() {
                // The token is dropped locally even if the server is unreachable
                if let Err(e) = client.logout().await {
                    tracing::warn!("Server logout failed: {}", e);
                }
            }
            save_session(&session.signed_out())?;
            output_success(&ctx.output_format, "Logged out", None)
        }
        AuthCommands::Whoami => {
            let (client, _) = ctx.client()?;
            let user = client.whoami().await?;

            match ctx.output_format {
                OutputFormat::Json => output_json(&json!({ "user": user })),
                OutputFormat::Text => {
                    println!("{}", user["label"].as_str().unwrap_or(""));
                    println!("Email: {}", user["email"].as_str().unwrap_or(""));
                    println!("ID:    {}", user["id"].as_str().unwrap_or(""));
                    Ok(())
                }
            }
        }
    }
}

fn remember(server: &str, email: &str, session: &Value) -> anyhow::Result<()> {
    let token = session["token"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Server response did not include a token"))?;
    save_session(&SessionConfig::signed_in(server.to_string(), token.to_string(), email.to_string()))
}

fn user_label(session: &Value) -> &str {
    session["user"]["label"].as_str().unwrap_or("unknown user")
}

fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
