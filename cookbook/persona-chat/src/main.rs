use std::path::PathBuf;

use clap::Parser;
use parlai_client::{init_tracing, with_client, ClientError, Result, Settings};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Chat with a ParlAI websocket server from the terminal.
#[derive(Debug, Parser)]
#[command(name = "persona-chat")]
struct Args {
    /// TOML settings file. Defaults plus PARLAI_* variables are used without one.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address, overriding the settings.
    #[arg(long)]
    host: Option<String>,

    /// Prime the bot with a persona picked from the catalogue.
    #[arg(long)]
    random_persona: bool,

    /// One persona trait; repeat the flag for several.
    #[arg(long = "persona")]
    personas: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => Settings::from_env_or_file(path)?,
        None => Settings::from_env(),
    };
    if let Some(host) = &args.host {
        settings.client.host = host.clone();
    }
    init_tracing(&settings.logging)?;
    let catalog = settings.persona_catalog();

    info!(endpoint = %settings.client.endpoint(), "starting chat");
    with_client(settings.client, move |client| {
        Box::pin(async move {
            let greeting = if !args.personas.is_empty() {
                Some(client.set_personas(&args.personas).await?)
            } else if args.random_persona {
                match &catalog {
                    Some(catalog) => {
                        let traits = catalog.pick_random()?.traits().to_vec();
                        Some(client.set_personas(&traits).await?)
                    }
                    None => Some(client.set_random_persona().await?),
                }
            } else {
                None
            };
            if let Some(greeting) = greeting {
                println!("{greeting}");
            }

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "/quit" {
                    break;
                }
                match client.ask(line).await {
                    Ok(reply) => println!("{reply}"),
                    Err(err) => warn!(error = %err, "no reply, the turn stays in the transcript"),
                }
            }
            Ok::<_, ClientError>(())
        })
    })
    .await
}
