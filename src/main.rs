//! Post a message to a Webex room from the command line.
//!
//! The room is looked up by title within a team and created if it doesn't
//! exist yet. Messages are markdown, optionally carrying a card or a file:
//!
//! ```bash
//! webex-notify -T $TOKEN -t "Ops" -r "Deploys" -m "**v1.2.0** is live"
//! make test 2>&1 | webex-notify -T $TOKEN -t "Ops" -r "CI" -i -f report.html
//! webex-notify -T $TOKEN -D someone@example.com -m "Hi"
//! webex-notify -T $TOKEN -d <message id>
//! ```

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

use clap::Parser;
use cli::{Action, Args, Config, Destination};
use dotenvy::dotenv;
use error::Failure;
use tracing::{debug, error};
use webex::{api::WebexClient, message::Recipient};

mod cli;
mod de;
mod error;
mod webex;

/// Application entrypoint. Initialises tracing, reads flags and the
/// environment, and performs a single action, exiting non-zero on failure.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    // Loaded before parsing so that `.env` can supply `WEBEX_TOKEN`.
    let has_dotenv = dotenv().is_ok();
    if !has_dotenv {
        // Routine for a CLI, where the token usually arrives via `-T`.
        debug!("No .env found");
    }

    let args = Args::parse();

    let res = match args.into_config(std::io::stdin().lock()) {
        Ok(config) => run(config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = res {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// Carry out the configured action. Deleting never touches rooms; sending to a
/// room resolves it first.
async fn run(config: Config) -> Result<(), Failure> {
    let client = WebexClient::new(&config.api_base, config.token, config.proxy.as_ref())?;

    match config.action {
        Action::Delete(id) => client.delete_message(&id).await?,
        Action::Send { destination, draft } => {
            let to = match destination {
                Destination::Room { team, room } => {
                    Recipient::Room(client.resolve_room(&team, &room).await?)
                }
                Destination::Person(email) => Recipient::Person(email),
            };

            client.send_message(&to, &draft).await?;
        }
    }

    Ok(())
}
