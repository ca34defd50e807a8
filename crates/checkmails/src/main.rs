//! checkmails: watches IMAP mailboxes and notifies unread mail.
//!
//! Without arguments the checker runs in the foreground, reading menu
//! commands from the console. The `add`, `remove` and `list` subcommands
//! manage the configured mailboxes.

mod console;
mod desktop;
mod manage;

use anyhow::{Context, Result, bail};
use checkmails_core::{
    Collaborators, Controller, ImapConnector, JsonSettingsStore, KeyringCredentialStore, TcpProbe,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::console::{Console, ConsoleTray};
use crate::desktop::DesktopNotifier;

const USAGE: &str = "\
Usage:
  checkmails                                      run the checker
  checkmails add <name> <server[:port]> <login> [folder]
                                                  add a mailbox, password on stdin
  checkmails remove <name>                        remove a mailbox
  checkmails list                                 list the mailboxes";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "checkmails=info,checkmails_core=info,checkmails_imap=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        [] => run().await,
        ["add", name, server, login] => manage::add(name, server, login, "INBOX"),
        ["add", name, server, login, folder] => manage::add(name, server, login, folder),
        ["remove", name] => manage::remove(name),
        ["list"] => manage::list(),
        ["help" | "-h" | "--help"] => {
            println!("{USAGE}");
            Ok(())
        }
        _ => bail!("{USAGE}"),
    }
}

async fn run() -> Result<()> {
    let settings = JsonSettingsStore::at_default_path().context("cannot locate the settings file")?;
    info!(path = %settings.path().display(), "starting checkmails");

    let console = Console::new();
    let (controller, handle) = Controller::new(Collaborators {
        connector: ImapConnector::new(),
        probe: TcpProbe::default(),
        prompt: console.prompt(),
        sink: Box::new(DesktopNotifier::default()),
        tray: Box::new(ConsoleTray::default()),
        settings: Box::new(settings),
        credentials: Box::new(KeyringCredentialStore::default()),
    });

    console.spawn_input(handle.clone());

    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            interrupt.quit();
        }
    });

    controller.run().await;
    Ok(())
}
