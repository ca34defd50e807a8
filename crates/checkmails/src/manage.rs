//! Mailbox management subcommands.

use std::io::Read;

use anyhow::{Context, Result, bail};
use checkmails_core::{
    CredentialStore, JsonSettingsStore, KeyringCredentialStore, MailboxCredentials, MailboxList,
    SettingsStore,
};

/// Stores the credentials of a mailbox and activates it.
///
/// The password is read from stdin.
pub fn add(name: &str, server: &str, login: &str, folder: &str) -> Result<()> {
    if !MailboxList::is_valid_name(name) {
        bail!("Invalid mailbox name '{name}': it must not be blank or contain a comma");
    }

    let password = read_password_from_stdin()?;
    let credentials = MailboxCredentials::new(server, login, password, folder);
    credentials
        .validate()
        .with_context(|| format!("Invalid settings for mailbox '{name}'"))?;

    KeyringCredentialStore::default()
        .save(name, &credentials)
        .context("Failed to store credentials in keyring")?;

    let store = JsonSettingsStore::at_default_path()?;
    let mut settings = store.load()?;
    settings.activate(name);
    store.save(&settings)?;

    println!("Added mailbox '{name}' ({login} on {server}, folder {folder})");
    println!("Send `reload` to a running checkmails to pick it up");
    Ok(())
}

/// Deletes the credentials of a mailbox and forgets it.
pub fn remove(name: &str) -> Result<()> {
    let store = JsonSettingsStore::at_default_path()?;
    let mut settings = store.load()?;
    if !settings.active.contains(name) && !settings.inactive.contains(name) {
        bail!("No mailbox named '{name}'");
    }

    KeyringCredentialStore::default()
        .delete(name)
        .context("Failed to delete credentials from keyring")?;
    settings.forget(name);
    store.save(&settings)?;

    println!("Removed mailbox '{name}'");
    Ok(())
}

/// Prints the active and inactive mailboxes.
pub fn list() -> Result<()> {
    let store = JsonSettingsStore::at_default_path()?;
    let settings = store.load()?;

    println!("Settings: {}", store.path().display());
    println!("Active:   {}", display_list(&settings.active));
    println!("Inactive: {}", display_list(&settings.inactive));
    Ok(())
}

fn display_list(list: &MailboxList) -> String {
    if list.is_empty() {
        "(none)".to_string()
    } else {
        list.to_string()
    }
}

/// Reads a password from stdin, trimming trailing newlines.
fn read_password_from_stdin() -> Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read password from stdin")?;

    let password = input.trim_end_matches(['\n', '\r']).to_string();
    if password.is_empty() {
        bail!("No password provided on stdin");
    }

    Ok(password)
}
