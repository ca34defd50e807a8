//! Console front end: menu commands and login prompts on stdin.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use checkmails_core::{
    AuthDecision, AuthPrompt, ControlCommand, ControlHandle, MailboxCredentials, MenuItem,
    TrayIcon,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Where console lines go while a prompt is waiting for answers.
type Pending = Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>;

/// Routes console lines to the controller, or to the pending prompt.
#[derive(Debug, Clone, Default)]
pub struct Console {
    pending: Pending,
    closed: Arc<AtomicBool>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompt answered from this console.
    pub fn prompt(&self) -> ConsolePrompt {
        ConsolePrompt {
            pending: Arc::clone(&self.pending),
            closed: Arc::clone(&self.closed),
        }
    }

    /// Marks the input as gone and ends the pending prompt, if any.
    fn close_input(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Ok(mut pending) = self.pending.lock() {
            pending.take();
        }
    }

    /// Reads stdin on a plain thread until EOF.
    ///
    /// The thread is never joined: a read blocked on the terminal must not
    /// hold the process open after quit.
    pub fn spawn_input(&self, handle: ControlHandle) {
        let console = self.clone();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };

                let answer_to = console.pending.lock().ok().and_then(|p| p.clone());
                if let Some(tx) = answer_to {
                    let _ = tx.send(line);
                    continue;
                }

                match parse_command(&line) {
                    Some(command) => {
                        if !handle.send(command) {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!(%line, "unknown command"),
                }
            }
            console.close_input();
            debug!("console input closed");
        });
    }
}

/// Maps a console line to a menu command.
fn parse_command(line: &str) -> Option<ControlCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "details" => Some(ControlCommand::ShowDetails),
        "check" => Some(ControlCommand::CheckNow),
        "reconnect" => Some(ControlCommand::Reconnect),
        "suspend" | "restart" => Some(ControlCommand::ToggleSuspend),
        "reload" => Some(ControlCommand::Reload),
        "quit" | "exit" => Some(ControlCommand::Quit),
        _ => None,
    }
}

/// Console word of a menu item.
const fn command_word(item: MenuItem) -> &'static str {
    match item {
        MenuItem::Details => "details",
        MenuItem::Check => "check",
        MenuItem::Reconnect => "reconnect",
        MenuItem::Suspend => "suspend",
        MenuItem::Reload => "reload",
        MenuItem::Quit => "quit",
    }
}

/// Asks on the console what to do with a rejected login.
#[derive(Debug, Clone)]
pub struct ConsolePrompt {
    pending: Pending,
    closed: Arc<AtomicBool>,
}

impl ConsolePrompt {
    fn open(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(tx);
        }
        rx
    }

    fn close(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = None;
        }
    }
}

impl AuthPrompt for ConsolePrompt {
    async fn resolve(&self, mailbox: &str, current: &MailboxCredentials) -> AuthDecision {
        let mut answers = self.open();
        // Checked after open: a reader closing later drops the new sender.
        if self.closed.load(Ordering::SeqCst) {
            self.close();
            warn!(%mailbox, "console input closed, deactivating the mailbox");
            return AuthDecision::Deactivate;
        }
        let decision = ask(mailbox, current, &mut answers).await;
        self.close();
        decision
    }
}

/// Runs the dialog over a stream of answer lines.
///
/// A closed stream deactivates the mailbox.
async fn ask(
    mailbox: &str,
    current: &MailboxCredentials,
    answers: &mut mpsc::UnboundedReceiver<String>,
) -> AuthDecision {
    println!(
        "Incorrect login or password for {mailbox} ({} on {}).",
        current.login, current.server
    );

    loop {
        println!("[d]eactivate the mailbox or [c]orrect the login and password?");
        let Some(choice) = answers.recv().await else {
            return AuthDecision::Deactivate;
        };
        match choice.trim() {
            "d" | "D" => return AuthDecision::Deactivate,
            "c" | "C" => break,
            _ => {}
        }
    }

    println!("Login [{}]:", current.login);
    let Some(login) = answers.recv().await else {
        return AuthDecision::Deactivate;
    };
    println!("Password:");
    let Some(password) = answers.recv().await else {
        return AuthDecision::Deactivate;
    };

    let login = match login.trim() {
        "" => current.login.clone(),
        login => login.to_string(),
    };
    AuthDecision::Correct(MailboxCredentials {
        login,
        password: password.trim_end_matches(['\r', '\n']).to_string(),
        ..current.clone()
    })
}

/// Tray stand-in that logs menu and tooltip changes.
#[derive(Debug, Default)]
pub struct ConsoleTray {
    items: Vec<(MenuItem, String, bool)>,
}

impl ConsoleTray {
    fn entry(&mut self, item: MenuItem) -> Option<&mut (MenuItem, String, bool)> {
        self.items.iter_mut().find(|(i, _, _)| *i == item)
    }

    fn show_menu(&self) {
        let menu: Vec<String> = self
            .items
            .iter()
            .filter(|(_, _, enabled)| *enabled)
            .map(|(item, label, _)| format!("{} ({label})", command_word(*item)))
            .collect();
        info!(menu = %menu.join(", "), "commands");
    }
}

impl TrayIcon for ConsoleTray {
    fn add_menu_item(&mut self, item: MenuItem) {
        self.items.push((item, item.label().to_string(), true));
        if self.items.len() == MenuItem::ALL.len() {
            self.show_menu();
        }
    }

    fn set_item_label(&mut self, item: MenuItem, label: &str) {
        if let Some(entry) = self.entry(item) {
            entry.1 = label.to_string();
        }
        self.show_menu();
    }

    fn set_item_enabled(&mut self, item: MenuItem, enabled: bool) {
        if let Some(entry) = self.entry(item) {
            entry.2 = enabled;
        }
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        info!(%tooltip, "tray");
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn current() -> MailboxCredentials {
        MailboxCredentials::new("imap.example.org", "ann", "old", "INBOX")
    }

    fn answers(lines: &[&str]) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        for line in lines {
            tx.send((*line).to_string()).unwrap();
        }
        rx
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(" Check "), Some(ControlCommand::CheckNow));
        assert_eq!(parse_command("restart"), Some(ControlCommand::ToggleSuspend));
        assert_eq!(parse_command("quit"), Some(ControlCommand::Quit));
        assert_eq!(parse_command("frobnicate"), None);
    }

    #[test]
    fn test_every_menu_item_has_a_command() {
        for item in MenuItem::ALL {
            assert!(parse_command(command_word(item)).is_some(), "{item}");
        }
    }

    #[tokio::test]
    async fn test_ask_deactivate() {
        let decision = ask("Work", &current(), &mut answers(&["what", "d"])).await;
        assert_eq!(decision, AuthDecision::Deactivate);
    }

    #[tokio::test]
    async fn test_ask_correct_keeps_login() {
        let decision = ask("Work", &current(), &mut answers(&["c", "", "new secret"])).await;
        assert_eq!(
            decision,
            AuthDecision::Correct(MailboxCredentials::new(
                "imap.example.org",
                "ann",
                "new secret",
                "INBOX"
            ))
        );
    }

    #[tokio::test]
    async fn test_prompt_after_input_closed_deactivates() {
        let console = Console::new();
        console.close_input();

        let decision = tokio::time::timeout(
            std::time::Duration::from_secs(3),
            console.prompt().resolve("Work", &current()),
        )
        .await
        .unwrap();
        assert_eq!(decision, AuthDecision::Deactivate);
    }

    #[tokio::test]
    async fn test_input_closing_mid_prompt_deactivates() {
        let console = Console::new();
        let prompt = console.prompt();
        let waiting = tokio::spawn(async move { prompt.resolve("Work", &current()).await });

        while console.pending.lock().unwrap().is_none() {
            tokio::task::yield_now().await;
        }
        console.close_input();

        let decision = tokio::time::timeout(std::time::Duration::from_secs(3), waiting)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decision, AuthDecision::Deactivate);
    }

    #[tokio::test]
    async fn test_ask_closed_input_deactivates() {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        tx.send("c".to_string()).unwrap();
        drop(tx);
        assert_eq!(ask("Work", &current(), &mut rx).await, AuthDecision::Deactivate);
    }
}
