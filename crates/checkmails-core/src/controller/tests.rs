#![allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::slot::MailboxState;
use super::testing::{
    FakeConnector, FakeProbe, MemoryCredentialStore, MemorySettingsStore, RecordingSink,
    RecordingTray, ScriptedPrompt, SinkEvent, credentials_for, settings_with,
};
use super::{
    Collaborators, ControlCommand, ControlHandle, Controller, NO_ACTIVE_MAILBOX, NO_INTERNET,
    NO_UNREAD, SUSPENDED,
};
use crate::connection::SessionError;
use crate::credentials::{CredentialStore, MailboxCredentials};
use crate::prompt::AuthDecision;
use crate::settings::Settings;
use crate::tray::MenuItem;

type TestController = Controller<FakeConnector, FakeProbe, ScriptedPrompt>;

struct Harness {
    connector: FakeConnector,
    probe: FakeProbe,
    prompt: ScriptedPrompt,
    sink: RecordingSink,
    tray: RecordingTray,
    settings: MemorySettingsStore,
    credentials: MemoryCredentialStore,
}

impl Harness {
    fn new(active: &[&str]) -> Self {
        Self::with_settings(settings_with(active))
    }

    fn with_settings(settings: Settings) -> Self {
        let credentials = MemoryCredentialStore::default();
        for name in settings.active.iter() {
            credentials.save(name, &credentials_for(name)).unwrap();
        }

        Self {
            connector: FakeConnector::default(),
            probe: FakeProbe::new(true),
            prompt: ScriptedPrompt::default(),
            sink: RecordingSink::default(),
            tray: RecordingTray::default(),
            settings: MemorySettingsStore::new(settings),
            credentials,
        }
    }

    fn controller(&self) -> (TestController, ControlHandle) {
        Controller::new(Collaborators {
            connector: self.connector.clone(),
            probe: self.probe.clone(),
            prompt: self.prompt.clone(),
            sink: Box::new(self.sink.clone()),
            tray: Box::new(self.tray.clone()),
            settings: Box::new(self.settings.clone()),
            credentials: Box::new(self.credentials.clone()),
        })
    }

    fn start(&self) -> (ControlHandle, JoinHandle<()>) {
        let (controller, handle) = self.controller();
        (handle, tokio::spawn(controller.run()))
    }
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[tokio::test(start_paused = true)]
async fn test_cycle_notifies_summary_and_badge() {
    let h = Harness::new(&["A"]);
    h.connector.script("A", |s| s.unseen = vec![1, 2, 3]);

    let (handle, run) = h.start();
    sleep(secs(45)).await;

    assert_eq!(h.connector.connects("A"), 1);
    assert_eq!(h.connector.searches("A"), 1);
    assert_eq!(h.sink.count("A : 3"), 1);
    assert_eq!(h.sink.last_badge(), Some(3));
    assert_eq!(h.tray.with(|t| t.tooltip.clone()), "checkmails 3");
    assert_eq!(h.tray.with(|t| t.items.len()), MenuItem::ALL.len());
    assert_eq!(h.sink.count("From: alice@example.org\nDate: Mon 02 Jun 2025, 10:00"), 3);
    for n in 1..=3 {
        let expected = format!("Message {n} [A]");
        assert!(h.sink.events().iter().any(
            |e| matches!(e, SinkEvent::Notify { title, .. } if *title == expected)
        ));
    }

    handle.quit();
    run.await.unwrap();
    assert_eq!(h.connector.logouts(), 1);
    assert_eq!(h.connector.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_recheck_notifies_only_new_arrivals() {
    let h = Harness::new(&["A"]);
    h.connector.script("A", |s| s.unseen = vec![1, 2]);

    let (handle, run) = h.start();
    sleep(secs(45)).await;
    h.connector.script("A", |s| s.unseen = vec![2, 5]);
    h.sink.clear();

    // Next check at 20 s + 300 s, its barrier 20 s later.
    sleep(secs(300)).await;

    assert_eq!(h.connector.searches("A"), 2);
    assert_eq!(h.connector.connects("A"), 1);
    let titles: Vec<String> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            SinkEvent::Notify { title, .. } => Some(title),
            SinkEvent::Badge(_) => None,
        })
        .collect();
    assert_eq!(titles, vec!["Message 5 [A]".to_string(), "Unread mails".to_string()]);
    assert_eq!(h.sink.count("A : 2"), 1);

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_auth_failure_deactivates_mailbox() {
    let h = Harness::new(&["A"]);
    h.connector
        .script("A", |s| s.connect.push_back(Err(SessionError::Auth("bad password".into()))));

    let (handle, run) = h.start();
    sleep(secs(45)).await;

    assert_eq!(h.prompt.asked(), vec!["A".to_string()]);
    let saved = h.settings.get();
    assert!(!saved.active.contains("A"));
    assert!(saved.inactive.contains("A"));
    assert_eq!(h.connector.searches("A"), 0);
    assert_eq!(h.sink.last_badge(), Some(0));

    handle.send(ControlCommand::Reload);
    sleep(secs(60)).await;

    assert_eq!(h.connector.connects("A"), 1);
    assert_eq!(h.sink.count("Use `checkmails add` to configure a mailbox."), 1);

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_corrected_credentials_reconnect_before_check() {
    let h = Harness::new(&["A"]);
    h.connector
        .script("A", |s| s.connect.push_back(Err(SessionError::Auth("bad password".into()))));
    let fixed = MailboxCredentials::new("imap.A.example", "A", "fixed", "INBOX");
    h.prompt.answer(AuthDecision::Correct(fixed.clone()));

    let (handle, run) = h.start();

    // The correction restarts the connect barrier: checks start at 40 s.
    sleep(secs(30)).await;
    assert_eq!(h.connector.connects("A"), 2);
    assert_eq!(h.connector.searches("A"), 0);
    assert_eq!(h.credentials.get("A"), Some(fixed));

    sleep(secs(15)).await;
    assert_eq!(h.connector.searches("A"), 1);
    assert!(h.settings.get().active.contains("A"));

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_offline_notifies_once_and_recovers() {
    let h = Harness::new(&["A", "B"]);
    h.probe.set_online(false);
    for name in ["A", "B"] {
        h.connector.script(name, |s| {
            s.connect
                .push_back(Err(SessionError::Resolve("no such host".into())));
            s.unseen = vec![7];
        });
    }

    let (handle, run) = h.start();
    sleep(secs(100)).await;

    assert_eq!(h.sink.count(NO_INTERNET), 1);
    assert_eq!(h.connector.searches("A") + h.connector.searches("B"), 0);
    // Two connect failures, then the poll at the operation timeout.
    assert_eq!(h.probe.calls(), 3);

    // Next poll at 120 s reconnects; check at 140 s, summary at 160 s.
    h.probe.set_online(true);
    sleep(secs(70)).await;

    assert_eq!(h.connector.connects("A"), 2);
    assert_eq!(h.connector.connects("B"), 2);
    assert_eq!(h.connector.searches("A"), 1);
    assert_eq!(h.sink.count("A : 1, B : 1"), 1);
    assert_eq!(h.sink.count(NO_INTERNET), 1);

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unresolvable_server_while_online_deactivates() {
    let h = Harness::new(&["A"]);
    h.connector
        .script("A", |s| s.connect.push_back(Err(SessionError::Resolve("no such host".into()))));

    let (handle, run) = h.start();
    sleep(secs(5)).await;

    assert_eq!(h.sink.count("Wrong IMAP server for A."), 1);
    assert!(h.settings.get().inactive.contains("A"));
    assert_eq!(h.sink.count(NO_INTERNET), 0);

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_timeout_forces_single_reconnect() {
    let mut settings = settings_with(&["A"]);
    settings.timeout = 50_000;
    let h = Harness::with_settings(settings);
    h.connector
        .script("A", |s| s.search_delays.push_back(secs(90)));

    let (handle, run) = h.start();
    // Check at 20 s times out at 70 s, reconnect after one second.
    sleep(secs(200)).await;

    assert_eq!(h.connector.connects("A"), 2);
    assert_eq!(h.connector.searches("A"), 1);
    assert_eq!(h.connector.max_live_sessions(), 1);
    assert_eq!(h.connector.live_sessions(), 1);

    handle.quit();
    run.await.unwrap();
    assert_eq!(h.connector.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hung_connect_reconnects_once_when_online() {
    let mut settings = settings_with(&["A"]);
    settings.timeout = 50_000;
    let h = Harness::with_settings(settings);
    h.connector.script("A", |s| {
        s.connect_delays.push_back(secs(90));
        s.unseen = vec![1];
    });

    let (handle, run) = h.start();
    // Timeout at 50 s, reconnect at 51 s, check at 60 s, summary at 80 s.
    sleep(secs(100)).await;

    assert_eq!(h.probe.calls(), 1);
    assert_eq!(h.connector.connects("A"), 2);
    assert_eq!(h.connector.searches("A"), 1);
    assert_eq!(h.connector.max_live_sessions(), 1);
    assert_eq!(h.sink.count("A : 1"), 1);
    assert_eq!(h.sink.count(NO_INTERNET), 0);

    handle.quit();
    run.await.unwrap();
    assert_eq!(h.connector.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hung_connect_while_offline_polls_connectivity() {
    let mut settings = settings_with(&["A"]);
    settings.timeout = 50_000;
    let h = Harness::with_settings(settings);
    h.probe.set_online(false);
    h.connector.script("A", |s| {
        s.connect_delays.push_back(secs(90));
        s.unseen = vec![1];
    });

    let (handle, run) = h.start();
    // Timeout probe at 50 s, then one poll at 100 s.
    sleep(secs(120)).await;

    assert_eq!(h.sink.count(NO_INTERNET), 1);
    assert_eq!(h.probe.calls(), 2);
    assert_eq!(h.connector.connects("A"), 1);
    assert_eq!(h.connector.searches("A"), 0);

    // The poll at 150 s finds the Internet back and starts over.
    h.probe.set_online(true);
    sleep(secs(80)).await;

    assert_eq!(h.connector.connects("A"), 2);
    assert_eq!(h.connector.searches("A"), 1);
    assert_eq!(h.connector.max_live_sessions(), 1);
    assert_eq!(h.sink.count(NO_INTERNET), 1);

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_barrier_waits_for_check_from_earlier_cycle() {
    let h = Harness::new(&["A"]);
    h.connector.script("A", |s| {
        s.unseen = vec![1, 2, 3];
        s.search_delays.push_back(secs(30));
    });

    let (handle, run) = h.start();
    // The periodic check started at 20 s is still searching.
    sleep(secs(25)).await;
    handle.check_now();

    sleep(secs(22)).await;
    assert_eq!(h.connector.searches("A"), 1);
    assert_eq!(h.sink.count(NO_UNREAD), 0);
    assert_eq!(h.sink.last_badge(), None);

    // The search ends at 50 s; the barrier rearmed at 45 s fires at 65 s.
    sleep(secs(20)).await;
    assert_eq!(h.sink.count("A : 3"), 1);
    assert_eq!(h.sink.last_badge(), Some(3));
    assert_eq!(h.sink.count(NO_UNREAD), 0);

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_check_failure_notifies_partial_summary() {
    let mut settings = settings_with(&["A", "B"]);
    settings.notify_new_unread = false;
    let h = Harness::with_settings(settings);
    h.connector.script("A", |s| s.unseen = vec![1]);
    h.connector.script("B", |s| {
        s.unseen = vec![4, 5];
        s.search_delays.push_back(secs(5));
        s.search_errors
            .push_back(SessionError::Transient("connection reset".into()));
    });

    let (handle, run) = h.start();
    sleep(secs(30)).await;

    assert_eq!(h.sink.count("A : 1, B : Timed out, reconnecting"), 1);
    assert_eq!(h.sink.last_badge(), Some(1));
    assert_eq!(h.connector.connects("B"), 2);

    sleep(secs(15)).await;
    assert_eq!(h.sink.count("A : 1"), 1);

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_forced_check_notifies_empty_result() {
    let h = Harness::new(&["A"]);

    let (handle, run) = h.start();
    sleep(secs(25)).await;
    assert_eq!(h.connector.searches("A"), 1);

    handle.check_now();
    sleep(secs(25)).await;

    assert_eq!(h.connector.searches("A"), 2);
    assert_eq!(h.sink.count(NO_UNREAD), 1);

    handle.send(ControlCommand::ShowDetails);
    sleep(secs(1)).await;
    assert_eq!(h.sink.count(NO_UNREAD), 2);

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_suspend_and_restart() {
    let h = Harness::new(&["A"]);

    let (handle, run) = h.start();
    sleep(secs(5)).await;
    handle.send(ControlCommand::ToggleSuspend);
    sleep(secs(100)).await;

    assert_eq!(h.connector.searches("A"), 0);
    assert_eq!(
        h.tray.with(|t| t.labels.get(&MenuItem::Suspend).cloned()),
        Some("Restart".to_string())
    );
    assert!(h.tray.with(|t| t.disabled.contains(&MenuItem::Check)));
    assert!(h.tray.with(|t| t.disabled.contains(&MenuItem::Reconnect)));

    handle.send(ControlCommand::ShowDetails);
    handle.check_now();
    sleep(secs(1)).await;
    assert_eq!(h.sink.count(SUSPENDED), 1);
    assert_eq!(h.connector.searches("A"), 0);

    handle.send(ControlCommand::ToggleSuspend);
    sleep(secs(25)).await;

    assert_eq!(h.connector.connects("A"), 2);
    assert_eq!(h.connector.searches("A"), 1);
    assert!(h.tray.with(|t| t.disabled.is_empty()));
    assert_eq!(h.connector.max_live_sessions(), 1);

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_missing_credentials_forget_mailbox() {
    let h = Harness::new(&["A"]);
    let mut settings = h.settings.get();
    settings.active.insert("Ghost");
    h.settings.set(settings);

    let (handle, run) = h.start();
    sleep(secs(1)).await;

    assert!(!h.settings.get().active.contains("Ghost"));
    assert_eq!(
        h.sink.count("No credentials for Ghost, removed from the mailbox list."),
        1
    );
    assert_eq!(h.connector.connects("A"), 1);
    assert_eq!(h.connector.connects("Ghost"), 0);

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_no_active_mailbox() {
    let h = Harness::new(&[]);

    let (handle, run) = h.start();
    sleep(secs(1)).await;
    handle.send(ControlCommand::ShowDetails);
    sleep(secs(1)).await;

    assert_eq!(h.sink.count(NO_ACTIVE_MAILBOX), 1);

    handle.quit();
    run.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_start_connect_is_idempotent() {
    let h = Harness::new(&["A"]);
    let (mut controller, _handle) = h.controller();

    controller.load_mailboxes();
    controller.start_connect("A");
    controller.start_connect("A");
    sleep(secs(1)).await;
    controller.drain_reports();

    assert_eq!(h.connector.connects("A"), 1);
    assert_eq!(controller.slots["A"].state, MailboxState::Connected);

    // Connecting a connected mailbox logs out first.
    controller.start_connect("A");
    assert_eq!(controller.slots["A"].state, MailboxState::LoggingOut);
    controller.start_connect("A");

    sleep(secs(1)).await;
    controller.drain_reports();
    sleep(secs(1)).await;
    controller.drain_reports();

    assert_eq!(controller.slots["A"].state, MailboxState::Connected);
    assert_eq!(h.connector.connects("A"), 2);
    assert_eq!(h.connector.logouts(), 1);
    assert_eq!(h.connector.max_live_sessions(), 1);
}
