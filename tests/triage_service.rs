//! Integration tests for the scan-and-triage pipeline.
//!
//! Each test builds an in-memory mailbox behind the transport trait and
//! drives a real scan pass (or tool call) against it, asserting on where
//! messages end up.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;

use mailguard::config::{FolderConfig, ListenerConfig, NotificationConfig, SecurityConfig};
use mailguard::error::TransportError;
use mailguard::message::{Attachment, FolderStats, Message, MessageFilter, SearchOptions};
use mailguard::scanner::SecurityScanner;
use mailguard::service::{run_scan_pass, spawn_triage_service};
use mailguard::tools::MailTools;
use mailguard::transport::MailTransport;

/// In-memory mailbox: folder name to messages, with per-id move failure
/// injection.
struct MockTransport {
    state: Mutex<MockState>,
}

struct MockState {
    folders: HashMap<String, Vec<Message>>,
    selected: Option<String>,
    fail_moves_for: Vec<String>,
}

impl MockTransport {
    fn new(inbox: Vec<Message>) -> Self {
        let mut folders = HashMap::new();
        folders.insert("INBOX".to_string(), inbox);
        Self {
            state: Mutex::new(MockState {
                folders,
                selected: None,
                fail_moves_for: Vec::new(),
            }),
        }
    }

    async fn fail_moves_for(&self, id: &str) {
        self.state.lock().await.fail_moves_for.push(id.to_string());
    }

    async fn folder_ids(&self, folder: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .folders
            .get(folder)
            .map(|msgs| msgs.iter().map(|m| m.id.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn select_folder(&self, folder: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        if !state.folders.contains_key(folder) {
            return Err(TransportError::SelectFailed {
                folder: folder.to_string(),
                reason: "no such folder".into(),
            });
        }
        state.selected = Some(folder.to_string());
        Ok(())
    }

    async fn list_messages(&self, opts: SearchOptions) -> Result<Vec<Message>, TransportError> {
        let state = self.state.lock().await;
        let folder = state
            .selected
            .as_deref()
            .ok_or_else(|| TransportError::Protocol("no folder selected".into()))?;
        let messages = state.folders.get(folder).cloned().unwrap_or_default();

        let filtered: Vec<Message> = messages
            .into_iter()
            .filter(|m| match opts.filter {
                MessageFilter::Unread => !m.is_read(),
                MessageFilter::Read => m.is_read(),
                MessageFilter::Both => true,
            })
            .skip(opts.offset)
            .take(opts.count.unwrap_or(usize::MAX))
            .collect();
        Ok(filtered)
    }

    async fn get_message(&self, id: &str) -> Result<Message, TransportError> {
        let state = self.state.lock().await;
        state
            .folders
            .values()
            .flatten()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| TransportError::MessageNotFound { id: id.to_string() })
    }

    async fn move_message(&self, id: &str, destination: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        if state.fail_moves_for.iter().any(|f| f == id) {
            return Err(TransportError::MoveFailed {
                id: id.to_string(),
                destination: destination.to_string(),
                reason: "injected failure".into(),
            });
        }
        let source = state
            .selected
            .clone()
            .ok_or_else(|| TransportError::Protocol("no folder selected".into()))?;

        let message = {
            let inbox = state.folders.get_mut(&source).ok_or_else(|| {
                TransportError::SelectFailed {
                    folder: source.clone(),
                    reason: "no such folder".into(),
                }
            })?;
            let idx = inbox.iter().position(|m| m.id == id).ok_or_else(|| {
                TransportError::MessageNotFound { id: id.to_string() }
            })?;
            inbox.remove(idx)
        };
        state
            .folders
            .entry(destination.to_string())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn copy_message(&self, id: &str, destination: &str) -> Result<(), TransportError> {
        let message = self.get_message(id).await?;
        let mut state = self.state.lock().await;
        state
            .folders
            .entry(destination.to_string())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn get_folder_stats(&self, folder: &str) -> Result<FolderStats, TransportError> {
        let state = self.state.lock().await;
        let messages = state.folders.get(folder).cloned().unwrap_or_default();
        Ok(FolderStats {
            name: folder.to_string(),
            unread: messages.iter().filter(|m| !m.is_read()).count() as u32,
            total: messages.len() as u32,
            size: messages.iter().map(|m| m.size).sum(),
        })
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn message(id: &str, from: &str, subject: &str, body: &str) -> Message {
    Message {
        id: id.to_string(),
        uid: None,
        from: from.to_string(),
        to: "me@corp.example".to_string(),
        subject: subject.to_string(),
        date: Utc::now(),
        size: body.len() as u64,
        flags: vec![],
        preview: body.chars().take(64).collect(),
        body: Some(body.to_string()),
        attachments: vec![],
    }
}

fn with_attachment(mut msg: Message, filename: &str) -> Message {
    msg.attachments.push(Attachment {
        filename: filename.to_string(),
        content_type: "application/octet-stream".to_string(),
        size: 512,
    });
    msg
}

fn scanner() -> Arc<SecurityScanner> {
    Arc::new(SecurityScanner::new(&SecurityConfig {
        known_safe_senders: vec!["colleague@corp.example".to_string()],
        ..SecurityConfig::default()
    }))
}

// ── Scan pass ───────────────────────────────────────────────────────

#[tokio::test]
async fn pass_quarantines_dangerous_and_leaves_safe() {
    let inbox = vec![
        message(
            "1",
            "colleague@corp.example",
            "Lunch tomorrow?",
            "Usual place at noon.",
        ),
        with_attachment(
            message(
                "2",
                "mallory <mallory@evil.xyz>",
                "Invoice",
                "Verify your account password to open the attached invoice.",
            ),
            "invoice.pdf.exe",
        ),
    ];
    let transport = Arc::new(MockTransport::new(inbox));
    let folders = FolderConfig::default();

    let outcome = run_scan_pass(&*transport, &scanner(), &folders, 50)
        .await
        .unwrap();

    assert_eq!(outcome.scanned, 2);
    assert_eq!(outcome.quarantined, 1);
    assert_eq!(outcome.move_failures, 0);
    assert_eq!(transport.folder_ids("INBOX").await, vec!["1"]);
    assert_eq!(transport.folder_ids("quarantine").await, vec!["2"]);
}

#[tokio::test]
async fn pass_routes_low_scoring_suspicious_to_safe_inbox() {
    // An office-document attachment alone scores 3: suspicious, but below
    // the quarantine threshold, so it goes to the safe inbox.
    let inbox = vec![with_attachment(
        message(
            "7",
            "partner@vendor.example",
            "Quarterly figures",
            "Figures for Q2 attached.",
        ),
        "q2-figures.xlsx",
    )];
    let transport = Arc::new(MockTransport::new(inbox));
    let folders = FolderConfig::default();

    let outcome = run_scan_pass(&*transport, &scanner(), &folders, 50)
        .await
        .unwrap();

    assert_eq!(outcome.quarantined, 0);
    assert_eq!(outcome.moved_to_safe, 1);
    assert_eq!(transport.folder_ids("safe").await, vec!["7"]);
}

#[tokio::test]
async fn one_failed_move_does_not_abort_the_pass() {
    let inbox = vec![
        with_attachment(
            message("1", "a@evil.xyz", "Payload", "run it"),
            "setup.exe",
        ),
        with_attachment(
            message("2", "b@evil.xyz", "Payload", "run it"),
            "setup.exe",
        ),
    ];
    let transport = Arc::new(MockTransport::new(inbox));
    transport.fail_moves_for("1").await;
    let folders = FolderConfig::default();

    let outcome = run_scan_pass(&*transport, &scanner(), &folders, 50)
        .await
        .unwrap();

    assert_eq!(outcome.scanned, 2);
    assert_eq!(outcome.quarantined, 1);
    assert_eq!(outcome.move_failures, 1);
    // The stuck message stays in the inbox for the next pass.
    assert_eq!(transport.folder_ids("INBOX").await, vec!["1"]);
    assert_eq!(transport.folder_ids("quarantine").await, vec!["2"]);
}

#[tokio::test]
async fn pass_respects_batch_cap() {
    let inbox: Vec<Message> = (0..5)
        .map(|i| {
            message(
                &i.to_string(),
                "someone@corp.example",
                "hello",
                "plain message",
            )
        })
        .collect();
    let transport = Arc::new(MockTransport::new(inbox));
    let folders = FolderConfig::default();

    let outcome = run_scan_pass(&*transport, &scanner(), &folders, 3)
        .await
        .unwrap();

    assert_eq!(outcome.scanned, 3);
}

#[tokio::test]
async fn pass_fails_when_inbox_cannot_be_selected() {
    let transport = MockTransport::new(vec![]);
    {
        let mut state = transport.state.lock().await;
        state.folders.clear();
    }
    let folders = FolderConfig::default();

    let result = run_scan_pass(&transport, &scanner(), &folders, 50).await;
    assert!(matches!(
        result,
        Err(TransportError::SelectFailed { .. })
    ));
}

// ── Service loop ────────────────────────────────────────────────────

#[tokio::test]
async fn service_runs_a_pass_and_reports_status() {
    let inbox = vec![with_attachment(
        message(
            "1",
            "x@evil.xyz",
            "Invoice",
            "Reset password immediately to open it",
        ),
        "payload.exe",
    )];
    let transport = Arc::new(MockTransport::new(inbox));
    let folders = FolderConfig::default();
    let listener = ListenerConfig {
        enabled: true,
        poll_interval_secs: 60,
        batch_size: 50,
    };

    let service = spawn_triage_service(
        listener,
        folders.clone(),
        Arc::clone(&transport) as Arc<dyn MailTransport>,
        scanner(),
    );

    // The first interval tick fires immediately; give the pass a moment.
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        if service.last_check().await.is_some() {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "pass never ran");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    assert_eq!(transport.folder_ids("quarantine").await, vec!["1"]);

    let status = service.status(&*transport, &folders).await.unwrap();
    assert!(status.running);
    assert!(status.last_check.is_some());
    assert_eq!(status.total_messages, 0);
    assert_eq!(status.quarantine_messages, 1);

    service.stop();
    assert!(!service.is_running());
}

// ── Tools ───────────────────────────────────────────────────────────

fn tools(transport: Arc<MockTransport>) -> MailTools {
    MailTools::new(
        transport,
        scanner(),
        FolderConfig::default(),
        None,
        NotificationConfig::default(),
    )
}

#[tokio::test]
async fn scan_mail_reports_without_moving() {
    let inbox = vec![
        message("1", "colleague@corp.example", "Notes", "meeting notes"),
        with_attachment(
            message(
                "2",
                "x@evil.xyz",
                "Invoice",
                "Reset password immediately to open it",
            ),
            "payload.scr",
        ),
    ];
    let transport = Arc::new(MockTransport::new(inbox));
    let tools = tools(Arc::clone(&transport));

    let result = tools.scan_mail(false).await;

    assert_eq!(result["success"], json!(true));
    assert_eq!(result["scanned"], json!(2));
    assert_eq!(result["summary"]["dangerous"], json!(1));
    assert_eq!(
        result["messages"][1]["threat_level"],
        json!("dangerous")
    );
    assert_eq!(result["messages"][1]["phishing_score"], json!(10));
    // Read-only: nothing moved.
    assert_eq!(transport.folder_ids("INBOX").await.len(), 2);
}

#[tokio::test]
async fn mark_safe_and_trash_move_messages() {
    let inbox = vec![
        message("1", "a@corp.example", "one", "body"),
        message("2", "b@corp.example", "two", "body"),
    ];
    let transport = Arc::new(MockTransport::new(inbox));
    let tools = tools(Arc::clone(&transport));

    let safe = tools.mark_safe("1").await;
    assert_eq!(safe["success"], json!(true));
    assert_eq!(safe["destination"], json!("safe"));

    let trashed = tools.trash("2").await;
    assert_eq!(trashed["success"], json!(true));
    assert_eq!(trashed["destination"], json!("Trash"));

    assert!(transport.folder_ids("INBOX").await.is_empty());
    assert_eq!(transport.folder_ids("safe").await, vec!["1"]);
    assert_eq!(transport.folder_ids("Trash").await, vec!["2"]);
}

#[tokio::test]
async fn quarantine_returns_quarantine_id() {
    let inbox = vec![message("9", "x@evil.xyz", "bad", "body")];
    let transport = Arc::new(MockTransport::new(inbox));
    let tools = tools(Arc::clone(&transport));

    let result = tools.quarantine("9").await;
    assert_eq!(result["success"], json!(true));
    let qid = result["quarantine_id"].as_str().unwrap();
    assert!(qid.starts_with("9_"));
    assert_eq!(transport.folder_ids("quarantine").await, vec!["9"]);
}

#[tokio::test]
async fn tool_failures_come_back_as_json() {
    let transport = Arc::new(MockTransport::new(vec![]));
    let tools = tools(Arc::clone(&transport));

    let result = tools.mark_safe("nope").await;
    assert_eq!(result["success"], json!(false));
    assert!(result["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn finish_check_summarizes_the_pass() {
    let inbox = vec![
        message("1", "colleague@corp.example", "ok", "fine"),
        with_attachment(
            message("2", "x@evil.xyz", "bad", "open it"),
            "run.bat",
        ),
    ];
    let transport = Arc::new(MockTransport::new(inbox));
    let tools = tools(Arc::clone(&transport));

    let result = tools.finish_check().await;
    assert_eq!(result["success"], json!(true));
    assert_eq!(result["scanned"], json!(2));
    assert_eq!(result["quarantined"], json!(1));
    assert_eq!(result["alerted"], json!(true));
    // No notifier configured.
    assert_eq!(result["report_sent"], json!(false));
}
