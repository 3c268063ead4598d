//! Operator-facing mailbox operations with JSON results.
//!
//! Every operation returns a `serde_json::Value` so callers (CLI, future
//! RPC surface) get a uniform shape. Failures never propagate as `Err`;
//! they come back as `{"success": false, "error": "..."}` so a single bad
//! mailbox call cannot take down the caller.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{FolderConfig, NotificationConfig};
use crate::message::{MessageFilter, SearchOptions};
use crate::notify::SmtpNotifier;
use crate::scanner::{ScannedMessage, SecurityScanner};
use crate::service::run_scan_pass;
use crate::transport::MailTransport;
use crate::triage::ScanSummary;

const SCAN_ALL_CAP: usize = 200;
const SCAN_UNREAD_CAP: usize = 50;

/// Mailbox operations bound to one account.
pub struct MailTools {
    transport: Arc<dyn MailTransport>,
    scanner: Arc<SecurityScanner>,
    folders: FolderConfig,
    notifier: Option<SmtpNotifier>,
    notifications: NotificationConfig,
}

impl MailTools {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        scanner: Arc<SecurityScanner>,
        folders: FolderConfig,
        notifier: Option<SmtpNotifier>,
        notifications: NotificationConfig,
    ) -> Self {
        Self {
            transport,
            scanner,
            folders,
            notifier,
            notifications,
        }
    }

    /// Scan the inbox and report per-message verdicts plus a summary.
    /// Does not move anything; this is the read-only view.
    pub async fn scan_mail(&self, scan_all: bool) -> serde_json::Value {
        let opts = if scan_all {
            SearchOptions {
                count: Some(SCAN_ALL_CAP),
                filter: MessageFilter::Both,
                ..SearchOptions::default()
            }
        } else {
            SearchOptions::unread(SCAN_UNREAD_CAP)
        };

        let result = async {
            self.transport.select_folder(&self.folders.inbox).await?;
            self.transport.list_messages(opts).await
        }
        .await;

        let messages = match result {
            Ok(messages) => messages,
            Err(e) => return failure(&e.to_string()),
        };

        let scanned = self.scanner.scan_batch(&messages);
        let summary = ScanSummary::from_scanned(&scanned);

        info!(
            scanned = summary.scanned,
            suspicious = summary.suspicious,
            dangerous = summary.dangerous,
            "Mail scan complete"
        );

        json!({
            "success": true,
            "scanned": summary.scanned,
            "messages": scanned.iter().map(render_scanned).collect::<Vec<_>>(),
            "summary": summary,
        })
    }

    /// Move a message to the safe inbox.
    pub async fn mark_safe(&self, id: &str) -> serde_json::Value {
        self.move_to(id, self.folders.safe_inbox.clone(), "marked safe")
            .await
    }

    /// Move a message to quarantine. The result carries a quarantine id
    /// (message id plus timestamp) for later lookup in reports.
    pub async fn quarantine(&self, id: &str) -> serde_json::Value {
        let quarantine_id = format!("{id}_{}", Utc::now().timestamp_millis());
        let mut result = self
            .move_to(id, self.folders.quarantine.clone(), "quarantined")
            .await;
        if result["success"] == json!(true) {
            result["quarantine_id"] = json!(quarantine_id);
        }
        result
    }

    /// Move a message to the trash folder.
    pub async fn trash(&self, id: &str) -> serde_json::Value {
        self.move_to(id, self.folders.trash.clone(), "trashed").await
    }

    /// Run a full scan-and-triage pass, then send the quarantine report
    /// if a notifier and recipient are configured.
    pub async fn finish_check(&self) -> serde_json::Value {
        let outcome = match run_scan_pass(
            &*self.transport,
            &self.scanner,
            &self.folders,
            SCAN_UNREAD_CAP,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => return failure(&e.to_string()),
        };

        let alerted = outcome.quarantined > 0;
        let report_sent = self.send_report(&outcome).await;

        json!({
            "success": true,
            "report_id": Uuid::new_v4().to_string(),
            "scanned": outcome.scanned,
            "quarantined": outcome.quarantined,
            "moved_to_safe": outcome.moved_to_safe,
            "alerted": alerted,
            "report_sent": report_sent,
        })
    }

    async fn send_report(&self, outcome: &crate::service::PassOutcome) -> bool {
        let (Some(notifier), Some(to)) = (
            self.notifier.as_ref(),
            self.notifications.quarantine_report_to.as_deref(),
        ) else {
            return false;
        };

        let summary = ScanSummary {
            scanned: outcome.scanned,
            safe: outcome
                .scanned
                .saturating_sub(outcome.quarantined + outcome.moved_to_safe),
            suspicious: outcome.moved_to_safe,
            dangerous: outcome.quarantined,
            avg_phishing_score: 0.0,
        };
        let lines = vec![format!("{} message(s) quarantined", outcome.quarantined)];

        match notifier.send_quarantine_report(to, &summary, &lines) {
            Ok(()) => true,
            Err(e) => {
                warn!("Quarantine report not sent: {e}");
                false
            }
        }
    }

    async fn move_to(&self, id: &str, destination: String, verb: &str) -> serde_json::Value {
        let result = async {
            self.transport.select_folder(&self.folders.inbox).await?;
            self.transport.move_message(id, &destination).await
        }
        .await;

        match result {
            Ok(()) => {
                info!(id = %id, destination = %destination, "Message {verb}");
                json!({
                    "success": true,
                    "moved": id,
                    "destination": destination,
                })
            }
            Err(e) => failure(&e.to_string()),
        }
    }
}

fn render_scanned(s: &ScannedMessage) -> serde_json::Value {
    json!({
        "id": s.message.id,
        "from": s.message.from,
        "subject": s.message.subject,
        "date": s.message.date,
        "preview": s.message.preview,
        "threat_level": s.security_analysis.level,
        "phishing_score": s.security_analysis.phishing_score,
        "threat_flags": s.security_analysis.reasons,
    })
}

fn failure(error: &str) -> serde_json::Value {
    json!({ "success": false, "error": error })
}
