//! Background triage service — polls the inbox, scans, and files messages.
//!
//! One pass: select the inbox, list unread messages (capped per pass),
//! analyze each, and apply the triage action through the transport. A
//! transport failure abandons the pass; a failure moving one message is
//! logged and the pass continues with the rest.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{FolderConfig, ListenerConfig};
use crate::error::TransportError;
use crate::message::SearchOptions;
use crate::scanner::SecurityScanner;
use crate::transport::MailTransport;
use crate::triage::{triage, TriageAction};

/// Snapshot of the service's state, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub last_check: Option<DateTime<Utc>>,
    pub unread_messages: u32,
    pub total_messages: u32,
    pub quarantine_messages: u32,
}

/// Outcome of a single scan pass.
#[derive(Debug, Clone, Default)]
pub struct PassOutcome {
    pub scanned: usize,
    pub quarantined: usize,
    pub moved_to_safe: usize,
    pub move_failures: usize,
}

/// Handle to a running triage service.
pub struct TriageService {
    shutdown: Arc<AtomicBool>,
    last_check: Arc<Mutex<Option<DateTime<Utc>>>>,
    handle: JoinHandle<()>,
}

impl TriageService {
    /// Request shutdown; the loop exits on its next tick.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed) && !self.handle.is_finished()
    }

    pub async fn last_check(&self) -> Option<DateTime<Utc>> {
        *self.last_check.lock().await
    }

    /// Wait for the poll loop to exit.
    pub async fn join(self) {
        let _ = self.handle.await;
    }

    /// Folder counters plus loop state, for the status tool.
    pub async fn status(
        &self,
        transport: &dyn MailTransport,
        folders: &FolderConfig,
    ) -> Result<ServiceStatus, TransportError> {
        let inbox = transport.get_folder_stats(&folders.inbox).await?;
        let quarantine = transport.get_folder_stats(&folders.quarantine).await?;
        Ok(ServiceStatus {
            running: self.is_running(),
            last_check: self.last_check().await,
            unread_messages: inbox.unread,
            total_messages: inbox.total,
            quarantine_messages: quarantine.total,
        })
    }
}

/// Spawn the polling loop. Returns immediately; the loop runs until
/// [`TriageService::stop`] is called.
pub fn spawn_triage_service(
    listener: ListenerConfig,
    folders: FolderConfig,
    transport: Arc<dyn MailTransport>,
    scanner: Arc<SecurityScanner>,
) -> TriageService {
    let shutdown = Arc::new(AtomicBool::new(false));
    let last_check = Arc::new(Mutex::new(None));

    let loop_shutdown = Arc::clone(&shutdown);
    let loop_last_check = Arc::clone(&last_check);

    let handle = tokio::spawn(async move {
        info!(
            "Triage service polling every {}s (batch cap {})",
            listener.poll_interval_secs, listener.batch_size
        );

        let mut tick = tokio::time::interval(Duration::from_secs(listener.poll_interval_secs));

        loop {
            tick.tick().await;

            if loop_shutdown.load(Ordering::Relaxed) {
                info!("Triage poll loop shutting down");
                return;
            }

            match run_scan_pass(&*transport, &scanner, &folders, listener.batch_size).await {
                Ok(outcome) => {
                    *loop_last_check.lock().await = Some(Utc::now());
                    if outcome.scanned > 0 {
                        info!(
                            scanned = outcome.scanned,
                            quarantined = outcome.quarantined,
                            moved_to_safe = outcome.moved_to_safe,
                            failures = outcome.move_failures,
                            "Scan pass complete"
                        );
                    }
                }
                Err(e) => {
                    error!("Scan pass failed: {e}");
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
            }
        }
    });

    TriageService {
        shutdown,
        last_check,
        handle,
    }
}

/// Run one scan-and-triage pass over the unread inbox.
pub async fn run_scan_pass(
    transport: &dyn MailTransport,
    scanner: &SecurityScanner,
    folders: &FolderConfig,
    batch_size: usize,
) -> Result<PassOutcome, TransportError> {
    transport.select_folder(&folders.inbox).await?;
    let messages = transport
        .list_messages(SearchOptions::unread(batch_size))
        .await?;

    let mut outcome = PassOutcome {
        scanned: messages.len(),
        ..PassOutcome::default()
    };

    for message in &messages {
        let analysis = scanner.analyze_message(message);
        let action = triage(&analysis);

        let destination = match action {
            TriageAction::Quarantine => &folders.quarantine,
            TriageAction::SafeInbox => &folders.safe_inbox,
            TriageAction::None => continue,
        };

        match transport.move_message(&message.id, destination).await {
            Ok(()) => {
                info!(
                    id = %message.id,
                    from = %message.from,
                    level = analysis.level.label(),
                    score = analysis.phishing_score,
                    action = action.label(),
                    "Message filed"
                );
                match action {
                    TriageAction::Quarantine => outcome.quarantined += 1,
                    TriageAction::SafeInbox => outcome.moved_to_safe += 1,
                    TriageAction::None => {}
                }
            }
            Err(e) => {
                // One stuck message must not block the rest of the pass.
                warn!(id = %message.id, "Failed to file message: {e}");
                outcome.move_failures += 1;
            }
        }
    }

    Ok(outcome)
}
