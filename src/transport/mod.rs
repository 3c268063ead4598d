//! Mail transport abstraction — pure I/O, no triage logic.
//!
//! The scanner and policy never touch the network; everything they need
//! arrives through this trait. The production implementation is
//! [`imap::ImapTransport`]; tests substitute an in-memory mock.

pub mod imap;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::message::{FolderStats, Message, SearchOptions};

/// Folder-oriented mail store operations.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Select the folder subsequent listing/move calls operate on.
    async fn select_folder(&self, folder: &str) -> Result<(), TransportError>;

    /// List messages in the selected folder.
    async fn list_messages(&self, opts: SearchOptions) -> Result<Vec<Message>, TransportError>;

    /// Fetch a single message by listing id.
    async fn get_message(&self, id: &str) -> Result<Message, TransportError>;

    /// Move a message out of the selected folder.
    async fn move_message(&self, id: &str, destination: &str) -> Result<(), TransportError>;

    /// Copy a message into another folder, leaving the original in place.
    async fn copy_message(&self, id: &str, destination: &str) -> Result<(), TransportError>;

    async fn get_folder_stats(&self, folder: &str) -> Result<FolderStats, TransportError>;
}
