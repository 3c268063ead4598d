//! Raw IMAP-over-TLS transport.
//!
//! Deliberately small: a blocking line-oriented IMAP session (LOGIN,
//! SELECT, SEARCH, FETCH, COPY/MOVE, STATUS) run under `spawn_blocking`,
//! with `mail-parser` doing the heavy lifting on RFC822 payloads. No
//! IDLE, no pipelining — the polling service tolerates whole-pass
//! latency in the tens of seconds.

use std::io::Write as IoWrite;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders};
use secrecy::ExposeSecret;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ImapConfig;
use crate::error::TransportError;
use crate::message::{Attachment, FolderStats, Message, MessageFilter, SearchOptions};
use crate::transport::MailTransport;

const READ_TIMEOUT: Duration = Duration::from_secs(30);
const PREVIEW_CHARS: usize = 128;

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

/// IMAP transport over rustls. One session at a time, guarded by a mutex;
/// the polling service issues calls sequentially anyway.
pub struct ImapTransport {
    config: ImapConfig,
    session: Arc<Mutex<Option<Session>>>,
}

impl ImapTransport {
    pub fn new(config: ImapConfig) -> Self {
        Self {
            config,
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Run `op` on the live session (opening one if needed) off the async
    /// runtime.
    async fn with_session<T, F>(&self, op: F) -> Result<T, TransportError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Session) -> Result<T, TransportError> + Send + 'static,
    {
        let config = self.config.clone();
        let slot = Arc::clone(&self.session);

        tokio::task::spawn_blocking(move || {
            let mut guard = slot.blocking_lock();
            let session = match guard.as_mut() {
                Some(session) => session,
                None => guard.insert(Session::open(&config)?),
            };
            let result = op(session);
            // A protocol or IO failure leaves the session in an unknown
            // state; drop it so the next call reconnects.
            if result.is_err() {
                *guard = None;
            }
            result
        })
        .await
        .map_err(|e| TransportError::Protocol(format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl MailTransport for ImapTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.with_session(|_| Ok(())).await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let slot = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let mut guard = slot.blocking_lock();
            if let Some(mut session) = guard.take() {
                let _ = session.command("LOGOUT");
            }
            Ok(())
        })
        .await
        .map_err(|e| TransportError::Protocol(format!("blocking task failed: {e}")))?
    }

    async fn select_folder(&self, folder: &str) -> Result<(), TransportError> {
        let folder = folder.to_string();
        self.with_session(move |s| s.select(&folder)).await
    }

    async fn list_messages(&self, opts: SearchOptions) -> Result<Vec<Message>, TransportError> {
        self.with_session(move |s| {
            let ids = s.search(&opts)?;
            let count = opts.count.unwrap_or(ids.len());
            ids.iter()
                .skip(opts.offset)
                .take(count)
                .map(|id| s.fetch(id))
                .collect()
        })
        .await
    }

    async fn get_message(&self, id: &str) -> Result<Message, TransportError> {
        let id = id.to_string();
        self.with_session(move |s| s.fetch(&id)).await
    }

    async fn move_message(&self, id: &str, destination: &str) -> Result<(), TransportError> {
        let id = id.to_string();
        let destination = destination.to_string();
        self.with_session(move |s| s.move_to(&id, &destination)).await
    }

    async fn copy_message(&self, id: &str, destination: &str) -> Result<(), TransportError> {
        let id = id.to_string();
        let destination = destination.to_string();
        self.with_session(move |s| {
            s.command_ok(&format!("COPY {id} \"{destination}\""))
                .map_err(|e| TransportError::MoveFailed {
                    id: id.clone(),
                    destination: destination.clone(),
                    reason: e.to_string(),
                })?;
            Ok(())
        })
        .await
    }

    async fn get_folder_stats(&self, folder: &str) -> Result<FolderStats, TransportError> {
        let folder = folder.to_string();
        self.with_session(move |s| s.status(&folder)).await
    }
}

// ── Blocking session ────────────────────────────────────────────────

struct Session {
    tls: TlsStream,
    tag: u32,
}

impl Session {
    fn open(config: &ImapConfig) -> Result<Self, TransportError> {
        let tcp = TcpStream::connect((&*config.host, config.port)).map_err(|e| {
            TransportError::ConnectFailed {
                host: config.host.clone(),
                port: config.port,
                reason: e.to_string(),
            }
        })?;
        tcp.set_read_timeout(Some(READ_TIMEOUT))?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );
        let server_name = rustls_pki_types::ServerName::try_from(config.host.clone())
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        let tls = rustls::StreamOwned::new(conn, tcp);

        let mut session = Self { tls, tag: 0 };
        let _greeting = session.read_line()?;

        let login = session.command(&format!(
            "LOGIN \"{}\" \"{}\"",
            config.user,
            config.password.expose_secret()
        ))?;
        if !response_ok(&login) {
            return Err(TransportError::AuthFailed {
                user: config.user.clone(),
            });
        }

        debug!(host = %config.host, "IMAP session established");
        Ok(session)
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match std::io::Read::read(&mut self.tls, &mut byte) {
                Ok(0) => {
                    return Err(TransportError::Protocol("connection closed".into()));
                }
                Ok(_) => {
                    buf.push(byte[0]);
                    if buf.ends_with(b"\r\n") {
                        return Ok(String::from_utf8_lossy(&buf).to_string());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Send a tagged command and read lines until the tagged completion.
    fn command(&mut self, cmd: &str) -> Result<Vec<String>, TransportError> {
        self.tag += 1;
        let tag = format!("A{}", self.tag);
        let full = format!("{tag} {cmd}\r\n");
        IoWrite::write_all(&mut self.tls, full.as_bytes())?;
        IoWrite::flush(&mut self.tls)?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let done = line.starts_with(&tag);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Send a command and fail unless the completion is OK.
    fn command_ok(&mut self, cmd: &str) -> Result<Vec<String>, TransportError> {
        let lines = self.command(cmd)?;
        if response_ok(&lines) {
            Ok(lines)
        } else {
            let status = lines.last().cloned().unwrap_or_default();
            Err(TransportError::Protocol(format!(
                "command failed: {}",
                status.trim_end()
            )))
        }
    }

    fn select(&mut self, folder: &str) -> Result<(), TransportError> {
        self.command_ok(&format!("SELECT \"{folder}\""))
            .map_err(|e| TransportError::SelectFailed {
                folder: folder.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn search(&mut self, opts: &SearchOptions) -> Result<Vec<String>, TransportError> {
        let mut criteria: Vec<String> = Vec::new();
        if let Some(ref phrase) = opts.search_phrase {
            criteria.push(format!("SUBJECT \"{}\"", phrase.replace('"', "")));
        }
        match opts.filter {
            MessageFilter::Unread => criteria.push("UNSEEN".into()),
            MessageFilter::Read => criteria.push("SEEN".into()),
            MessageFilter::Both => {}
        }
        if criteria.is_empty() {
            criteria.push("ALL".into());
        }

        let lines = self.command_ok(&format!("SEARCH {}", criteria.join(" ")))?;
        let mut ids = Vec::new();
        for line in &lines {
            if let Some(rest) = line.strip_prefix("* SEARCH") {
                ids.extend(rest.split_whitespace().map(str::to_string));
            }
        }
        Ok(ids)
    }

    fn fetch(&mut self, id: &str) -> Result<Message, TransportError> {
        // BODY.PEEK so a scan pass doesn't flip \Seen on messages it
        // decides to leave in place.
        let lines = self
            .command_ok(&format!("FETCH {id} (FLAGS BODY.PEEK[])"))
            .map_err(|e| TransportError::FetchFailed(e.to_string()))?;

        if lines.len() < 3 {
            return Err(TransportError::MessageNotFound { id: id.to_string() });
        }

        let flags = parse_flags(&lines[0]);
        let raw: String = lines[1..lines.len() - 1].concat();

        let parsed = MessageParser::default()
            .parse(raw.as_bytes())
            .ok_or_else(|| TransportError::FetchFailed(format!("unparseable message {id}")))?;

        Ok(build_message(id, flags, raw.len() as u64, &parsed))
    }

    fn move_to(&mut self, id: &str, destination: &str) -> Result<(), TransportError> {
        // Prefer MOVE; fall back to COPY + \Deleted + EXPUNGE for servers
        // without the MOVE capability.
        if self.command(&format!("MOVE {id} \"{destination}\""))
            .map(|lines| response_ok(&lines))
            .unwrap_or(false)
        {
            return Ok(());
        }

        let fallback = (|| -> Result<(), TransportError> {
            self.command_ok(&format!("COPY {id} \"{destination}\""))?;
            self.command_ok(&format!("STORE {id} +FLAGS (\\Deleted)"))?;
            self.command_ok("EXPUNGE")?;
            Ok(())
        })();

        fallback.map_err(|e| TransportError::MoveFailed {
            id: id.to_string(),
            destination: destination.to_string(),
            reason: e.to_string(),
        })
    }

    fn status(&mut self, folder: &str) -> Result<FolderStats, TransportError> {
        let lines = self.command_ok(&format!("STATUS \"{folder}\" (MESSAGES UNSEEN)"))?;
        let mut total = 0;
        let mut unread = 0;
        for line in &lines {
            if line.starts_with("* STATUS") {
                total = parse_status_field(line, "MESSAGES").unwrap_or(0);
                unread = parse_status_field(line, "UNSEEN").unwrap_or(0);
            }
        }
        Ok(FolderStats {
            name: folder.to_string(),
            unread,
            total,
            size: 0,
        })
    }
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn response_ok(lines: &[String]) -> bool {
    lines
        .last()
        .is_some_and(|l| l.split_whitespace().nth(1) == Some("OK"))
}

/// Pull flag atoms out of a `* n FETCH (FLAGS (...) ...` line.
fn parse_flags(line: &str) -> Vec<String> {
    let Some(start) = line.find("FLAGS (") else {
        return Vec::new();
    };
    let rest = &line[start + 7..];
    let Some(end) = rest.find(')') else {
        return Vec::new();
    };
    rest[..end]
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Extract a counter from a `* STATUS "folder" (MESSAGES 12 UNSEEN 3)` line.
fn parse_status_field(line: &str, field: &str) -> Option<u32> {
    let idx = line.find(field)?;
    line[idx + field.len()..]
        .split_whitespace()
        .next()
        .map(|s| s.trim_end_matches(')'))
        .and_then(|s| s.parse().ok())
}

fn build_message(id: &str, flags: Vec<String>, size: u64, parsed: &mail_parser::Message) -> Message {
    let from = format_address(parsed.from());
    let to = format_address(parsed.to());
    let subject = parsed.subject().unwrap_or("(no subject)").to_string();
    let body = extract_text(parsed);
    let preview: String = body.chars().take(PREVIEW_CHARS).collect();

    let attachments: Vec<Attachment> = parsed
        .attachments()
        .map(|part| Attachment {
            filename: part
                .attachment_name()
                .unwrap_or("attachment")
                .to_string(),
            content_type: part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            size: part.contents().len() as u64,
        })
        .collect();

    Message {
        id: id.to_string(),
        uid: None,
        from,
        to,
        subject,
        date: parse_date(parsed),
        size,
        flags,
        preview,
        body: Some(body),
        attachments,
    }
}

/// Render an address header as `Name <addr>` (or just the address).
fn format_address(header: Option<&mail_parser::Address>) -> String {
    let Some(addr) = header.and_then(|a| a.first()) else {
        return "unknown".to_string();
    };
    let address = addr.address().unwrap_or("unknown");
    match addr.name() {
        Some(name) if !name.is_empty() => format!("{name} <{address}>"),
        _ => address.to_string(),
    }
}

/// Extract readable text from a parsed email, preferring plain text.
fn extract_text(parsed: &mail_parser::Message) -> String {
    if let Some(text) = parsed.body_text(0) {
        return text.to_string();
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    String::new()
}

/// Strip HTML tags from content (basic).
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_date(parsed: &mail_parser::Message) -> DateTime<Utc> {
    parsed
        .date()
        .and_then(|d| {
            chrono::NaiveDate::from_ymd_opt(d.year as i32, u32::from(d.month), u32::from(d.day))
                .and_then(|date| {
                    date.and_hms_opt(
                        u32::from(d.hour),
                        u32::from(d.minute),
                        u32::from(d.second),
                    )
                })
                .map(|naive| naive.and_utc())
        })
        .unwrap_or_else(Utc::now)
}

// ── Tests ───────────────────────────────────────────────────────────
