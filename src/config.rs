//! Configuration types, built from environment variables.

use secrecy::SecretString;

/// IMAP connection settings.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
}

/// SMTP settings for the quarantine report notifier.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub from: String,
}

/// Folder names used for triage moves.
#[derive(Debug, Clone)]
pub struct FolderConfig {
    pub inbox: String,
    pub safe_inbox: String,
    pub quarantine: String,
    pub spam: String,
    pub trash: String,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            inbox: "INBOX".into(),
            safe_inbox: "safe".into(),
            quarantine: "quarantine".into(),
            spam: "Junk".into(),
            trash: "Trash".into(),
        }
    }
}

/// Scanner configuration. Immutable for the scanner's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SecurityConfig {
    /// Substrings matched case-insensitively against sender tokens.
    pub known_safe_senders: Vec<String>,
    /// File-extension-like substrings that flag attachments as critical,
    /// on top of the built-in executable extension set.
    pub critical_threats: Vec<String>,
    /// Extra phrases appended to the built-in phishing phrase list.
    pub phishing_keywords: Vec<String>,
    // Declared in the schema but not consulted by the scorer. Kept so
    // existing configs parse; wiring them in would change triage outcomes.
    pub attachment_blacklist: Vec<String>,
    pub link_threat_patterns: Vec<String>,
    pub credential_request_phrases: Vec<String>,
}

/// Polling loop settings.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub enabled: bool,
    pub poll_interval_secs: u64,
    /// Cap on messages fetched per pass.
    pub batch_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_secs: 30,
            batch_size: 50,
        }
    }
}

/// Where quarantine reports go, if anywhere.
#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub quarantine_report_to: Option<String>,
}

/// Full daemon configuration.
#[derive(Debug, Clone)]
pub struct MailguardConfig {
    pub imap: ImapConfig,
    pub smtp: Option<SmtpConfig>,
    pub folders: FolderConfig,
    pub security: SecurityConfig,
    pub listener: ListenerConfig,
    pub notifications: NotificationConfig,
}

impl MailguardConfig {
    /// Build config from environment variables.
    /// Returns `None` if `MAILGUARD_IMAP_HOST` is not set (daemon disabled).
    pub fn from_env() -> Option<Self> {
        let imap_host = std::env::var("MAILGUARD_IMAP_HOST").ok()?;

        let imap_port: u16 = env_parse("MAILGUARD_IMAP_PORT", 993);
        let imap_user = std::env::var("MAILGUARD_IMAP_USER").unwrap_or_default();
        let imap_password =
            SecretString::from(std::env::var("MAILGUARD_IMAP_PASSWORD").unwrap_or_default());

        let smtp = std::env::var("MAILGUARD_SMTP_HOST").ok().map(|host| {
            let user = std::env::var("MAILGUARD_SMTP_USER")
                .unwrap_or_else(|_| imap_user.clone());
            SmtpConfig {
                port: env_parse("MAILGUARD_SMTP_PORT", 587),
                password: SecretString::from(
                    std::env::var("MAILGUARD_SMTP_PASSWORD").unwrap_or_default(),
                ),
                from: std::env::var("MAILGUARD_SMTP_FROM").unwrap_or_else(|_| user.clone()),
                host,
                user,
            }
        });

        let folders = FolderConfig {
            inbox: env_or("MAILGUARD_FOLDER_INBOX", "INBOX"),
            safe_inbox: env_or("MAILGUARD_FOLDER_SAFE", "safe"),
            quarantine: env_or("MAILGUARD_FOLDER_QUARANTINE", "quarantine"),
            spam: env_or("MAILGUARD_FOLDER_SPAM", "Junk"),
            trash: env_or("MAILGUARD_FOLDER_TRASH", "Trash"),
        };

        let security = SecurityConfig {
            known_safe_senders: env_list("MAILGUARD_SAFE_SENDERS"),
            critical_threats: env_list("MAILGUARD_CRITICAL_THREATS"),
            phishing_keywords: env_list("MAILGUARD_PHISHING_KEYWORDS"),
            attachment_blacklist: env_list("MAILGUARD_ATTACHMENT_BLACKLIST"),
            link_threat_patterns: env_list("MAILGUARD_LINK_THREAT_PATTERNS"),
            credential_request_phrases: env_list("MAILGUARD_CREDENTIAL_PHRASES"),
        };

        let listener = ListenerConfig {
            enabled: std::env::var("MAILGUARD_LISTENER_ENABLED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            poll_interval_secs: env_parse("MAILGUARD_POLL_INTERVAL_SECS", 30),
            batch_size: env_parse("MAILGUARD_BATCH_SIZE", 50),
        };

        let notifications = NotificationConfig {
            quarantine_report_to: std::env::var("MAILGUARD_QUARANTINE_REPORT_TO").ok(),
        };

        Some(Self {
            imap: ImapConfig {
                host: imap_host,
                port: imap_port,
                user: imap_user,
                password: imap_password,
            },
            smtp,
            folders,
            security,
            listener,
            notifications,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
