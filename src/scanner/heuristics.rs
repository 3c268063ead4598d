//! Heuristic tables and patterns used by the security scanner.
//!
//! Kept as named module-level constants rather than inline literals so
//! tests (and operators reading logs) can enumerate exactly what the
//! scanner matches on.

use std::sync::LazyLock;

use regex::Regex;

/// Built-in phishing phrases. Extended at scan time by
/// `SecurityConfig::phishing_keywords`.
pub const PHISHING_PHRASES: [&str; 18] = [
    "urgent",
    "immediate action",
    "verify account",
    "password",
    "security alert",
    "your account has been compromised",
    "click here to verify",
    "update your information",
    "confirm your identity",
    "act now",
    "limited time",
    "suspended account",
    "security breach",
    "unusual activity",
    "click to unlock",
    "verify your details",
    "verify your account",
    "verify your identity",
];

/// Phrases that indicate a credential-theft attempt.
pub const CREDENTIAL_PHRASES: [&str; 12] = [
    "password",
    "verify account",
    "update password",
    "change password",
    "confirm password",
    "reset password",
    "account verification",
    "verify your account",
    "verify identity",
    "click to verify",
    "account with click",
    "update with click",
];

/// Pressure/urgency wording.
pub const URGENCY_WORDS: [&str; 9] = [
    "immediately",
    "right now",
    "as soon as possible",
    "must act",
    "urgent",
    "critical",
    "important",
    "deadline",
    "final notice",
];

/// Names of well-known threat categories.
pub const KNOWN_THREAT_KEYWORDS: [&str; 7] = [
    "phishing",
    "malware",
    "virus",
    "trojan",
    "ransomware",
    "spyware",
    "adware",
];

/// URL shortener hosts. Any link containing one of these is suspicious.
pub const URL_SHORTENERS: [&str; 5] = ["bit.ly", "tinyurl", "t.co", "lnkd.in", "goo.gl"];

/// TLDs commonly seen in throwaway/abuse domains.
pub const SUSPICIOUS_TLDS: [&str; 18] = [
    "xyz", "top", "vip", "ml", "ga", "cf", "tk", "co", "ws", "gq", "pw", "cc", "me", "ro",
    "so", "we", "xc", "za",
];

/// Executable extensions, matched against a lowercased filename.
pub static EXECUTABLE_EXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(exe|scr|bat|js|vbs|ps1|sh|jar)$").unwrap());

/// Office document and archive extensions.
pub static OFFICE_ARCHIVE_EXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(pdf|docx?|xlsx?|pptx?|zip|rar|7z|tar|tgz)$").unwrap());

/// Domain-like token: `label.tld[:port][/path]`.
pub static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9-]+\.[a-zA-Z]{2,}(?::\d+)?(?:/\S*)?").unwrap());

/// Last dot-segment of a link.
pub static TLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.([a-z]{2,})$").unwrap());

/// IPv4 address with optional port.
pub static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]{1,3}\.){3}[0-9]{1,3}(?::[0-9]{1,5})?$").unwrap());

// Fixed finding strings. Exact text matters — downstream reporting and the
// triage policy tests match on these.
pub const THREAT_EXEC_ATTACHMENTS: &str = "Critical threats: Executable attachments detected";
pub const THREAT_EXEC_BLOCKED_FILES: &str =
    "Blocked files: .exe, .scr, .bat, .js, .vbs, .ps1, .sh, .jar";
pub const THREAT_SUSPICIOUS_LINKS: &str =
    "Suspicious links detected: URL shorteners, suspicious TLDs, IP addresses";
pub const THREAT_CREDENTIAL_THEFT: &str =
    "Credential theft attempts detected: Password verification, account updates";
pub const THREAT_SUSPICIOUS_ATTACHMENTS: &str =
    "Suspicious attachments: Office documents, archives";

pub const REASON_KNOWN_SENDER: &str = "Message from known safe sender";
pub const REASON_EXEC_ATTACHMENT: &str = "High risk: Executable attachment detected";
pub const REASON_SUSPICIOUS_LINKS: &str = "High risk: Suspicious links detected";
pub const REASON_CREDENTIAL_THEFT: &str = "Critical: Credential theft attempt detected";
pub const REASON_SUSPICIOUS_ATTACHMENTS: &str = "Warning: Suspicious attachments detected";
pub const REASON_KNOWN_THREATS: &str = "Warning: Known threat patterns detected";
pub const REASON_URGENCY: &str = "Warning: Urgent language detected";
