//! Security scanner — rule-based threat analysis of a single message.
//!
//! `SecurityScanner::analyze_message` is a pure function of the message and
//! the scanner's immutable config: no I/O, no hidden state, deterministic.
//! It never fails — absent optional fields default to empty values. The
//! checks run in a fixed order so `reasons` ordering is stable; the score
//! itself is pure addition and order-independent.

pub mod heuristics;
pub mod links;

use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::message::Message;
use crate::scanner::heuristics as h;

// ── Verdict types ───────────────────────────────────────────────────

/// Three-valued threat verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Safe,
    Suspicious,
    Dangerous,
}

impl ThreatLevel {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Suspicious => "suspicious",
            Self::Dangerous => "dangerous",
        }
    }
}

/// Classification of the From address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderReputation {
    Known,
    Unknown,
    Suspicious,
}

/// Structured threat verdict for one message. Created fresh on every call;
/// consumed immediately by the triage policy or serialized for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAnalysis {
    pub level: ThreatLevel,
    /// Human-readable findings, appended in evaluation order.
    pub reasons: Vec<String>,
    /// Additive severity estimate, clamped to `0..=10`.
    pub phishing_score: u8,
    pub attachment_threats: Vec<String>,
    pub link_threats: Vec<String>,
    pub sender_reputation: SenderReputation,
}

/// A message paired with its analysis — the scan-report row shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub security_analysis: SecurityAnalysis,
}

// ── Scanner ─────────────────────────────────────────────────────────

/// Stateless, thread-safe scanner over an immutable config.
pub struct SecurityScanner {
    /// Lowercased `known_safe_senders`.
    safe_senders: Vec<String>,
    /// Lowercased `critical_threats`.
    critical_threats: Vec<String>,
    /// Lowercased `phishing_keywords`.
    phishing_keywords: Vec<String>,
}

impl SecurityScanner {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            safe_senders: lowered(&config.known_safe_senders),
            critical_threats: lowered(&config.critical_threats),
            phishing_keywords: lowered(&config.phishing_keywords),
        }
    }

    /// Analyze one message and produce a threat verdict.
    pub fn analyze_message(&self, message: &Message) -> SecurityAnalysis {
        let mut reasons: Vec<String> = Vec::new();
        let mut attachment_threats: Vec<String> = Vec::new();
        let mut link_threats: Vec<String> = Vec::new();
        let mut score: u32 = 0;

        let body = message.body.as_deref().unwrap_or("");
        let content_lower =
            format!("{}{}{}", body, message.subject, message.from).to_lowercase();
        let subject_lower = message.subject.to_lowercase();
        let from_lower = message.from.to_lowercase();

        // 1. Sender reputation. Split the From header on angle brackets so
        // both the display name and the address are candidate tokens.
        let sender_tokens: Vec<&str> = from_lower.split(['<', '>']).collect();

        let mut sender_reputation = SenderReputation::Unknown;
        if self
            .safe_senders
            .iter()
            .any(|s| sender_tokens.iter().any(|t| t.contains(s.as_str())))
        {
            sender_reputation = SenderReputation::Known;
        } else if sender_tokens
            .iter()
            .any(|t| t.contains("@.") && !t.contains("@protonmail"))
        {
            sender_reputation = SenderReputation::Suspicious;
        }

        if sender_reputation == SenderReputation::Known {
            reasons.push(h::REASON_KNOWN_SENDER.to_string());
        }

        // 2. Executable attachments.
        let has_executable_attachment = message.attachments.iter().any(|a| {
            let filename = a.filename.to_lowercase();
            self.critical_threats
                .iter()
                .any(|t| filename.ends_with(t.as_str()))
                || h::EXECUTABLE_EXT_RE.is_match(&filename)
        });

        if has_executable_attachment {
            attachment_threats.push(h::THREAT_EXEC_ATTACHMENTS.to_string());
            attachment_threats.push(h::THREAT_EXEC_BLOCKED_FILES.to_string());
            reasons.push(h::REASON_EXEC_ATTACHMENT.to_string());
            score += 6;
        }

        // 3. Suspicious links. Links are extracted from body + subject only;
        // the From header is not link material.
        let link_text = format!("{}{}", body, message.subject);
        if links::extract_links(&link_text)
            .iter()
            .any(|l| links::is_suspicious_link(l))
        {
            link_threats.push(h::THREAT_SUSPICIOUS_LINKS.to_string());
            reasons.push(h::REASON_SUSPICIOUS_LINKS.to_string());
            score += 5;
        }

        // 4. Phishing phrases. Contributes to the score silently — no
        // reason line for this check alone.
        if self.matches_phishing_phrase(&content_lower, &subject_lower) {
            score += 4;
        }

        // 5. Credential requests.
        if matches_any(&h::CREDENTIAL_PHRASES, &content_lower, &subject_lower) {
            link_threats.push(h::THREAT_CREDENTIAL_THEFT.to_string());
            reasons.push(h::REASON_CREDENTIAL_THEFT.to_string());
            score += 5;
        }

        // 6. Office/archive attachments.
        let suspicious_files: Vec<String> = message
            .attachments
            .iter()
            .filter(|a| h::OFFICE_ARCHIVE_EXT_RE.is_match(&a.filename))
            .map(|a| format!("Suspicious attachment: {}", a.filename))
            .collect();

        if !suspicious_files.is_empty() {
            attachment_threats.push(h::THREAT_SUSPICIOUS_ATTACHMENTS.to_string());
            attachment_threats.extend(suspicious_files);
            reasons.push(h::REASON_SUSPICIOUS_ATTACHMENTS.to_string());
            score += 3;
        }

        // 7. Known threat keywords.
        if matches_any(&h::KNOWN_THREAT_KEYWORDS, &content_lower, &subject_lower) {
            reasons.push(h::REASON_KNOWN_THREATS.to_string());
            score += 2;
        }

        // 8. Urgency language.
        if matches_any(&h::URGENCY_WORDS, &content_lower, &subject_lower) {
            reasons.push(h::REASON_URGENCY.to_string());
            score += 1;
        }

        // Level assignment uses the raw (unclamped) score. The second
        // disjunct is a backstop: the executable branch always records a
        // reason, so in practice `score >= 8` decides alone.
        let level = if score >= 8 || (reasons.is_empty() && has_executable_attachment) {
            ThreatLevel::Dangerous
        } else if score >= 5 || !attachment_threats.is_empty() || !link_threats.is_empty() {
            ThreatLevel::Suspicious
        } else {
            ThreatLevel::Safe
        };

        SecurityAnalysis {
            level,
            reasons,
            phishing_score: score.min(10) as u8,
            attachment_threats,
            link_threats,
            sender_reputation,
        }
    }

    /// Pair each message with its analysis. Pure — no side effects.
    pub fn scan_batch(&self, messages: &[Message]) -> Vec<ScannedMessage> {
        messages
            .iter()
            .map(|m| ScannedMessage {
                message: m.clone(),
                security_analysis: self.analyze_message(m),
            })
            .collect()
    }

    /// Count messages whose verdict matches `level` exactly.
    pub fn threat_level_count(&self, messages: &[Message], level: ThreatLevel) -> usize {
        messages
            .iter()
            .filter(|m| self.analyze_message(m).level == level)
            .count()
    }

    fn matches_phishing_phrase(&self, content: &str, subject: &str) -> bool {
        matches_any(&h::PHISHING_PHRASES, content, subject)
            || self
                .phishing_keywords
                .iter()
                .any(|p| content.contains(p.as_str()) || subject.contains(p.as_str()))
    }
}

fn matches_any(phrases: &[&str], content: &str, subject: &str) -> bool {
    phrases
        .iter()
        .any(|p| content.contains(p) || subject.contains(p))
}

fn lowered(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

// ── Tests ───────────────────────────────────────────────────────────
