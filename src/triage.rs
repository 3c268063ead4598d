//! Triage policy — maps a threat verdict to a folder-move decision.
//!
//! Evaluated independently per message; the policy itself performs no I/O.
//! The polling service applies the resulting action through the transport.

use serde::{Deserialize, Serialize};

use crate::scanner::{ScannedMessage, SecurityAnalysis, ThreatLevel};

/// Where a message should go after analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum TriageAction {
    /// Move to the quarantine folder for human review.
    Quarantine,
    /// Move to the safe-inbox folder.
    SafeInbox,
    /// Leave in place.
    None,
}

impl TriageAction {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Quarantine => "quarantine",
            Self::SafeInbox => "safe-inbox",
            Self::None => "none",
        }
    }
}

/// Decide the destination for a message from its analysis.
///
/// Dangerous always quarantines. Suspicious splits on the phishing score:
/// high-scoring suspicious messages are quarantined, low-scoring ones go to
/// the safe inbox for reading outside the hot path.
pub fn triage(analysis: &SecurityAnalysis) -> TriageAction {
    match analysis.level {
        ThreatLevel::Dangerous => TriageAction::Quarantine,
        ThreatLevel::Suspicious if analysis.phishing_score >= 5 => TriageAction::Quarantine,
        ThreatLevel::Suspicious => TriageAction::SafeInbox,
        ThreatLevel::Safe => TriageAction::None,
    }
}

/// Aggregate counters over one scan batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scanned: usize,
    pub safe: usize,
    pub suspicious: usize,
    pub dangerous: usize,
    /// Mean phishing score, rounded to one decimal.
    pub avg_phishing_score: f64,
}

impl ScanSummary {
    /// Build a summary from scanned messages.
    pub fn from_scanned(scanned: &[ScannedMessage]) -> Self {
        let mut safe = 0;
        let mut suspicious = 0;
        let mut dangerous = 0;
        let mut score_sum: u32 = 0;

        for s in scanned {
            match s.security_analysis.level {
                ThreatLevel::Safe => safe += 1,
                ThreatLevel::Suspicious => suspicious += 1,
                ThreatLevel::Dangerous => dangerous += 1,
            }
            score_sum += u32::from(s.security_analysis.phishing_score);
        }

        let avg = if scanned.is_empty() {
            0.0
        } else {
            let raw = f64::from(score_sum) / scanned.len() as f64;
            (raw * 10.0).round() / 10.0
        };

        Self {
            scanned: scanned.len(),
            safe,
            suspicious,
            dangerous,
            avg_phishing_score: avg,
        }
    }
}
