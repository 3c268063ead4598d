//! Outbound SMTP for quarantine reports, via lettre.

use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::info;

use crate::config::SmtpConfig;
use crate::error::NotifyError;
use crate::triage::ScanSummary;

/// Sends plain-text mails over SMTP with STARTTLS relay auth.
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Send a plain-text email.
    pub fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let creds = Credentials::new(
            self.config.user.clone(),
            self.config.password.expose_secret().to_string(),
        );

        let transport = SmtpTransport::relay(&self.config.host)
            .map_err(|e| NotifyError::SendFailed(format!("SMTP relay error: {e}")))?
            .port(self.config.port)
            .credentials(creds)
            .build();

        let email = Message::builder()
            .from(self.config.from.parse().map_err(|e| {
                NotifyError::InvalidAddress {
                    address: self.config.from.clone(),
                    reason: format!("{e}"),
                }
            })?)
            .to(to.parse().map_err(|e| NotifyError::InvalidAddress {
                address: to.to_string(),
                reason: format!("{e}"),
            })?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| NotifyError::BuildFailed(format!("{e}")))?;

        transport
            .send(&email)
            .map_err(|e| NotifyError::SendFailed(format!("{e}")))?;

        info!("Email sent to {to}");
        Ok(())
    }

    /// Send a quarantine report summarizing a scan pass.
    pub fn send_quarantine_report(
        &self,
        to: &str,
        summary: &ScanSummary,
        quarantined: &[String],
    ) -> Result<(), NotifyError> {
        let subject = format!(
            "Mail security report: {} quarantined of {} scanned",
            quarantined.len(),
            summary.scanned
        );
        let body = render_report(summary, quarantined);
        self.send(to, &subject, &body)
    }
}

fn render_report(summary: &ScanSummary, quarantined: &[String]) -> String {
    let mut body = format!(
        "Scanned: {}\nSafe: {}\nSuspicious: {}\nDangerous: {}\nAverage phishing score: {:.1}\n",
        summary.scanned, summary.safe, summary.suspicious, summary.dangerous,
        summary.avg_phishing_score
    );
    if quarantined.is_empty() {
        body.push_str("\nNo messages were quarantined.\n");
    } else {
        body.push_str("\nQuarantined messages:\n");
        for line in quarantined {
            body.push_str("  - ");
            body.push_str(line);
            body.push('\n');
        }
    }
    body
}
