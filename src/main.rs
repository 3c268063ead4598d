use std::sync::Arc;

use mailguard::config::MailguardConfig;
use mailguard::notify::SmtpNotifier;
use mailguard::scanner::SecurityScanner;
use mailguard::service::spawn_triage_service;
use mailguard::tools::MailTools;
use mailguard::transport::imap::ImapTransport;
use mailguard::transport::MailTransport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let Some(config) = MailguardConfig::from_env() else {
        eprintln!("Error: MAILGUARD_IMAP_HOST not set");
        eprintln!("  export MAILGUARD_IMAP_HOST=imap.example.com");
        eprintln!("  export MAILGUARD_IMAP_USER=you@example.com");
        eprintln!("  export MAILGUARD_IMAP_PASSWORD=...");
        std::process::exit(1);
    };

    eprintln!("🛡  Mailguard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   IMAP: {}:{}", config.imap.host, config.imap.port);
    eprintln!(
        "   Folders: inbox={} safe={} quarantine={}",
        config.folders.inbox, config.folders.safe_inbox, config.folders.quarantine
    );
    eprintln!(
        "   Safe senders: {}",
        if config.security.known_safe_senders.is_empty() {
            "none".to_string()
        } else {
            config.security.known_safe_senders.join(", ")
        }
    );

    let transport: Arc<dyn MailTransport> = Arc::new(ImapTransport::new(config.imap.clone()));
    let scanner = Arc::new(SecurityScanner::new(&config.security));
    let notifier = config.smtp.clone().map(SmtpNotifier::new);

    let tools = MailTools::new(
        Arc::clone(&transport),
        Arc::clone(&scanner),
        config.folders.clone(),
        notifier,
        config.notifications.clone(),
    );

    if !config.listener.enabled {
        // One-shot mode: scan, triage, report, exit.
        eprintln!("   Listener: disabled (running single check)\n");
        let result = tools.finish_check().await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        transport.disconnect().await.ok();
        return Ok(());
    }

    eprintln!(
        "   Listener: polling every {}s (batch cap {})\n",
        config.listener.poll_interval_secs, config.listener.batch_size
    );

    let service = spawn_triage_service(
        config.listener.clone(),
        config.folders.clone(),
        Arc::clone(&transport),
        Arc::clone(&scanner),
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    service.stop();
    service.join().await;
    transport.disconnect().await.ok();

    Ok(())
}
