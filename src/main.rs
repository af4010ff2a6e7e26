use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use clinic_intake::config::{self, IntakeConfig};
use clinic_intake::intent::{IntentClassifier, anthropic_intent_model};
use clinic_intake::language::{GoogleTranslate, LanguageService};
use clinic_intake::messaging::{DisabledTransport, MessagingTransport, TwilioWhatsApp};
use clinic_intake::pipeline::{Orchestrator, OrchestratorConfig, OrchestratorDeps};
use clinic_intake::store::{Database, LibSqlBackend};
use clinic_intake::webhook::webhook_routes;

/// Install the subscriber. The returned guard flushes the log file on drop.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "clinic-intake.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before config parsing, which logs.
    let _log_guard = init_tracing(config::log_dir_from_env().as_deref());
    let config = IntakeConfig::from_env().context("invalid configuration")?;

    eprintln!("🏥 Clinic Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://{}/api/whatsapp/webhook", config.bind_addr);
    if let Some(dir) = &config.log_dir {
        eprintln!("   Logs: {}", dir.display());
    }

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("opening database at {}", config.db_path.display()))?,
    );
    eprintln!("   Database: {}", config.db_path.display());

    // ── Capabilities ─────────────────────────────────────────────────────
    let language: Arc<dyn LanguageService> = Arc::new(
        GoogleTranslate::new(config.translate_timeout).context("building translation client")?,
    );

    let classifier = match &config.classifier {
        Some(classifier_config) => match anthropic_intent_model(classifier_config) {
            Ok(model) => {
                eprintln!("   Classifier: {}", classifier_config.model);
                IntentClassifier::new(model)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Intent model unavailable, using keyword fallback");
                eprintln!("   Classifier: keyword fallback");
                IntentClassifier::keyword_only()
            }
        },
        None => {
            eprintln!("   Classifier: keyword fallback");
            IntentClassifier::keyword_only()
        }
    };

    let transport: Arc<dyn MessagingTransport> = match &config.twilio {
        Some(twilio) => {
            eprintln!("   WhatsApp: Twilio ({})", twilio.from_number);
            Arc::new(TwilioWhatsApp::new(twilio.clone()).context("building Twilio client")?)
        }
        None => {
            eprintln!("   WhatsApp: disabled (replies are logged, not sent)");
            Arc::new(DisabledTransport)
        }
    };

    // ── Orchestrator ─────────────────────────────────────────────────────
    let orchestrator = Arc::new(Orchestrator::new(
        OrchestratorConfig {
            canonical_language: config.canonical_language.clone(),
            serialize_turns: config.serialize_turns,
        },
        OrchestratorDeps {
            db,
            language,
            classifier: Arc::new(classifier),
            transport,
        },
    ));

    // ── Server ───────────────────────────────────────────────────────────
    let app = webhook_routes(orchestrator);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "Webhook server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
