use std::sync::Arc;

use anyhow::Context;

use rep_outreach::api::{AppState, outreach_routes};
use rep_outreach::composer::Composer;
use rep_outreach::config::OutreachConfig;
use rep_outreach::llm::create_provider;
use rep_outreach::rewrite::Rewriter;
use rep_outreach::roster::{RosterSource, SheetsRosterSource};
use rep_outreach::session::{SessionStore, spawn_expiry_task};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = OutreachConfig::from_env().context("invalid configuration")?;

    eprintln!("📬 Rep Outreach v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Roster: sheet {} range {}", config.sheets.sheet_id, config.sheets.range);
    match &config.llm {
        Some(llm) => eprintln!("   Rewriting: {} ({})", llm.backend, llm.model),
        None => eprintln!("   Rewriting: disabled (no provider API key)"),
    }
    if let Some(from) = &config.from_address {
        eprintln!("   Drafts from: {}", from);
    }
    eprintln!("   Session idle TTL: {}s", config.session_ttl.as_secs());
    eprintln!("   API: http://0.0.0.0:{}/api/sessions", config.port);

    let rewriter = match &config.llm {
        Some(llm_config) => {
            let llm = create_provider(llm_config).context("failed to create LLM provider")?;
            Some(Arc::new(Rewriter::new(llm, config.rewrite.clone())))
        }
        None => None,
    };

    let roster: Arc<dyn RosterSource> = Arc::new(
        SheetsRosterSource::new(config.sheets.clone()).context("failed to build roster client")?,
    );

    let sessions = SessionStore::new(config.session_ttl);
    let _expiry_handle = spawn_expiry_task(Arc::clone(&sessions));

    let state = AppState {
        roster,
        composer: Arc::new(Composer::new(config.links.clone())),
        rewriter,
        sessions,
        from_address: config.from_address.clone(),
        compose_base: config.compose_base.clone(),
    };
    let app = outreach_routes(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Outreach server started");
    axum::serve(listener, app).await?;

    Ok(())
}
