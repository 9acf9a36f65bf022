//! Run the bot service.
//!
//! Startup order mirrors the data flow: configuration, deployment counter,
//! HTTP status page, session bootstrap (local file → remote download → QR
//! pairing), then the connection manager, which owns the watchers.

use std::sync::Arc;
use tracing::info;

use statusbot::config::Config;
use statusbot::deploy;
use statusbot::server;
use statusbot::wa::{
    AuthMode, ConnectionManager, HttpSessionVault, Jid, MockConnector, SessionStore, WaError,
};

/// JID used by the loopback transport.
const LOOPBACK_JID: &str = "statusbot@s.whatsapp.net";

pub async fn execute(
    port: Option<u16>,
    session_dir: Option<String>,
    loopback: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env();
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dir) = session_dir {
        config.session_dir = dir.into();
    }
    let config = Arc::new(config);

    let log = deploy::record_deployment(
        &config.deployment_log,
        &deploy::today_in(config.time_zone),
    )?;
    info!(
        daily = log.daily_count,
        total = log.total_count,
        "deployment recorded"
    );

    let _server = server::spawn(config.port)?;
    info!(port = config.port, "status page listening");

    let store = SessionStore::new(&config.session_dir);
    let vault = HttpSessionVault::new(&config.session_vault_url);
    let auth = store
        .resolve_auth_mode(config.session_id.as_deref(), &vault)
        .await;
    if auth == AuthMode::QrPairing {
        info!("waiting for QR pairing once the transport connects");
    }

    if loopback {
        info!("using in-process loopback transport");
        let connector = MockConnector::loopback(Jid(LOOPBACK_JID.to_string()));
        let mut manager = ConnectionManager::new(connector, Arc::clone(&config), store);
        manager.run(auth).await?;
        return Ok(());
    }

    // The protocol client is an external collaborator; a live deployment
    // links a WaConnector implementation here.
    Err(Box::new(WaError::Transport(
        "no live WhatsApp transport is linked into this build; \
         run with --loopback for the in-process transport"
            .to_string(),
    )))
}
