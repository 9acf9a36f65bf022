//! Connection lifecycle management.
//!
//! State machine over {Connecting, Open, Closed}: open a session through the
//! connector, consume its lifecycle events, and keep the periodic tasks
//! bound to the live client handle. An explicit logout terminates the
//! manager; every other close goes back to Connecting through the backoff
//! policy until it is exhausted.

use chrono::{Datelike, Utc};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::bio::BioRotator;
use super::retry::ReconnectPolicy;
use super::session::SessionStore;
use super::status::StatusWatcher;
use super::task::TaskHandle;
use super::traits::{
    AuthMode, DisconnectReason, WaClient, WaConnector, WaError, WaEvent, WaResult,
};
use crate::config::Config;

const WELCOME_IMAGE_URL: &str = "https://files.catbox.moe/wwl2my.jpg";

pub struct ConnectionManager<T: WaConnector> {
    connector: T,
    config: Arc<Config>,
    session: SessionStore,
    policy: ReconnectPolicy,
}

impl<T: WaConnector> ConnectionManager<T> {
    pub fn new(connector: T, config: Arc<Config>, session: SessionStore) -> Self {
        Self {
            connector,
            config,
            session,
            policy: ReconnectPolicy::new(),
        }
    }

    /// Drive the connection until logout or until reconnection gives up.
    ///
    /// The welcome message goes out on the first successful open of the
    /// process lifetime; the bio rotator and status watcher are (re)started
    /// with the fresh client handle on every open.
    pub async fn run(&mut self, initial_auth: AuthMode) -> WaResult<()> {
        let mut auth = initial_auth;
        let mut welcomed = false;
        let mut bio_task: Option<TaskHandle> = None;
        let mut status_task: Option<TaskHandle> = None;

        loop {
            info!(?auth, "connecting");
            let mut session = match self.connector.connect(auth).await {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, "connection attempt failed");
                    match self.policy.next_delay() {
                        Some(delay) => {
                            warn!(?delay, "retrying connect");
                            sleep(delay).await;
                            continue;
                        }
                        None => {
                            stop_tasks(&mut bio_task, &mut status_task);
                            error!("reconnect attempts exhausted");
                            return Err(e);
                        }
                    }
                }
            };

            let mut reason = DisconnectReason::Unknown;
            while let Some(event) = session.events.recv().await {
                match event {
                    WaEvent::Open => {
                        info!("connected successfully");
                        self.policy.reset();
                        self.on_open(
                            &session.client,
                            &mut bio_task,
                            &mut status_task,
                            &mut welcomed,
                        )
                        .await;
                    }
                    WaEvent::PairingQr(code) => {
                        info!("scan the QR code with WhatsApp to pair this device");
                        if let Err(e) = qr2term::print_qr(&code) {
                            warn!(error = %e, "failed to render pairing QR code");
                        }
                    }
                    WaEvent::CredsUpdate(blob) => {
                        if let Err(e) = self.session.persist_credentials(&blob) {
                            warn!(error = %e, "failed to persist credential update");
                        }
                    }
                    WaEvent::Closed(r) => {
                        reason = r;
                        break;
                    }
                }
            }

            if reason.is_logged_out() {
                info!("logged out, connection manager shutting down");
                stop_tasks(&mut bio_task, &mut status_task);
                return Ok(());
            }

            // The bio timer stops across the gap; both tasks come back with
            // the fresh handle on the next open.
            if let Some(task) = bio_task.take() {
                task.stop();
            }

            auth = if self.session.has_local_session() {
                AuthMode::Restored
            } else {
                AuthMode::QrPairing
            };

            match self.policy.next_delay() {
                Some(delay) => {
                    warn!(?reason, ?delay, "connection closed, reconnecting");
                    sleep(delay).await;
                }
                None => {
                    stop_tasks(&mut bio_task, &mut status_task);
                    error!(?reason, "connection closed, reconnect attempts exhausted");
                    return Err(WaError::Network(
                        "reconnect attempts exhausted".to_string(),
                    ));
                }
            }
        }
    }

    async fn on_open(
        &mut self,
        client: &T::Client,
        bio_task: &mut Option<TaskHandle>,
        status_task: &mut Option<TaskHandle>,
        welcomed: &mut bool,
    ) {
        if let Some(task) = bio_task.take() {
            task.stop();
        }
        if let Some(task) = status_task.take() {
            task.stop();
        }
        *bio_task = BioRotator::from_config(&self.config).start(client.clone());
        *status_task = Some(StatusWatcher::from_config(&self.config).start(client.clone()));

        if !*welcomed {
            if let Err(e) = send_welcome(client, &self.config).await {
                warn!(error = %e, "failed to send welcome message");
            }
            *welcomed = true;
        }
    }
}

fn stop_tasks(bio_task: &mut Option<TaskHandle>, status_task: &mut Option<TaskHandle>) {
    if let Some(task) = bio_task.take() {
        task.stop();
    }
    if let Some(task) = status_task.take() {
        task.stop();
    }
}

async fn send_welcome<C: WaClient>(client: &C, config: &Config) -> WaResult<()> {
    let caption = welcome_caption(config);
    let own_jid = client.self_jid().clone();
    client
        .send_image_message(&own_jid, WELCOME_IMAGE_URL, &caption)
        .await
}

fn welcome_caption(config: &Config) -> String {
    let now = Utc::now().with_timezone(&config.time_zone);
    let date = format!(
        "{}{} {} {}",
        now.day(),
        day_ordinal(now.day()),
        now.format("%B"),
        now.year()
    );
    format!(
        "*WhatsApp Status Bot Connected!*\n\n\
         🔹 *Auto Status Viewer:* Enabled\n\
         ❤️ *Auto Reactions:* {}\n\
         📝 *Auto Bio:* {}\n\n\
         📅 *Date:* {}",
        enabled_label(config.auto_status_react),
        enabled_label(config.auto_bio_enabled),
        date
    )
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "Enabled"
    } else {
        "Disabled"
    }
}

fn day_ordinal(day: u32) -> &'static str {
    match day % 100 {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}
