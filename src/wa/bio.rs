//! Periodic profile-bio rotation.
//!
//! Every tick picks a random template from the configured pool, substitutes
//! `{time}`, `{date}` and `{randomEmoji}` for the current wall clock in the
//! configured time zone plus a random emoji, and pushes the result as the
//! account's profile status. Failures are logged and the timer keeps going.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::pick_random;
use super::task::TaskHandle;
use super::traits::{WaClient, WaResult};
use crate::config::Config;

/// Bio rotation settings, snapshotted from [`Config`].
#[derive(Debug, Clone)]
pub struct BioRotator {
    enabled: bool,
    interval: Duration,
    templates: Arc<Vec<String>>,
    emojis: Arc<Vec<String>>,
    time_zone: Tz,
}

impl BioRotator {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.auto_bio_enabled,
            interval: config.bio_update_interval,
            templates: Arc::new(config.bio_templates.clone()),
            emojis: Arc::new(config.status_react_emojis.clone()),
            time_zone: config.time_zone,
        }
    }

    /// Spawn the rotation task against `client`. Returns `None` when the
    /// feature is disabled. The first update happens immediately, then one
    /// per interval. The caller owns the returned handle.
    pub fn start<C: WaClient>(&self, client: C) -> Option<TaskHandle> {
        if !self.enabled {
            debug!("auto bio disabled, not starting");
            return None;
        }

        let token = CancellationToken::new();
        let child = token.clone();
        let interval = self.interval;
        let templates = Arc::clone(&self.templates);
        let emojis = Arc::clone(&self.emojis);
        let time_zone = self.time_zone;

        let join = tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("auto bio updates started");

            loop {
                tokio::select! {
                    // cancellation wins over a simultaneously-ready tick
                    biased;
                    _ = child.cancelled() => {
                        info!("auto bio updates stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) =
                            push_bio(&client, &templates, &emojis, time_zone, &mut rng).await
                        {
                            warn!(error = %e, "bio update failed");
                        }
                    }
                }
            }
        });

        Some(TaskHandle::new(token, join))
    }
}

async fn push_bio<C: WaClient>(
    client: &C,
    templates: &[String],
    emojis: &[String],
    time_zone: Tz,
    rng: &mut StdRng,
) -> WaResult<()> {
    let template = match pick_random(templates, rng) {
        Some(t) => t.to_string(),
        None => {
            debug!("bio template pool is empty, nothing to push");
            return Ok(());
        }
    };
    let emoji = pick_random(emojis, rng).unwrap_or_default().to_string();
    let (time, date) = local_time_strings(time_zone);

    let bio = render_template(&template, &time, &date, &emoji);
    client.update_profile_status(&bio).await?;
    info!(%bio, "updated bio");
    Ok(())
}

/// Substitute all `{time}`, `{date}` and `{randomEmoji}` placeholders.
pub fn render_template(template: &str, time: &str, date: &str, emoji: &str) -> String {
    template
        .replace("{time}", time)
        .replace("{date}", date)
        .replace("{randomEmoji}", emoji)
}

/// Current time/date strings in `tz`, e.g. `("3:34 PM", "Aug 7, 2026")`.
fn local_time_strings(tz: Tz) -> (String, String) {
    format_time_strings(Utc::now().with_timezone(&tz))
}

fn format_time_strings(local: DateTime<Tz>) -> (String, String) {
    (
        local.format("%-I:%M %p").to_string(),
        local.format("%b %-d, %Y").to_string(),
    )
}
