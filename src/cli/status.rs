//! Show local bot state without touching the network.

use statusbot::config::Config;
use statusbot::deploy;
use statusbot::wa::SessionStore;

pub fn execute() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let store = SessionStore::new(&config.session_dir);

    if store.has_local_session() {
        println!("Session: present ({})", store.creds_path().display());
    } else if config.session_id.is_some() {
        println!("Session: absent (will download from vault on next run)");
    } else {
        println!("Session: absent (QR pairing required on next run)");
    }

    match deploy::read_log(&config.deployment_log) {
        Some(log) => println!(
            "Deployments: {} today ({}), {} total",
            log.daily_count, log.date, log.total_count
        ),
        None => println!("Deployments: no log yet"),
    }

    println!("Status page port: {}", config.port);
    println!("Auto bio: {}", config.auto_bio_enabled);
    println!("Auto status react: {}", config.auto_status_react);

    Ok(())
}
