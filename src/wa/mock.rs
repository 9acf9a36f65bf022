//! Mock WhatsApp transport.
//!
//! `MockWaClient` records every outbound side effect (with a timestamp, so
//! pacing can be asserted under paused time) and serves a scripted status
//! feed. `MockConnector` replays scripted lifecycle events and counts
//! connection attempts. The test suite runs entirely against these, and
//! `run --loopback` uses them as an in-process transport.

use super::traits::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// One outbound action, for ordering/pacing assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ProfileUpdate(String),
    Read(String),
    React { message_id: String, emoji: String },
    Image { to: Jid, caption: String },
}

#[derive(Default)]
struct ClientState {
    actions: Vec<(Action, Instant)>,
    status_feed: Vec<StatusUpdate>,
    fail_profile_update: bool,
    fail_fetch: bool,
    fail_read: bool,
    fail_react: bool,
}

/// Recording mock client.
#[derive(Clone)]
pub struct MockWaClient {
    state: Arc<Mutex<ClientState>>,
    jid: Jid,
}

impl MockWaClient {
    pub fn new(jid: Jid) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClientState::default())),
            jid,
        }
    }

    /// Replace the status feed returned by every subsequent fetch.
    pub fn set_status_feed(&self, updates: Vec<StatusUpdate>) {
        self.state.lock().unwrap().status_feed = updates;
    }

    pub fn fail_profile_update(&self, fail: bool) {
        self.state.lock().unwrap().fail_profile_update = fail;
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.state.lock().unwrap().fail_fetch = fail;
    }

    pub fn fail_read(&self, fail: bool) {
        self.state.lock().unwrap().fail_read = fail;
    }

    pub fn fail_react(&self, fail: bool) {
        self.state.lock().unwrap().fail_react = fail;
    }

    /// All recorded actions with their (virtual) timestamps, in order.
    pub fn actions(&self) -> Vec<(Action, Instant)> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn profile_updates(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .actions
            .iter()
            .filter_map(|(a, _)| match a {
                Action::ProfileUpdate(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn read_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .actions
            .iter()
            .filter_map(|(a, _)| match a {
                Action::Read(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn reactions(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .actions
            .iter()
            .filter_map(|(a, _)| match a {
                Action::React { message_id, emoji } => Some((message_id.clone(), emoji.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn sent_images(&self) -> Vec<(Jid, String)> {
        self.state
            .lock()
            .unwrap()
            .actions
            .iter()
            .filter_map(|(a, _)| match a {
                Action::Image { to, caption } => Some((to.clone(), caption.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().actions.clear();
    }

    fn record(&self, action: Action) {
        self.state
            .lock()
            .unwrap()
            .actions
            .push((action, Instant::now()));
    }
}

#[async_trait]
impl WaClient for MockWaClient {
    fn self_jid(&self) -> &Jid {
        &self.jid
    }

    async fn update_profile_status(&self, status: &str) -> WaResult<()> {
        if self.state.lock().unwrap().fail_profile_update {
            return Err(WaError::Network("profile update failed".to_string()));
        }
        self.record(Action::ProfileUpdate(status.to_string()));
        Ok(())
    }

    async fn fetch_status_updates(&self, _jid: &Jid) -> WaResult<Vec<StatusUpdate>> {
        let state = self.state.lock().unwrap();
        if state.fail_fetch {
            return Err(WaError::Network("status fetch failed".to_string()));
        }
        Ok(state.status_feed.clone())
    }

    async fn read_messages(&self, keys: &[MessageKey]) -> WaResult<()> {
        if self.state.lock().unwrap().fail_read {
            return Err(WaError::Network("read receipt failed".to_string()));
        }
        for key in keys {
            self.record(Action::Read(key.id.clone()));
        }
        Ok(())
    }

    async fn send_reaction(&self, key: &MessageKey, emoji: &str) -> WaResult<()> {
        if self.state.lock().unwrap().fail_react {
            return Err(WaError::Network("reaction send failed".to_string()));
        }
        self.record(Action::React {
            message_id: key.id.clone(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn send_image_message(&self, to: &Jid, _image_url: &str, caption: &str) -> WaResult<()> {
        self.record(Action::Image {
            to: to.clone(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}

/// Scripted lifecycle events for one `connect` call.
pub struct SessionScript {
    pub events: Vec<WaEvent>,
    /// Keep the event channel open after the scripted events drain. When
    /// false, the channel closes (as a torn-down socket would) once the
    /// events are consumed.
    pub keep_open: bool,
}

#[derive(Default)]
struct ConnectorState {
    scripts: VecDeque<SessionScript>,
    connect_calls: Vec<AuthMode>,
    fail_next: u32,
    // Senders held here keep their sessions "open" for the session lifetime.
    open_senders: Vec<mpsc::Sender<WaEvent>>,
}

/// Mock connector replaying one [`SessionScript`] per `connect` call.
///
/// With no script queued, a connect yields a session that opens and then
/// stays idle — the loopback behavior used by `run --loopback`.
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
    client: MockWaClient,
}

impl MockConnector {
    pub fn new(client: MockWaClient) -> Self {
        Self {
            state: Arc::new(Mutex::new(ConnectorState::default())),
            client,
        }
    }

    /// In-process loopback transport: opens immediately, no scripted close.
    pub fn loopback(jid: Jid) -> Self {
        Self::new(MockWaClient::new(jid))
    }

    pub fn client(&self) -> MockWaClient {
        self.client.clone()
    }

    pub fn push_script(&self, events: Vec<WaEvent>, keep_open: bool) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .push_back(SessionScript { events, keep_open });
    }

    /// Fail the next `n` connect calls with a network error.
    pub fn fail_next_connects(&self, n: u32) {
        self.state.lock().unwrap().fail_next = n;
    }

    pub fn connect_calls(&self) -> Vec<AuthMode> {
        self.state.lock().unwrap().connect_calls.clone()
    }
}

#[async_trait]
impl WaConnector for MockConnector {
    type Client = MockWaClient;

    async fn connect(&self, auth: AuthMode) -> WaResult<WaSession<MockWaClient>> {
        let script = {
            let mut state = self.state.lock().unwrap();
            state.connect_calls.push(auth);
            if state.fail_next > 0 {
                state.fail_next -= 1;
                return Err(WaError::Network("connect refused".to_string()));
            }
            state.scripts.pop_front().unwrap_or(SessionScript {
                events: vec![WaEvent::Open],
                keep_open: true,
            })
        };

        let (tx, rx) = mpsc::channel(script.events.len().max(1) + 1);
        for event in script.events {
            // Capacity is sized above; a send can only fail if the receiver
            // vanished, which no test relies on.
            let _ = tx.send(event).await;
        }
        if script.keep_open {
            self.state.lock().unwrap().open_senders.push(tx);
        }

        Ok(WaSession {
            client: self.client.clone(),
            events: rx,
        })
    }
}
