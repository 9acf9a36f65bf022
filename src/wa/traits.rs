//! WhatsApp client trait abstractions.
//!
//! The protocol library (socket, noise handshake, message encryption) is an
//! external collaborator. These traits are the seam: the bot only ever talks
//! to a [`WaClient`] obtained from a [`WaConnector`], which lets
//! `MockWaClient` stand in for the real transport in tests and in the CLI
//! loopback mode.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

/// WhatsApp identity (user or broadcast address), e.g. `1234567890@s.whatsapp.net`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Jid(pub String);

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addressing key of a single message, as the protocol library reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    /// Server-assigned message id, unique per remote JID.
    pub id: String,
    pub remote_jid: Jid,
    pub from_me: bool,
}

/// One contact status post, transient for the duration of a watcher pass.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub key: MessageKey,
    /// Post time, unix seconds.
    pub timestamp: u64,
}

/// Why the connection closed, as mapped from the protocol library's
/// disconnect codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Explicit logout: the session is gone, reconnecting is pointless.
    LoggedOut,
    ConnectionLost,
    ConnectionReplaced,
    RestartRequired,
    Unknown,
}

impl DisconnectReason {
    pub fn is_logged_out(&self) -> bool {
        matches!(self, DisconnectReason::LoggedOut)
    }
}

/// Connection lifecycle events delivered by the transport.
#[derive(Debug, Clone)]
pub enum WaEvent {
    /// Socket is open and authenticated.
    Open,
    /// Pairing payload to render as a QR code for interactive linking.
    PairingQr(String),
    /// Fresh credential snapshot that must be persisted immediately.
    CredsUpdate(Vec<u8>),
    Closed(DisconnectReason),
}

/// How the transport should authenticate when opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Resume from the persisted credential file.
    Restored,
    /// No usable credentials: pair interactively via QR code.
    QrPairing,
}

pub type WaResult<T> = Result<T, WaError>;

#[derive(Debug, thiserror::Error)]
pub enum WaError {
    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("transport unavailable: {0}")]
    Transport(String),
}

/// Send/update primitives of an open connection.
///
/// Implementations are cheap to clone (handles over shared state); the
/// periodic tasks each hold their own clone and only invoke methods on it.
#[async_trait]
pub trait WaClient: Clone + Send + Sync + 'static {
    /// The bot's own identity on this connection.
    fn self_jid(&self) -> &Jid;

    /// Push a new profile bio string.
    async fn update_profile_status(&self, status: &str) -> WaResult<()>;

    /// Current list of unviewed status posts visible to `jid`.
    async fn fetch_status_updates(&self, jid: &Jid) -> WaResult<Vec<StatusUpdate>>;

    /// Mark messages as read/seen.
    async fn read_messages(&self, keys: &[MessageKey]) -> WaResult<()>;

    /// React to the message behind `key` with a single emoji.
    async fn send_reaction(&self, key: &MessageKey, emoji: &str) -> WaResult<()>;

    /// Send an image message with a caption.
    async fn send_image_message(&self, to: &Jid, image_url: &str, caption: &str) -> WaResult<()>;
}

/// An open session: the client handle plus its lifecycle event stream.
///
/// The transport closes the channel when the underlying socket is torn down;
/// a close without a prior [`WaEvent::Closed`] counts as a connection loss.
pub struct WaSession<C: WaClient> {
    pub client: C,
    pub events: mpsc::Receiver<WaEvent>,
}

/// Opens sessions against the external protocol library.
#[async_trait]
pub trait WaConnector: Send + Sync {
    type Client: WaClient;

    async fn connect(&self, auth: AuthMode) -> WaResult<WaSession<Self::Client>>;
}
