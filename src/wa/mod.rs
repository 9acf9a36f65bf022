//! WhatsApp-side components.
//!
//! Everything that talks to (or stands in for) the external protocol client
//! library: the trait boundary, the session credential store, the connection
//! lifecycle manager, and the two periodic tasks it drives.

pub mod bio;
pub mod connection;
pub mod mock;
pub mod retry;
pub mod session;
pub mod status;
pub mod task;
pub mod traits;

pub use bio::BioRotator;
pub use connection::ConnectionManager;
pub use mock::{MockConnector, MockWaClient};
pub use session::{HttpSessionVault, RemoteSessionId, SessionStore, SessionVault};
pub use status::StatusWatcher;
pub use task::TaskHandle;
pub use traits::{
    AuthMode, DisconnectReason, Jid, MessageKey, StatusUpdate, WaClient, WaConnector, WaError,
    WaEvent, WaResult, WaSession,
};

use rand::Rng;

/// Uniform pick from a pool; `None` on an empty pool.
pub(crate) fn pick_random<'a>(pool: &'a [String], rng: &mut impl Rng) -> Option<&'a str> {
    if pool.is_empty() {
        return None;
    }
    Some(pool[rng.gen_range(0..pool.len())].as_str())
}
