//! Install-time configuration server
//!
//! While a master installs, its installer fetches a preseed file from the
//! host. The server only lives for the duration of one build.

mod scope;
mod server;

pub use scope::ServerScope;
pub use server::PreseedServer;

use crate::error::MastersResult;
use async_trait::async_trait;

/// Ephemeral service serving install-time configuration to a booting VM
#[async_trait]
pub trait ConfigServer: Send + Sync {
    /// Start serving `content` at `base_url`
    async fn start(&self, base_url: &str, content: &str) -> MastersResult<()>;

    /// Stop serving; stopping an idle server is a no-op
    async fn stop(&self);

    /// Ask the server to shut down without waiting for it.
    ///
    /// Returns `false` when the request could not be made; the caller must
    /// then fall back to [`ConfigServer::stop`].
    fn signal_stop(&self) -> bool {
        false
    }
}
