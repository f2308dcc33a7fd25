//! Push channel between a session view and the session service.

mod driver;
mod sse;

pub use driver::*;
pub use sse::*;

pub use crate::poker::ConnectionStatus;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::errors::ClientResult;
use crate::poker::{SessionCommand, SessionEvent};

/// Inbound events for one session, in server order.
pub type SessionEventStream = Pin<Box<dyn Stream<Item = ClientResult<SessionEvent>> + Send>>;

/// Transport for one session: a subscription for events plus a way to send commands.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Open the inbound event stream. Called again on every reconnect.
    async fn subscribe(&self) -> ClientResult<SessionEventStream>;

    /// Deliver a command to the server.
    async fn send(&self, command: &SessionCommand) -> ClientResult<()>;
}
