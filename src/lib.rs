//! EstimAÍ client.
//!
//! REST client for the EstimAÍ estimation backend plus the Planning Poker
//! session view: a push channel, the view model that folds its events, and a
//! driver that ties both to a running session.

pub mod api;
pub mod auth;
pub mod channel;
pub mod config;
pub mod errors;
pub mod models;
pub mod poker;

pub use api::ApiClient;
pub use channel::{DriverOptions, LocalAction, PushChannel, SessionDriver, SessionHandle, SseChannel};
pub use config::Config;
pub use errors::{ClientError, ClientResult};
pub use poker::{LocalUser, SessionViewModel};
