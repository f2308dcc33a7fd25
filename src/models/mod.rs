//! Data models for the EstimAÍ client.
//!
//! These models match the backend JSON contract (camelCase) so responses and
//! push payloads deserialize directly.

mod project;
mod rate;
mod session;
mod story;
mod team;

pub use project::*;
pub use rate::*;
pub use session::*;
pub use story::*;
pub use team::*;
