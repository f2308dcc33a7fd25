//! Planning Poker session state.
//!
//! The view model is transport-agnostic: feed it [`SessionEvent`]s and send
//! the [`SessionCommand`]s its actions return.

mod commands;
mod events;
mod view_model;

pub use commands::*;
pub use events::*;
pub use view_model::*;
