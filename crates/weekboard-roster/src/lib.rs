//! `weekboard-roster`: the list of people shown as rows on the board.

pub mod db;
pub mod error;
pub mod manager;
pub mod types;

pub use error::{Result, RosterError};
pub use manager::RosterManager;
pub use types::{RosterChange, RosterEmployee};
