//! `weekboard-core`: configuration, shared types and calendar helpers used by
//! every other weekboard crate.

pub mod config;
pub mod error;
pub mod types;
pub mod week;

pub use config::{Environment, WeekboardConfig};
pub use error::{Result, WeekboardError};
pub use types::{Employee, EmployeeKind};
