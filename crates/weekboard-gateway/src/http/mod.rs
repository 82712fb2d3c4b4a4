pub mod error;
pub mod health;
pub mod roster;
pub mod tasks;
