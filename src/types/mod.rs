//! Type definitions

pub mod employee;
pub mod import;
pub mod messages;

pub use employee::*;
pub use import::*;
pub use messages::*;
