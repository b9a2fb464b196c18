//! Domain layer for the Riya companion chat.
//!
//! Pure pieces of the guest chat pipeline (typing delays, greetings, the
//! batching queue, the guest gate) plus the contracts the application layer
//! talks through (completion endpoint, stores, scheduler).

pub mod batch;
pub mod completion;
pub mod config;
pub mod error;
pub mod gate;
pub mod greeting;
pub mod message;
pub mod persona;
pub mod repository;
pub mod scheduler;
pub mod session;
pub mod typing;

// Re-export common error type
pub use error::{Result, RiyaError};
