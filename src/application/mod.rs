// Application layer - use cases and orchestration.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
