pub mod models;
pub mod dto;
pub mod handlers;
pub mod service;

// Re-export commonly used types
pub use models::{JobUpdate, NewJob};
pub use service::{JobService, ServiceError};
