pub mod dto;
pub mod handlers;
pub mod models;
pub mod service;

// Re-export commonly used types
pub use models::CreateJobRequest;
pub use service::{JobService, ServiceError};
