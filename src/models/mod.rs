//! Request and Response models for the cache API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{InvalidateRequest, SetRequest};
pub use responses::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, InvalidateResponse, SetResponse,
    StatsResponse,
};
