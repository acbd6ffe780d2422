//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Garbage collection: drops expired backend data and metadata records

mod gc;

pub use gc::spawn_gc_task;
