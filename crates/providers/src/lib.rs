//! Completion service client implementations.

pub mod responses;

pub use responses::ResponsesClient;
