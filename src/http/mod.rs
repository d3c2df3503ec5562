//! HTTP protocol layer module
//!
//! Request and response models shared by the pipeline, plus the response
//! writer that maps outcomes to status codes and wire bytes.

pub mod request;
pub mod response;
pub mod writer;

// Re-export commonly used types
pub use request::Request;
pub use response::Response;
pub use writer::ResponseWriter;
