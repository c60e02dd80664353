//! Agent task backend adapters.

pub mod http;

pub use http::HttpTaskBackend;
