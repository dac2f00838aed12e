pub mod endpoints;
pub mod http;
pub mod records;
pub mod storage;

pub use http::HttpBackend;
pub use storage::{FileCredentialStore, MemoryCredentialStore};
