//! services/client/src/lib.rs
//!
//! The StudySearch client library: configuration, the HTTP backend adapter,
//! the session store and the screen-level views the binary drives.

pub mod adapters;
pub mod config;
pub mod error;
pub mod session;
pub mod views;
