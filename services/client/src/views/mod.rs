pub mod admin;
pub mod evaluation;
pub mod login;
pub mod settings;
pub mod shell;
pub mod signup;
pub mod state;
pub mod workspace;

#[cfg(test)]
pub(crate) mod fakes;

// Re-export the pieces the binary drives directly.
pub use shell::{Route, Shell};
pub use state::{AppState, BannerKind, StatusBanner};
