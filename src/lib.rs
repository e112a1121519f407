//! Sitecraft - prompt-driven website generation with live preview and version history

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod preview;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod stream;
