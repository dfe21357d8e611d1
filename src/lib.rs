//! Menuwright - build the menu/action/profile item tree consumed by a host application.
//!
//! This library provides the core of the `mw` CLI tool: the versioned item
//! tree with its incremental modified/valid tracking, and the duplicate
//! identity resolver used when items are merged from an external source.

pub mod cli;
pub mod commands;
pub mod config;
pub mod import;
pub mod models;
pub mod status;
pub mod storage;
pub mod tree;


/// Library-level error type for Menuwright operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not initialized: run `mw system init` first")]
    NotInitialized,

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Invalid ID: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("A {child} cannot be placed under a {parent}")]
    InvalidChild {
        parent: models::ItemKind,
        child: models::ItemKind,
    },

    #[error("A {0} cannot be a top-level item")]
    InvalidRoot(models::ItemKind),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Menuwright operations.
pub type Result<T> = std::result::Result<T, Error>;
