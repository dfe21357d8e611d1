//! Configuration and state management for Menuwright.
//!
//! This module defines KDL schemas for two distinct files:
//!
//! ## config.kdl - User preferences
//!
//! Located at:
//! - System: `~/.config/menuwright/config.kdl` (or `$MW_CONFIG_DIR/config.kdl`)
//! - Store: `<data dir>/config.kdl`
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `import-mode` - what `mw import` does with duplicate IDs
//! - `keep-last-choice` - reuse the last conflict answer without asking
//!
//! ## state.kdl - Runtime state
//!
//! Located at `<data dir>/state.kdl`.
//!
//! Contains:
//! - `last-import-mode` - conflict answer remembered for later runs
//! - `last-import-at` - RFC 3339 timestamp of the last import
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedConfig, ValueSource, resolve_config,
    resolve_config_with_system, resolve_import_preferences,
};
pub use schema::{CONFIG_KEYS, MenuwrightConfig, MenuwrightState, OutputFormat};
