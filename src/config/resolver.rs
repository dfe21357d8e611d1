//! Precedence resolution for configuration.
//!
//! ## Config Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Store config.kdl (`<data dir>/config.kdl`)
//! 3. System config.kdl (`~/.config/menuwright/config.kdl`)
//! 4. Built-in defaults
//!
//! The remembered import answer is runtime state and comes from the store's
//! state.kdl only.

use crate::Result;
use crate::config::{MenuwrightConfig, OutputFormat};
use crate::import::{ImportMode, ImportPreferences};
use crate::storage::Storage;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from the store's config.kdl
    Store,
    /// Value from the system-level config.kdl
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Store => write!(f, "store"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub output_format: Resolved<OutputFormat>,
    pub import_mode: Resolved<ImportMode>,
    pub keep_last_choice: Resolved<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            import_mode: Resolved::new(ImportMode::Ask, ValueSource::Default),
            keep_last_choice: Resolved::new(false, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn import_mode(&self) -> ImportMode {
        self.import_mode.value
    }

    pub fn keep_last_choice(&self) -> bool {
        self.keep_last_choice.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
    pub import_mode: Option<ImportMode>,
    pub keep_last_choice: Option<bool>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_import_mode(mut self, mode: ImportMode) -> Self {
        self.import_mode = Some(mode);
        self
    }

    pub fn with_keep_last_choice(mut self, keep: bool) -> Self {
        self.keep_last_choice = Some(keep);
        self
    }
}

/// Resolve configuration with full precedence chain, reading the system
/// config from its default location.
pub fn resolve_config(storage: &Storage, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system_config = Storage::read_system_config()?;
    resolve_config_with_system(storage, &system_config, overrides)
}

/// Resolve configuration against an already loaded system config.
pub fn resolve_config_with_system(
    storage: &Storage,
    system_config: &MenuwrightConfig,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig> {
    let store_config = storage.read_config()?;
    Ok(ResolvedConfig {
        output_format: pick(
            overrides.output_format,
            store_config.output_format,
            system_config.output_format,
            OutputFormat::Json,
        ),
        import_mode: pick(
            overrides.import_mode,
            store_config.import_mode,
            system_config.import_mode,
            ImportMode::Ask,
        ),
        keep_last_choice: pick(
            overrides.keep_last_choice,
            store_config.keep_last_choice,
            system_config.keep_last_choice,
            false,
        ),
    })
}

/// Import preferences for a run: the resolved keep flag plus the answer
/// remembered in state.kdl.
pub fn resolve_import_preferences(
    storage: &Storage,
    config: &ResolvedConfig,
) -> Result<ImportPreferences> {
    let state = storage.read_state()?;
    Ok(ImportPreferences {
        keep_choice: config.keep_last_choice(),
        last_mode: state.last_import_mode,
    })
}

fn pick<T>(cli: Option<T>, store: Option<T>, system: Option<T>, default: T) -> Resolved<T> {
    if let Some(value) = cli {
        Resolved::new(value, ValueSource::CliFlag)
    } else if let Some(value) = store {
        Resolved::new(value, ValueSource::Store)
    } else if let Some(value) = system {
        Resolved::new(value, ValueSource::System)
    } else {
        Resolved::new(default, ValueSource::Default)
    }
}
