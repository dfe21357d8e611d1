//! Storage layer for Menuwright data.
//!
//! The store lives in one directory (`$MW_DATA_DIR`, else
//! `~/.local/share/menuwright/`):
//!
//! - `items.jsonl` - one top-level item document (with its subtree) per line,
//!   in display order. This is the source of truth.
//! - `cache.db` - SQLite index of menus and actions for identity lookups,
//!   rebuilt from the JSONL on every save
//! - `config.kdl` / `state.kdl` - store-level preferences and runtime state

use crate::config::{MenuwrightConfig, MenuwrightState};
use crate::import::ExistingItem;
use crate::models::{ItemDocument, ItemKind};
use crate::{Error, Result};
use kdl::KdlDocument;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Overrides the store directory.
pub const DATA_DIR_ENV: &str = "MW_DATA_DIR";

/// Overrides the directory holding the system config.kdl.
pub const CONFIG_DIR_ENV: &str = "MW_CONFIG_DIR";

const ITEMS_FILE: &str = "items.jsonl";
const CACHE_FILE: &str = "cache.db";
const CONFIG_FILE: &str = "config.kdl";
const STATE_FILE: &str = "state.kdl";

/// Storage manager for one item store.
pub struct Storage {
    /// Root directory of the store
    pub root: PathBuf,
    /// SQLite connection for indexed lookups
    conn: Connection,
}

impl Storage {
    /// Open the store at the default location.
    pub fn open() -> Result<Self> {
        Self::open_with_data_dir(&get_storage_dir()?)
    }

    /// Initialize the store at the default location.
    pub fn init() -> Result<Self> {
        Self::init_with_data_dir(&get_storage_dir()?)
    }

    /// Check if the store exists at the default location.
    pub fn exists() -> Result<bool> {
        Ok(Self::exists_with_data_dir(&get_storage_dir()?))
    }

    /// Open an existing store rooted at `root`.
    pub fn open_with_data_dir(root: &Path) -> Result<Self> {
        if !Self::exists_with_data_dir(root) {
            return Err(Error::NotInitialized);
        }

        let conn = Connection::open(root.join(CACHE_FILE))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            root: root.to_path_buf(),
            conn,
        })
    }

    /// Create (or re-open) a store rooted at `root`. Existing items are kept.
    pub fn init_with_data_dir(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;

        let items_path = root.join(ITEMS_FILE);
        if !items_path.exists() {
            File::create(&items_path)?;
        }

        let conn = Connection::open(root.join(CACHE_FILE))?;
        Self::init_schema(&conn)?;

        let mut storage = Self {
            root: root.to_path_buf(),
            conn,
        };
        storage.rebuild_cache()?;
        tracing::info!(root = %root.display(), "store initialized");
        Ok(storage)
    }

    pub fn exists_with_data_dir(root: &Path) -> bool {
        root.join(ITEMS_FILE).exists()
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id TEXT NOT NULL,
                kind TEXT NOT NULL,
                label TEXT NOT NULL,
                parent_id TEXT,
                position INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_items_id ON items(id);
            CREATE INDEX IF NOT EXISTS idx_items_parent ON items(parent_id);
            "#,
        )?;
        Ok(())
    }

    // ==================== Items ====================

    /// Read every top-level item document, in order.
    pub fn load_items(&self) -> Result<Vec<ItemDocument>> {
        let file = File::open(self.root.join(ITEMS_FILE))?;
        let reader = BufReader::new(file);

        let mut items = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let item = serde_json::from_str::<ItemDocument>(&line).map_err(|e| {
                Error::Other(format!("{} line {}: {}", ITEMS_FILE, number + 1, e))
            })?;
            items.push(item);
        }
        Ok(items)
    }

    /// Replace the stored items and rebuild the index.
    pub fn save_items(&mut self, items: &[ItemDocument]) -> Result<()> {
        let path = self.root.join(ITEMS_FILE);
        let tmp = self.root.join(format!("{}.tmp", ITEMS_FILE));
        {
            let mut file = File::create(&tmp)?;
            for item in items {
                let json = serde_json::to_string(item)?;
                writeln!(file, "{}", json)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        self.rebuild_cache()?;
        tracing::info!(items = items.len(), "items saved");
        Ok(())
    }

    /// Re-index the stored menus and actions.
    pub fn rebuild_cache(&mut self) -> Result<()> {
        let items = self.load_items()?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM items", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO items (id, kind, label, parent_id, position) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut stack: Vec<(&ItemDocument, Option<&str>, usize)> = items
                .iter()
                .enumerate()
                .rev()
                .map(|(position, item)| (item, None, position))
                .collect();
            while let Some((item, parent, position)) = stack.pop() {
                if !item.kind.is_container() {
                    continue;
                }
                insert.execute(params![
                    item.id(),
                    item.kind.as_str(),
                    item.fields.label,
                    parent,
                    position as i64,
                ])?;
                for (index, child) in item.children.iter().enumerate().rev() {
                    stack.push((child, Some(item.id()), index));
                }
            }
        }
        tx.commit()?;

        tracing::debug!("item index rebuilt");
        Ok(())
    }

    /// Look up a stored menu or action by ID.
    pub fn item_exists(&self, id: &str) -> Result<Option<ExistingItem>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, kind, label, parent_id FROM items WHERE id = ?1 ORDER BY rowid LIMIT 1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, kind, label, parent)) = row else {
            return Ok(None);
        };
        let Some(kind) = ItemKind::parse(&kind) else {
            return Ok(None);
        };
        Ok(Some(ExistingItem {
            id,
            kind,
            label,
            ancestors: self.indexed_ancestors(parent)?,
        }))
    }

    /// Walk `parent_id` links up to a root.
    fn indexed_ancestors(&self, mut parent: Option<String>) -> Result<Vec<String>> {
        let mut ancestors = Vec::new();
        while let Some(id) = parent {
            // Stored IDs are unique, so a repeat means a malformed index
            if ancestors.contains(&id) {
                break;
            }
            parent = self
                .conn
                .query_row(
                    "SELECT parent_id FROM items WHERE id = ?1 ORDER BY rowid LIMIT 1",
                    params![id],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?
                .flatten();
            ancestors.push(id);
        }
        Ok(ancestors)
    }

    /// Number of indexed menus and actions.
    pub fn count_items(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ==================== Config and state ====================

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    /// Store-level config.kdl; empty when missing.
    pub fn read_config(&self) -> Result<MenuwrightConfig> {
        Ok(MenuwrightConfig::from_kdl(&read_kdl(&self.config_path())?))
    }

    pub fn write_config(&self, config: &MenuwrightConfig) -> Result<()> {
        write_kdl(&self.config_path(), &config.to_kdl())
    }

    /// Store-level state.kdl; empty when missing.
    pub fn read_state(&self) -> Result<MenuwrightState> {
        Ok(MenuwrightState::from_kdl(&read_kdl(&self.state_path())?))
    }

    pub fn write_state(&self, state: &MenuwrightState) -> Result<()> {
        write_kdl(&self.state_path(), &state.to_kdl())
    }

    /// Path of the system config.kdl, if a config directory can be found.
    pub fn system_config_path() -> Option<PathBuf> {
        match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir).join(CONFIG_FILE)),
            _ => dirs::config_dir().map(|d| d.join("menuwright").join(CONFIG_FILE)),
        }
    }

    /// System config.kdl; empty when missing or no config directory exists.
    pub fn read_system_config() -> Result<MenuwrightConfig> {
        match Self::system_config_path() {
            Some(path) => Ok(MenuwrightConfig::from_kdl(&read_kdl(&path)?)),
            None => Ok(MenuwrightConfig::default()),
        }
    }
}

/// Get the store directory, honoring `MW_DATA_DIR`.
pub fn get_storage_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("menuwright"))
}

fn read_kdl(path: &Path) -> Result<KdlDocument> {
    if !path.exists() {
        return Ok(KdlDocument::new());
    }
    let content = fs::read_to_string(path)?;
    content
        .parse()
        .map_err(|e| Error::Config(format!("Failed to parse KDL in {}: {}", path.display(), e)))
}

fn write_kdl(path: &Path, doc: &KdlDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, doc.to_string())?;
    Ok(())
}
