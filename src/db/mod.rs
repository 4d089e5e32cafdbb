use crate::error::{ReaderError, ReaderResult};
use crate::messages::Locale;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::warn;

#[cfg(target_arch = "wasm32")]
use gloo_storage::{LocalStorage, Storage};

pub const SETTINGS_KEY: &str = "versereader.settings";

pub const FONT_SIZE_MIN: u32 = 14;
pub const FONT_SIZE_MAX: u32 = 40;
pub const FONT_SIZE_DEFAULT: u32 = 24;
pub const FONT_SIZE_STEP: u32 = 2;
pub const DEFAULT_POSITION_CAPACITY: usize = 20;

/// String key-value storage that outlives the page.
///
/// Browser builds sit on `localStorage`; native builds keep a single
/// SQLite table in the platform data directory.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> ReaderResult<()>;
    fn remove(&self, key: &str);
}

/// Reader preferences stored under [`SETTINGS_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderSettings {
    #[serde(default)]
    pub locale: Locale,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default)]
    pub narrator_id: Option<String>,
    #[serde(default = "default_position_capacity")]
    pub position_capacity: usize,
}

fn default_font_size() -> u32 {
    FONT_SIZE_DEFAULT
}

fn default_position_capacity() -> usize {
    DEFAULT_POSITION_CAPACITY
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            font_size: default_font_size(),
            narrator_id: None,
            position_capacity: default_position_capacity(),
        }
    }
}

impl ReaderSettings {
    /// Brings out-of-range values written by older builds back into range.
    pub fn normalized(mut self) -> Self {
        self.font_size = clamp_font_size(self.font_size);
        self.position_capacity = self.position_capacity.clamp(1, 500);
        self
    }
}

pub fn clamp_font_size(size: u32) -> u32 {
    size.clamp(FONT_SIZE_MIN, FONT_SIZE_MAX)
}

/// Base URL of the reading backend, fixed at build time.
pub fn api_base_url() -> &'static str {
    option_env!("VERSEREADER_API_URL").unwrap_or("/api")
}

pub fn load_settings(store: &dyn KeyValueStore) -> ReaderSettings {
    let Some(raw) = store.get(SETTINGS_KEY) else {
        return ReaderSettings::default();
    };
    match serde_json::from_str::<ReaderSettings>(&raw) {
        Ok(settings) => settings.normalized(),
        Err(err) => {
            warn!(%err, "discarding unreadable reader settings");
            ReaderSettings::default()
        }
    }
}

pub fn save_settings(store: &dyn KeyValueStore, settings: &ReaderSettings) -> ReaderResult<()> {
    let json = serde_json::to_string(settings)?;
    store.set(SETTINGS_KEY, &json)
}

#[cfg(target_arch = "wasm32")]
pub struct BrowserStorage;

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        LocalStorage::raw().get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> ReaderResult<()> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|err| ReaderError::storage(format!("{err:?}")))
    }

    fn remove(&self, key: &str) {
        LocalStorage::delete(key);
    }
}

#[cfg(target_arch = "wasm32")]
pub fn open_default_store() -> Rc<dyn KeyValueStore> {
    Rc::new(BrowserStorage)
}

#[cfg(not(target_arch = "wasm32"))]
pub struct SqliteStore {
    conn: rusqlite::Connection,
}

#[cfg(not(target_arch = "wasm32"))]
impl SqliteStore {
    pub fn open(path: &std::path::Path) -> ReaderResult<Self> {
        let conn = rusqlite::Connection::open(path).map_err(ReaderError::storage)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> ReaderResult<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(ReaderError::storage)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: rusqlite::Connection) -> ReaderResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(ReaderError::storage)?;
        Ok(Self { conn })
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .ok()
    }

    fn set(&self, key: &str, value: &str) -> ReaderResult<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                [key, value],
            )
            .map_err(ReaderError::storage)?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        if let Err(err) = self.conn.execute("DELETE FROM kv WHERE key = ?1", [key]) {
            warn!(%err, key, "failed to remove stored value");
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn open_default_store() -> Rc<dyn KeyValueStore> {
    let opened = dirs::data_dir()
        .map(|dir| dir.join("versereader"))
        .filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .map(|dir| SqliteStore::open(&dir.join("reader.db")));

    match opened {
        Some(Ok(store)) => Rc::new(store),
        Some(Err(err)) => {
            warn!(%err, "falling back to in-memory storage");
            in_memory_fallback()
        }
        None => in_memory_fallback(),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn in_memory_fallback() -> Rc<dyn KeyValueStore> {
    match SqliteStore::in_memory() {
        Ok(store) => Rc::new(store),
        Err(err) => {
            warn!(%err, "in-memory storage unavailable; nothing will persist");
            Rc::new(NullStore)
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
struct NullStore;

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for NullStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> ReaderResult<()> {
        Err(ReaderError::Storage("storage unavailable".to_string()))
    }

    fn remove(&self, _key: &str) {}
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryStore;
    use super::*;

    #[test]
    fn settings_fall_back_to_defaults() {
        let store = MemoryStore::default();
        assert_eq!(load_settings(&store), ReaderSettings::default());

        store.set(SETTINGS_KEY, "{not json").unwrap();
        assert_eq!(load_settings(&store), ReaderSettings::default());
    }

    #[test]
    fn settings_are_clamped_on_load() {
        let store = MemoryStore::default();
        store
            .set(SETTINGS_KEY, r#"{"font_size": 90, "locale": "ar"}"#)
            .unwrap();
        let settings = load_settings(&store);
        assert_eq!(settings.font_size, FONT_SIZE_MAX);
        assert_eq!(settings.locale, Locale::Ar);
        assert_eq!(settings.position_capacity, DEFAULT_POSITION_CAPACITY);
    }

    #[test]
    fn sqlite_store_round_trips_values() {
        let store = SqliteStore::in_memory().expect("in-memory sqlite");
        store.set("versereader.position.2", "255").unwrap();
        assert_eq!(store.get("versereader.position.2").as_deref(), Some("255"));

        store.set("versereader.position.2", "256").unwrap();
        assert_eq!(store.get("versereader.position.2").as_deref(), Some("256"));

        store.remove("versereader.position.2");
        assert!(store.get("versereader.position.2").is_none());
    }

    #[test]
    fn settings_survive_save_and_load() {
        let store = MemoryStore::default();
        let settings = ReaderSettings {
            narrator_id: Some("5".to_string()),
            font_size: 30,
            ..ReaderSettings::default()
        };
        save_settings(&store, &settings).unwrap();
        assert_eq!(load_settings(&store), settings);
    }
}
