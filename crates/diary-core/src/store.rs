//! Local store
//!
//! The `Store` is the single entry point for persisting diary entries and
//! the UI preferences. Every write is one SQLite transaction, so a record is
//! either fully replaced or left untouched.
//!
//! ## Display handles
//!
//! Photos and drawings are stored as raw payloads. Reads derive a fresh set
//! of `data:` URLs (`DisplayHandles`) for each entry; handles are never
//! stored and never reused across reads.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open()?;
//!
//! store.put(&entry)?;
//!
//! for stored in store.get_all()? {
//!     println!("{} {}", stored.entry.name, stored.handles.main_photo.len());
//! }
//! ```

use anyhow::{Context, Result};
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::models::DiaryEntry;
use crate::preferences::Preferences;
use crate::storage::{Database, StorageError, StorageResult};

/// Entries per page in the list view
pub const PAGE_SIZE: usize = 5;

/// Renderable references for an entry's payloads
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayHandles {
    pub main_photo: String,
    pub photos: Vec<String>,
    pub drawing: Option<String>,
}

impl DisplayHandles {
    fn for_entry(entry: &DiaryEntry) -> Self {
        Self {
            main_photo: entry.main_photo.data_url(),
            photos: entry
                .additional_photos
                .iter()
                .map(|photo| photo.data_url())
                .collect(),
            drawing: entry.drawing.as_ref().map(|d| d.data_url()),
        }
    }
}

/// An entry as read back from the store
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub entry: DiaryEntry,
    pub handles: DisplayHandles,
}

impl StoredEntry {
    fn rehydrate(entry: DiaryEntry) -> Self {
        let handles = DisplayHandles::for_entry(&entry);
        Self { entry, handles }
    }
}

/// One page of the entry list
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number after clamping
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Split a list into pages of `PAGE_SIZE`, clamping the requested page
pub fn paginate<T>(items: Vec<T>, page: usize) -> Page<T> {
    let total_items = items.len();
    let total_pages = total_items.div_ceil(PAGE_SIZE).max(1);
    let number = page.clamp(1, total_pages);
    let items = items
        .into_iter()
        .skip((number - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();

    Page {
        items,
        number,
        total_pages,
        total_items,
    }
}

/// Persistent store for diary entries and preferences
pub struct Store {
    db: Database,
    config: Config,
}

impl Store {
    /// Open the store at the configured location
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config).context("Failed to open diary database")
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: Config) -> StorageResult<Self> {
        let db = Database::open(&config.sqlite_path())?;
        Ok(Self { db, config })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Entry Operations ====================

    /// Insert or fully overwrite an entry by id
    ///
    /// Entries without a name or main photo are refused.
    pub fn put(&mut self, entry: &DiaryEntry) -> StorageResult<()> {
        entry.validate()?;
        self.db.upsert_entry(entry)?;
        debug!(
            id = %entry.id,
            photos = entry.additional_photos.len(),
            layers = entry.layers.len(),
            "Stored entry"
        );
        Ok(())
    }

    /// All entries, newest first
    pub fn get_all(&self) -> StorageResult<Vec<StoredEntry>> {
        Ok(self
            .db
            .load_entries()?
            .into_iter()
            .map(StoredEntry::rehydrate)
            .collect())
    }

    /// A single entry by id
    pub fn get_by_id(&self, id: Uuid) -> StorageResult<Option<StoredEntry>> {
        Ok(self.db.load_entry(&id)?.map(StoredEntry::rehydrate))
    }

    /// Delete an entry; deleting an absent id is not an error
    pub fn delete(&mut self, id: Uuid) -> StorageResult<bool> {
        let removed = self.db.delete_entry(&id)?;
        debug!(id = %id, removed, "Deleted entry");
        Ok(removed)
    }

    /// Entries whose name, memo or address contain `query`, newest first
    pub fn search(&self, query: &str) -> StorageResult<Vec<StoredEntry>> {
        let query = query.trim();
        let mut entries = self.get_all()?;
        if !query.is_empty() {
            entries.retain(|stored| stored.entry.matches(query));
        }
        Ok(entries)
    }

    /// Number of stored entries
    pub fn count(&self) -> StorageResult<usize> {
        Ok(self.db.entry_count()? as usize)
    }

    /// Size of the database file in bytes
    ///
    /// An in-memory store reports zero.
    pub fn database_size(&self) -> StorageResult<u64> {
        let Some(path) = self.db.path() else {
            return Ok(0);
        };
        std::fs::metadata(path)
            .map(|meta| meta.len())
            .map_err(|e| StorageError::from_io(e, path.to_path_buf()))
    }

    // ==================== Preferences ====================

    /// Load preferences, falling back to defaults for missing values
    pub fn load_preferences(&self) -> StorageResult<Preferences> {
        Ok(Preferences::from_pairs(self.db.load_preferences()?))
    }

    /// Persist all three preference keys
    pub fn save_preferences(&mut self, prefs: &Preferences) -> StorageResult<()> {
        self.db.save_preferences(&prefs.to_pairs())?;
        debug!(font = %prefs.font, theme = %prefs.theme, "Saved preferences");
        Ok(())
    }
}
