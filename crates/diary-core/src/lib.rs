//! Food Diary Core Library
//!
//! This crate provides the core functionality for the food diary: a local,
//! single-user journal of places eaten at, each page carrying a photo,
//! decorations and a memo.
//!
//! # Architecture
//!
//! - **SQLite**: every entry is one record keyed by its id, photo payloads
//!   stored as BLOBs next to it
//! - **Drafts**: entries are edited in memory and only persisted on commit
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open()?;
//! let prefs = store.load_preferences()?;
//!
//! let mut editor = Editor::new(&prefs);
//! editor.draft_mut().name = "Noodle Bar".into();
//! editor.set_main_photo(InlineImage::from_path("ramen.jpg")?, None);
//! let id = editor.commit(&mut store)?;
//!
//! let entries = store.get_all()?;
//! ```
//!
//! # Modules
//!
//! - `store`: Local store (main entry point)
//! - `models`: Diary entries, layers and their closed enumerations
//! - `media`: Inline image payloads
//! - `search`: Debounced place search and the lookup client
//! - `canvas`: Sticker and freehand drawing surface
//! - `editor`: Draft ownership and commit validation
//! - `preferences`: Process-wide UI preferences
//! - `storage`: SQLite schema and row mapping
//! - `config`: Application configuration

pub mod canvas;
pub mod config;
pub mod editor;
pub mod media;
pub mod models;
pub mod preferences;
pub mod search;
pub mod storage;
pub mod store;

pub use canvas::{Canvas, CanvasEvent, CanvasMode, Tool};
pub use config::Config;
pub use editor::{CommitError, Editor, EntryDraft};
pub use media::{ImageError, InlineImage};
pub use models::{
    ClipShape, Coords, DiaryEntry, Layer, LayerId, LayerKind, LayerPatch, LineStyle, Transform,
    ValidationError,
};
pub use preferences::{Font, Preferences, PreferencesHandle, Theme};
pub use search::{PlaceCandidate, PlaceSearch, PlaceSelection, SearchError};
pub use storage::{StorageError, StorageResult};
pub use store::{DisplayHandles, Store, StoredEntry};
