//! SQLite record access
//!
//! Maps `DiaryEntry` values to rows and back. Payloads are stored as
//! BLOBs with their MIME type; layers are stored as JSON.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::media::InlineImage;
use crate::models::{Coords, DiaryEntry, Layer};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema;

const ENTRY_COLUMNS: &str = "id, name, address, lat, lng, memo, theme, bg_color, line_style, \
     created_at, main_photo_mime, main_photo, drawing_mime, drawing, layers";

/// SQLite connection holding the diary tables
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open or create the database file
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| StorageError::from_sqlite(e, path.to_path_buf()))?;
        Self::prepare(conn, Some(path.to_path_buf()))
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::prepare(Connection::open_in_memory()?, None)
    }

    fn prepare(mut conn: Connection, path: Option<PathBuf>) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::migrate(&mut conn)?;
        Ok(Self { conn, path })
    }

    /// Path of the database file, if on disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert or fully replace an entry and its photos
    pub fn upsert_entry(&mut self, entry: &DiaryEntry) -> StorageResult<()> {
        let id = entry.id.to_string();
        let layers = serde_json::to_string(&entry.layers).map_err(|e| StorageError::CorruptRecord {
            id: id.clone(),
            details: format!("layers not serializable: {e}"),
        })?;

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO entries (id, name, address, lat, lng, memo, theme, bg_color, line_style,
                                 created_at, main_photo_mime, main_photo, drawing_mime, drawing, layers)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                lat = excluded.lat,
                lng = excluded.lng,
                memo = excluded.memo,
                theme = excluded.theme,
                bg_color = excluded.bg_color,
                line_style = excluded.line_style,
                created_at = excluded.created_at,
                main_photo_mime = excluded.main_photo_mime,
                main_photo = excluded.main_photo,
                drawing_mime = excluded.drawing_mime,
                drawing = excluded.drawing,
                layers = excluded.layers
            "#,
            params![
                id,
                entry.name,
                entry.address,
                entry.coords.map(|c| c.lat),
                entry.coords.map(|c| c.lng),
                entry.memo,
                entry.theme.key(),
                entry.bg_color,
                entry.line_style.as_str(),
                entry.created_at.timestamp_millis(),
                entry.main_photo.mime(),
                entry.main_photo.bytes(),
                entry.drawing.as_ref().map(|d| d.mime()),
                entry.drawing.as_ref().map(|d| d.bytes()),
                layers,
            ],
        )?;

        tx.execute("DELETE FROM entry_photos WHERE entry_id = ?", params![id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO entry_photos (entry_id, position, mime, data) VALUES (?, ?, ?, ?)",
            )?;
            for (position, photo) in entry.additional_photos.iter().enumerate() {
                stmt.execute(params![id, position as i64, photo.mime(), photo.bytes()])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Load one entry by ID
    pub fn load_entry(&self, id: &Uuid) -> StorageResult<Option<DiaryEntry>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?"),
                params![id.to_string()],
                EntryRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => {
                let photos = self.load_photos(&row.id)?;
                Ok(Some(row.into_entry(photos)?))
            }
            None => Ok(None),
        }
    }

    /// Load all entries, newest first
    pub fn load_entries(&self) -> StorageResult<Vec<DiaryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries ORDER BY created_at DESC"
        ))?;
        let rows = stmt
            .query_map([], EntryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let photos = self.load_photos(&row.id)?;
            entries.push(row.into_entry(photos)?);
        }
        Ok(entries)
    }

    fn load_photos(&self, entry_id: &str) -> StorageResult<Vec<InlineImage>> {
        let mut stmt = self.conn.prepare(
            "SELECT mime, data FROM entry_photos WHERE entry_id = ? ORDER BY position",
        )?;
        let rows = stmt
            .query_map(params![entry_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mime, data)| {
                InlineImage::with_mime(mime, data).map_err(|e| StorageError::CorruptRecord {
                    id: entry_id.to_string(),
                    details: format!("additional photo: {e}"),
                })
            })
            .collect()
    }

    /// Delete an entry; returns whether a record existed
    pub fn delete_entry(&mut self, id: &Uuid) -> StorageResult<bool> {
        let id = id.to_string();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM entry_photos WHERE entry_id = ?", params![id])?;
        let removed = tx.execute("DELETE FROM entries WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Count stored entries
    pub fn entry_count(&self) -> StorageResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?)
    }

    /// Read all preference key/value pairs
    pub fn load_preferences(&self) -> StorageResult<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM preferences ORDER BY key")?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, String)>, _>>()?;
        Ok(pairs)
    }

    /// Write preference pairs; each key is replaced independently
    pub fn save_preferences(&mut self, pairs: &[(&str, String)]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        for (key, value) in pairs {
            tx.execute(
                "INSERT OR REPLACE INTO preferences (key, value) VALUES (?, ?)",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Raw columns of an `entries` row
struct EntryRow {
    id: String,
    name: String,
    address: String,
    lat: Option<f64>,
    lng: Option<f64>,
    memo: String,
    theme: String,
    bg_color: String,
    line_style: String,
    created_at: i64,
    main_photo_mime: String,
    main_photo: Vec<u8>,
    drawing_mime: Option<String>,
    drawing: Option<Vec<u8>>,
    layers: String,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            address: row.get(2)?,
            lat: row.get(3)?,
            lng: row.get(4)?,
            memo: row.get(5)?,
            theme: row.get(6)?,
            bg_color: row.get(7)?,
            line_style: row.get(8)?,
            created_at: row.get(9)?,
            main_photo_mime: row.get(10)?,
            main_photo: row.get(11)?,
            drawing_mime: row.get(12)?,
            drawing: row.get(13)?,
            layers: row.get(14)?,
        })
    }

    fn into_entry(self, additional_photos: Vec<InlineImage>) -> StorageResult<DiaryEntry> {
        let id = self.id;
        let corrupt = |details: String| StorageError::CorruptRecord {
            id: id.clone(),
            details,
        };

        let uuid = Uuid::parse_str(&id).map_err(|e| corrupt(format!("invalid id: {e}")))?;
        let created_at: DateTime<Utc> = DateTime::from_timestamp_millis(self.created_at)
            .ok_or_else(|| corrupt(format!("invalid timestamp {}", self.created_at)))?;
        let theme = self.theme.parse().map_err(corrupt)?;
        let line_style = self.line_style.parse().map_err(corrupt)?;
        let layers: Vec<Layer> = serde_json::from_str(&self.layers)
            .map_err(|e| corrupt(format!("invalid layers: {e}")))?;
        let main_photo = InlineImage::with_mime(self.main_photo_mime, self.main_photo)
            .map_err(|e| corrupt(format!("main photo: {e}")))?;
        let drawing = match (self.drawing_mime, self.drawing) {
            (Some(mime), Some(bytes)) => Some(
                InlineImage::with_mime(mime, bytes)
                    .map_err(|e| corrupt(format!("drawing: {e}")))?,
            ),
            _ => None,
        };
        let coords = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coords { lat, lng }),
            _ => None,
        };

        Ok(DiaryEntry {
            id: uuid,
            name: self.name,
            address: self.address,
            coords,
            main_photo,
            additional_photos,
            layers,
            drawing,
            memo: self.memo,
            theme,
            bg_color: self.bg_color,
            line_style,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::tests::sample_png;
    use crate::models::{LayerId, Transform};

    #[test]
    fn test_open_reports_unusable_data_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = match Database::open(&blocker.join("sub").join("diary.db")) {
            Err(e) => e,
            Ok(_) => panic!("opened a database below a regular file"),
        };
        match &err {
            StorageError::WriteFailed { path, .. } => assert_eq!(path, &blocker.join("sub")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_upsert_replaces_photos() {
        let mut db = Database::open_in_memory().unwrap();

        let mut entry = DiaryEntry::new("Bakery", sample_png());
        entry.additional_photos = vec![sample_png(), sample_png()];
        db.upsert_entry(&entry).unwrap();

        entry.additional_photos.truncate(1);
        db.upsert_entry(&entry).unwrap();

        let loaded = db.load_entry(&entry.id).unwrap().unwrap();
        assert_eq!(loaded.additional_photos.len(), 1);
        assert_eq!(db.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_layers_round_trip() {
        let mut db = Database::open_in_memory().unwrap();

        let mut entry = DiaryEntry::new("Bakery", sample_png());
        entry.additional_photos.push(sample_png());
        entry
            .layers
            .push(Layer::photo(LayerId(1), 0, Transform::at(40.0, 40.0)));
        entry.layers.push(Layer::sticker(
            LayerId(2),
            "🍰",
            Transform::at(60.0, 60.0).sized(64.0, 64.0),
        ));
        db.upsert_entry(&entry).unwrap();

        let loaded = db.load_entry(&entry.id).unwrap().unwrap();
        assert_eq!(loaded.layers, entry.layers);
    }

    #[test]
    fn test_corrupt_layers_are_reported() {
        let mut db = Database::open_in_memory().unwrap();
        let entry = DiaryEntry::new("Bakery", sample_png());
        db.upsert_entry(&entry).unwrap();

        db.conn
            .execute(
                "UPDATE entries SET layers = 'not json' WHERE id = ?",
                params![entry.id.to_string()],
            )
            .unwrap();

        let err = db.load_entry(&entry.id).unwrap_err();
        assert!(matches!(err, StorageError::CorruptRecord { .. }));
    }

    #[test]
    fn test_delete_cascades_photos() {
        let mut db = Database::open_in_memory().unwrap();
        let mut entry = DiaryEntry::new("Bakery", sample_png());
        entry.additional_photos.push(sample_png());
        db.upsert_entry(&entry).unwrap();

        assert!(db.delete_entry(&entry.id).unwrap());
        assert!(!db.delete_entry(&entry.id).unwrap());

        let photos: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM entry_photos", [], |row| row.get(0))
            .unwrap();
        assert_eq!(photos, 0);
    }

    #[test]
    fn test_preferences_are_independent_keys() {
        let mut db = Database::open_in_memory().unwrap();
        db.save_preferences(&[("theme", "B".to_string())]).unwrap();
        db.save_preferences(&[("font", "serif".to_string())]).unwrap();

        let pairs = db.load_preferences().unwrap();
        assert_eq!(
            pairs,
            vec![
                ("font".to_string(), "serif".to_string()),
                ("theme".to_string(), "B".to_string()),
            ]
        );
    }
}
