//! Editor session
//!
//! An `EntryDraft` is the in-memory form of an entry being created or
//! edited. Nothing reaches the store until `Editor::commit`, which checks
//! the required fields on every attempt.
//!
//! The `Editor` owns the draft together with the place search box and the
//! canvas, and routes their events into the draft one at a time.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::canvas::{Canvas, CanvasEvent, Tool};
use crate::media::{ImageError, InlineImage};
use crate::models::{now_millis, Coords, DiaryEntry, Layer, LayerId, LineStyle, Transform, ValidationError};
use crate::preferences::{Preferences, Theme};
use crate::search::{PlaceSearch, PlaceSelection};
use crate::storage::StorageError;
use crate::store::Store;

/// Sticker palette
pub const STICKERS: [&str; 26] = [
    "🌸", "🌻", "🌼", "🌷", "🍀", "🎈", "🎉", "✨", "💕", "⭐", "☕", "🍰", "🍜", "🍣", "🍔", "🍕",
    "🍩", "🧋", "🍦", "🍧", "🥤", "🧁", "🍫", "🍟", "🌃", "🎶",
];

/// Pen colour palette
pub const PEN_COLORS: [&str; 18] = [
    "#000000", "#4B5563", "#6B7280", "#FF0000", "#FFA500", "#FFFF00", "#00FF00", "#00BFFF",
    "#0000FF", "#FF69B4", "#FF1493", "#FF7F50", "#9370DB", "#8A2BE2", "#BA55D3", "#7FFFD4",
    "#AEEEEE", "#E6E6FA",
];

const PHOTO_LAYER_ORIGIN: (f64, f64) = (40.0, 40.0);
const PHOTO_LAYER_SPACING: f64 = 80.0;
const STICKER_ORIGIN: (f64, f64) = (60.0, 60.0);
const STICKER_SIZE: f64 = 64.0;

/// Why a commit did not persist
#[derive(Error, Debug)]
pub enum CommitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// An entry under construction
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub coords: Option<Coords>,
    pub main_photo: Option<InlineImage>,
    pub additional_photos: Vec<InlineImage>,
    pub layers: Vec<Layer>,
    pub drawing: Option<InlineImage>,
    pub memo: String,
    pub theme: Theme,
    pub bg_color: String,
    pub line_style: LineStyle,
    pub created_at: DateTime<Utc>,
    next_layer_id: u32,
}

impl EntryDraft {
    /// Blank draft styled from the current preferences
    pub fn new(prefs: &Preferences) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            address: String::new(),
            coords: None,
            main_photo: None,
            additional_photos: Vec::new(),
            layers: Vec::new(),
            drawing: None,
            memo: String::new(),
            theme: prefs.theme,
            bg_color: prefs.theme.background().to_string(),
            line_style: LineStyle::default(),
            created_at: now_millis(),
            next_layer_id: 1,
        }
    }

    /// Draft for editing a stored entry; the id and creation time are kept
    pub fn from_entry(entry: DiaryEntry) -> Self {
        let next_layer_id = entry.layers.iter().map(|l| l.id.0 + 1).max().unwrap_or(1);
        Self {
            id: entry.id,
            name: entry.name,
            address: entry.address,
            coords: entry.coords,
            main_photo: Some(entry.main_photo),
            additional_photos: entry.additional_photos,
            layers: entry.layers,
            drawing: entry.drawing,
            memo: entry.memo,
            theme: entry.theme,
            bg_color: entry.bg_color,
            line_style: entry.line_style,
            created_at: entry.created_at,
            next_layer_id,
        }
    }

    fn allocate_layer_id(&mut self) -> LayerId {
        let after_existing = self.layers.iter().map(|l| l.id.0 + 1).max().unwrap_or(1);
        let id = self.next_layer_id.max(after_existing);
        self.next_layer_id = id + 1;
        LayerId(id)
    }

    pub fn apply_place(&mut self, place: &PlaceSelection) {
        self.name = place.name.clone();
        self.address = place.address.clone();
        self.coords = place.coords;
    }

    /// Set the main photo
    ///
    /// Explicit coordinates win over the photo's GPS tags. When neither is
    /// known the current coordinates are kept.
    pub fn set_main_photo(&mut self, photo: InlineImage, coords: Option<Coords>) {
        if let Some(coords) = coords.or_else(|| photo.gps_coords()) {
            self.coords = Some(coords);
        }
        self.main_photo = Some(photo);
    }

    /// Append photos, each materialized as a photo layer
    pub fn add_photos(&mut self, photos: Vec<InlineImage>) -> Vec<LayerId> {
        let mut ids = Vec::with_capacity(photos.len());
        for (i, photo) in photos.into_iter().enumerate() {
            let id = self.allocate_layer_id();
            let x = PHOTO_LAYER_ORIGIN.0 + PHOTO_LAYER_SPACING * i as f64;
            self.additional_photos.push(photo);
            self.layers.push(Layer::photo(
                id,
                self.additional_photos.len() - 1,
                Transform::at(x, PHOTO_LAYER_ORIGIN.1),
            ));
            ids.push(id);
        }
        ids
    }

    pub fn add_sticker(&mut self, emoji: impl Into<String>) -> LayerId {
        let id = self.allocate_layer_id();
        let transform =
            Transform::at(STICKER_ORIGIN.0, STICKER_ORIGIN.1).sized(STICKER_SIZE, STICKER_SIZE);
        self.layers.push(Layer::sticker(id, emoji, transform));
        id
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) {
        self.memo = memo.into();
    }

    /// Apply one canvas event
    pub fn apply(&mut self, event: CanvasEvent) {
        match event {
            CanvasEvent::Transform { id, patch } => {
                if let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) {
                    patch.apply_to(layer);
                }
            }
            CanvasEvent::Remove { id } => self.layers.retain(|l| l.id != id),
            CanvasEvent::Drawing(png) => self.drawing = Some(png),
        }
    }

    /// Build the entry to persist, checking the required fields
    pub fn to_entry(&self) -> Result<DiaryEntry, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::NameRequired);
        }
        let main_photo = self
            .main_photo
            .clone()
            .ok_or(ValidationError::MainPhotoRequired)?;

        let entry = DiaryEntry {
            id: self.id,
            name: self.name.clone(),
            address: self.address.clone(),
            coords: self.coords,
            main_photo,
            additional_photos: self.additional_photos.clone(),
            layers: self.layers.clone(),
            drawing: self.drawing.clone(),
            memo: self.memo.clone(),
            theme: self.theme,
            bg_color: self.bg_color.clone(),
            line_style: self.line_style,
            created_at: self.created_at,
        };
        entry.validate()?;
        Ok(entry)
    }
}

/// A single editing session
#[derive(Debug)]
pub struct Editor {
    draft: EntryDraft,
    search: PlaceSearch,
    canvas: Canvas,
    error: Option<ValidationError>,
}

impl Editor {
    pub fn new(prefs: &Preferences) -> Self {
        Self {
            draft: EntryDraft::new(prefs),
            search: PlaceSearch::new(),
            canvas: Canvas::new(false),
            error: None,
        }
    }

    /// Edit a stored entry; the canvas is painted with its drawing
    pub fn from_entry(entry: DiaryEntry) -> Result<Self, ImageError> {
        let draft = EntryDraft::from_entry(entry);
        let mut canvas = Canvas::new(false);
        canvas.sync_drawing(draft.drawing.as_ref())?;

        Ok(Self {
            search: PlaceSearch::with_query(draft.name.clone()),
            draft,
            canvas,
            error: None,
        })
    }

    pub fn draft(&self) -> &EntryDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut EntryDraft {
        &mut self.draft
    }

    pub fn search(&self) -> &PlaceSearch {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut PlaceSearch {
        &mut self.search
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Message from the last rejected commit
    pub fn error(&self) -> Option<ValidationError> {
        self.error
    }

    /// Take a search candidate into the draft
    pub fn select_place(&mut self, index: usize) -> Option<PlaceSelection> {
        let selection = self.search.select(index)?;
        self.draft.apply_place(&selection);
        Some(selection)
    }

    pub fn set_main_photo(&mut self, photo: InlineImage, coords: Option<Coords>) {
        self.draft.set_main_photo(photo, coords);
    }

    fn dispatch(&mut self, event: Option<CanvasEvent>) -> bool {
        match event {
            Some(event) => {
                self.draft.apply(event);
                true
            }
            None => false,
        }
    }

    // ==================== Canvas ====================

    pub fn drag(&mut self, id: LayerId, dx: f64, dy: f64) -> bool {
        let event = self.canvas.drag(&self.draft.layers, id, dx, dy);
        self.dispatch(event)
    }

    pub fn gesture(&mut self, id: LayerId, scale_delta: f64, angle_delta: f64) -> bool {
        let event = self
            .canvas
            .gesture(&self.draft.layers, id, scale_delta, angle_delta);
        self.dispatch(event)
    }

    pub fn resize(&mut self, id: LayerId, width: f64, height: f64) -> bool {
        let event = self.canvas.resize(&self.draft.layers, id, width, height);
        self.dispatch(event)
    }

    pub fn click(&mut self, id: LayerId) -> bool {
        let event = self.canvas.click(&self.draft.layers, id);
        self.dispatch(event)
    }

    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        let event = self.canvas.remove(id);
        self.dispatch(event)
    }

    pub fn toggle_drawing_mode(&mut self) -> bool {
        self.canvas.toggle_drawing_mode()
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.canvas.set_tool(tool);
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.canvas.pointer_down(x, y);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.canvas.pointer_move(x, y);
    }

    /// End a stroke; returns whether the draft's drawing was replaced
    pub fn pointer_up(&mut self) -> Result<bool, ImageError> {
        let event = self.canvas.pointer_up()?;
        Ok(self.dispatch(event))
    }

    pub fn pointer_leave(&mut self) -> Result<bool, ImageError> {
        let event = self.canvas.pointer_leave()?;
        Ok(self.dispatch(event))
    }

    /// Erase the drawing entirely
    pub fn clear_drawing(&mut self) -> Result<(), ImageError> {
        self.draft.drawing = None;
        self.canvas.sync_drawing(None)?;
        Ok(())
    }

    // ==================== Commit ====================

    /// Validate and persist the draft, returning its id
    ///
    /// A rejected draft is left untouched and the message is kept in
    /// `error()` until a commit succeeds.
    pub fn commit(&mut self, store: &mut Store) -> Result<Uuid, CommitError> {
        let entry = match self.draft.to_entry() {
            Ok(entry) => entry,
            Err(e) => {
                self.error = Some(e);
                return Err(e.into());
            }
        };

        store.put(&entry)?;
        self.error = None;
        Ok(entry.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::media::tests::{jpeg_with_gps, sample_png};
    use crate::models::{ClipShape, LayerPatch};
    use crate::search::PlaceCandidate;
    use tempfile::TempDir;
    use tokio::time::Instant;

    fn open_store(dir: &TempDir) -> Store {
        Store::open_with_config(test_config(dir)).unwrap()
    }

    #[test]
    fn test_draft_copies_theme_from_preferences() {
        let prefs = Preferences {
            theme: Theme::B,
            ..Preferences::default()
        };
        let draft = EntryDraft::new(&prefs);
        assert_eq!(draft.theme, Theme::B);
        assert_eq!(draft.bg_color, Theme::B.background());
        assert_eq!(draft.line_style, LineStyle::Solid);
    }

    #[test]
    fn test_main_photo_gps_fills_coords() {
        let tagged =
            InlineImage::from_bytes(jpeg_with_gps(b'N', [37, 33, 36], b'E', [126, 58, 48])).unwrap();

        let mut draft = EntryDraft::new(&Preferences::default());
        draft.set_main_photo(tagged.clone(), None);
        let coords = draft.coords.unwrap();
        assert!((coords.lat - 37.56).abs() < 1e-9);

        // Explicit coordinates win
        let typed = Coords { lat: 1.0, lng: 2.0 };
        draft.set_main_photo(tagged, Some(typed));
        assert_eq!(draft.coords, Some(typed));

        // An untagged photo keeps what is there
        draft.set_main_photo(sample_png(), None);
        assert_eq!(draft.coords, Some(typed));
    }

    #[test]
    fn test_commit_requires_name() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let mut editor = Editor::new(&Preferences::default());
        editor.set_main_photo(sample_png(), None);
        editor.draft_mut().name = "  ".into();

        let err = editor.commit(&mut store).unwrap_err();
        assert!(matches!(
            err,
            CommitError::Validation(ValidationError::NameRequired)
        ));
        assert_eq!(err.to_string(), "place/title required");
        assert_eq!(editor.error(), Some(ValidationError::NameRequired));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_commit_requires_main_photo() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);
        let mut editor = Editor::new(&Preferences::default());
        editor.draft_mut().name = "Cafe".into();

        let err = editor.commit(&mut store).unwrap_err();
        assert_eq!(err.to_string(), "main photo required");
        assert_eq!(store.count().unwrap(), 0);

        editor.set_main_photo(sample_png(), None);
        let id = editor.commit(&mut store).unwrap();
        assert_eq!(editor.error(), None);
        assert_eq!(store.get_by_id(id).unwrap().unwrap().entry.name, "Cafe");
    }

    #[test]
    fn test_edit_overwrites_same_id() {
        let dir = TempDir::new().unwrap();
        let mut store = open_store(&dir);

        let mut editor = Editor::new(&Preferences::default());
        editor.draft_mut().name = "Cafe".into();
        editor.set_main_photo(sample_png(), None);
        editor.draft_mut().add_sticker("☕");
        let id = editor.commit(&mut store).unwrap();

        let stored = store.get_by_id(id).unwrap().unwrap().entry;
        let created_at = stored.created_at;
        let mut editor = Editor::from_entry(stored).unwrap();
        assert_eq!(editor.search().query(), "Cafe");
        editor.draft_mut().set_memo("Latte art");
        assert_eq!(editor.commit(&mut store).unwrap(), id);

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].entry.memo, "Latte art");
        assert_eq!(all[0].entry.created_at, created_at);
        assert_eq!(all[0].entry.layers.len(), 1);
    }

    #[test]
    fn test_photo_and_sticker_defaults() {
        let mut draft = EntryDraft::new(&Preferences::default());
        let ids = draft.add_photos(vec![sample_png(), sample_png()]);
        let sticker = draft.add_sticker("🍰");

        assert_eq!(ids, vec![LayerId(1), LayerId(2)]);
        assert_eq!(sticker, LayerId(3));
        assert_eq!((draft.layers[0].transform.x, draft.layers[0].transform.y), (40.0, 40.0));
        assert_eq!(draft.layers[1].transform.x, 120.0);
        assert_eq!(draft.layers[1].transform.width, 120.0);
        assert_eq!(draft.layers[1].shape(), Some(ClipShape::Rect));
        assert_eq!(draft.layers[2].transform.x, 60.0);
        assert_eq!(draft.layers[2].transform.width, 64.0);
    }

    #[test]
    fn test_layer_ids_never_repeat() {
        let mut draft = EntryDraft::new(&Preferences::default());
        draft.add_sticker("🌸");
        let second = draft.add_sticker("🌻");
        draft.apply(CanvasEvent::Remove { id: second });

        assert_eq!(draft.add_sticker("🌼"), LayerId(3));
    }

    #[test]
    fn test_canvas_events_update_draft() {
        let mut editor = Editor::new(&Preferences::default());
        let id = editor.draft_mut().add_photos(vec![sample_png()])[0];

        assert!(editor.drag(id, 10.0, 5.0));
        assert!(editor.click(id));
        assert!(editor.resize(id, 1000.0, 10.0));
        let layer = &editor.draft().layers[0];
        assert_eq!((layer.transform.x, layer.transform.y), (50.0, 45.0));
        assert_eq!(layer.shape(), Some(ClipShape::Round));
        assert_eq!((layer.transform.width, layer.transform.height), (400.0, 40.0));

        editor.toggle_drawing_mode();
        assert!(!editor.drag(id, 10.0, 5.0));
        assert!(!editor.remove_layer(id));

        editor.pointer_down(10.0, 10.0);
        editor.pointer_move(20.0, 20.0);
        assert!(editor.pointer_up().unwrap());
        assert!(editor.draft().drawing.is_some());

        editor.toggle_drawing_mode();
        assert!(editor.remove_layer(id));
        assert!(editor.draft().layers.is_empty());
    }

    #[test]
    fn test_apply_shape_ignores_stickers() {
        let mut draft = EntryDraft::new(&Preferences::default());
        let id = draft.add_sticker("🍩");
        draft.apply(CanvasEvent::Transform {
            id,
            patch: LayerPatch::Shape(ClipShape::Star),
        });
        assert_eq!(draft.layers[0].shape(), None);
    }

    #[test]
    fn test_select_place_fills_draft() {
        let mut editor = Editor::new(&Preferences::default());
        let search = editor.search_mut();
        search.input("noodle", Instant::now());
        let request = search.flush().unwrap();
        search.complete(
            request.generation,
            Ok(vec![PlaceCandidate {
                id: 0,
                name: "Noodle Bar".into(),
                address: "1 Main St".into(),
                coords: Some(Coords { lat: 1.0, lng: 2.0 }),
            }]),
        );

        editor.select_place(0).unwrap();
        assert_eq!(editor.draft().name, "Noodle Bar");
        assert_eq!(editor.draft().address, "1 Main St");
        assert_eq!(editor.draft().coords, Some(Coords { lat: 1.0, lng: 2.0 }));
    }

    #[test]
    fn test_main_photo_coords_only_override_when_known() {
        let mut draft = EntryDraft::new(&Preferences::default());
        draft.coords = Some(Coords { lat: 1.0, lng: 2.0 });
        draft.set_main_photo(sample_png(), None);
        assert_eq!(draft.coords, Some(Coords { lat: 1.0, lng: 2.0 }));

        draft.set_main_photo(sample_png(), Some(Coords { lat: 3.0, lng: 4.0 }));
        assert_eq!(draft.coords, Some(Coords { lat: 3.0, lng: 4.0 }));
    }
}
