//! Entry command handlers

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use reqwest::Url;
use tokio::time::Instant;
use uuid::Uuid;

use diary_core::canvas::Tool;
use diary_core::search::{HttpPlaceLookup, PlaceLookup};
use diary_core::store::paginate;
use diary_core::{
    CommitError, Config, Coords, DiaryEntry, Editor, InlineImage, LineStyle, Store,
    ValidationError,
};

use crate::editor::{confirm, edit_text, is_interactive, prompt_optional, prompt_with_default};
use crate::output::Output;

const NAVER_MAP_SEARCH: &str = "https://map.naver.com/v5/search";

/// Fields that can be given up front instead of answering prompts
#[derive(Args, Debug, Clone, Default)]
pub struct EntryArgs {
    /// Search for a place through the proxy and pick a result
    #[arg(short, long)]
    pub place: Option<String>,

    /// Place name or free title (no search)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Address shown under the title
    #[arg(long)]
    pub address: Option<String>,

    /// Main photo file
    #[arg(long)]
    pub photo: Option<PathBuf>,

    /// Coordinates of the main photo as "lat,lng"
    #[arg(long, value_parser = parse_coords)]
    pub coords: Option<Coords>,

    /// Additional photo files, each placed as a photo layer
    #[arg(long = "extra")]
    pub extras: Vec<PathBuf>,

    /// Sticker emoji to add (repeatable)
    #[arg(short, long = "sticker")]
    pub stickers: Vec<String>,

    /// Memo text
    #[arg(short, long)]
    pub memo: Option<String>,

    /// Write the memo in $EDITOR
    #[arg(long, conflicts_with = "memo")]
    pub edit_memo: bool,

    /// Border style: solid, dotted, dashed, bold, light
    #[arg(long)]
    pub line_style: Option<LineStyle>,

    /// Freehand stroke as "x,y x,y ..." on the 640x670 canvas (repeatable)
    #[arg(long = "stroke")]
    pub strokes: Vec<String>,

    /// Pen colour for strokes
    #[arg(long, default_value = "#000000")]
    pub pen_color: String,

    /// Draw strokes with the eraser instead of the pen
    #[arg(long)]
    pub eraser: bool,

    /// Remove the existing drawing
    #[arg(long)]
    pub clear_drawing: bool,
}

impl EntryArgs {
    fn is_empty(&self) -> bool {
        self.place.is_none()
            && self.name.is_none()
            && self.address.is_none()
            && self.photo.is_none()
            && self.coords.is_none()
            && self.extras.is_empty()
            && self.stickers.is_empty()
            && self.memo.is_none()
            && !self.edit_memo
            && self.line_style.is_none()
            && self.strokes.is_empty()
            && !self.clear_drawing
    }
}

/// Create a new entry
pub async fn create(store: &mut Store, args: EntryArgs, output: &Output) -> Result<()> {
    let prefs = store.load_preferences()?;
    let mut editor = Editor::new(&prefs);
    let interactive = is_interactive() && output.should_prompt();

    if interactive && args.place.is_none() && args.name.is_none() {
        if let Some(query) = prompt_optional("Search place (blank to type a title)")? {
            search_place(&mut editor, store.config(), &query, interactive, output).await?;
        }
        if editor.draft().name.is_empty() {
            if let Some(name) = prompt_optional("Title")? {
                editor.draft_mut().name = name;
            }
        }
    }
    if interactive && args.photo.is_none() {
        if let Some(path) = prompt_optional("Main photo path")? {
            editor.set_main_photo(load_image(Path::new(&path))?, args.coords);
        }
    }
    if interactive && args.memo.is_none() && !args.edit_memo {
        if let Some(memo) = prompt_optional("Memo (blank to skip)")? {
            editor.draft_mut().set_memo(memo);
        }
    }

    populate(&mut editor, store.config(), &args, interactive, output).await?;
    let id = commit(&mut editor, store, interactive)?;

    output.success(&format!("Saved entry: {}", id));
    if let Some(stored) = store.get_by_id(id)? {
        output.print_entry(&stored);
    }
    Ok(())
}

/// Edit an existing entry, keeping its id
pub async fn edit(store: &mut Store, id: String, args: EntryArgs, output: &Output) -> Result<()> {
    let uuid = parse_entry_id(&id, store)?;
    let stored = store
        .get_by_id(uuid)?
        .ok_or_else(|| anyhow!("Entry not found: {}", id))?;

    let mut editor =
        Editor::from_entry(stored.entry).context("Failed to load the stored drawing")?;
    let interactive = is_interactive() && output.should_prompt();

    if interactive && args.is_empty() {
        println!("Editing entry: {}", uuid);
        println!("Press Enter to keep current value, or type new value.\n");

        let draft = editor.draft_mut();
        if let Some(name) = prompt_with_default("Title", &draft.name)? {
            draft.name = name;
        }
        if let Some(address) = prompt_with_default("Address", &draft.address)? {
            draft.address = address;
        }
        if confirm("Edit memo?")? {
            let memo = edit_text(&draft.memo)?;
            draft.set_memo(memo);
        }
    }

    populate(&mut editor, store.config(), &args, interactive, output).await?;
    commit(&mut editor, store, interactive)?;

    output.success("Entry updated");
    if let Some(stored) = store.get_by_id(uuid)? {
        output.print_entry(&stored);
    }
    Ok(())
}

/// Apply command-line fields to the draft
async fn populate(
    editor: &mut Editor,
    config: &Config,
    args: &EntryArgs,
    interactive: bool,
    output: &Output,
) -> Result<()> {
    if let Some(query) = &args.place {
        search_place(editor, config, query, interactive, output).await?;
    }

    let draft = editor.draft_mut();
    if let Some(name) = &args.name {
        draft.name = name.clone();
    }
    if let Some(address) = &args.address {
        draft.address = address.clone();
    }
    match &args.photo {
        Some(path) => draft.set_main_photo(load_image(path)?, args.coords),
        None if args.coords.is_some() => draft.coords = args.coords,
        None => {}
    }

    if !args.extras.is_empty() {
        let photos = args
            .extras
            .iter()
            .map(|path| load_image(path))
            .collect::<Result<Vec<_>>>()?;
        draft.add_photos(photos);
    }
    for emoji in &args.stickers {
        draft.add_sticker(emoji.clone());
    }

    if let Some(memo) = &args.memo {
        draft.set_memo(memo.clone());
    } else if args.edit_memo {
        let memo = edit_text(&draft.memo)?;
        draft.set_memo(memo);
    }
    if let Some(style) = args.line_style {
        draft.line_style = style;
    }

    if args.clear_drawing {
        editor.clear_drawing()?;
    }
    if !args.strokes.is_empty() {
        let tool = if args.eraser {
            Tool::Eraser
        } else {
            Tool::pen(&args.pen_color)
                .ok_or_else(|| anyhow!("Invalid pen colour '{}'. Use #RRGGBB.", args.pen_color))?
        };
        draw_strokes(editor, tool, &args.strokes)?;
    }

    Ok(())
}

/// Replay strokes through the canvas in drawing mode
fn draw_strokes(editor: &mut Editor, tool: Tool, strokes: &[String]) -> Result<()> {
    let strokes = strokes
        .iter()
        .map(|s| parse_stroke(s))
        .collect::<Result<Vec<_>>>()?;

    editor.set_tool(tool);
    if !editor.toggle_drawing_mode() {
        bail!("Drawing is not available for this entry");
    }

    for points in strokes {
        let (x, y) = points[0];
        editor.pointer_down(x, y);
        for &(x, y) in &points[1..] {
            editor.pointer_move(x, y);
        }
        editor.pointer_up()?;
    }

    editor.toggle_drawing_mode();
    Ok(())
}

/// Run one place lookup and select a candidate
async fn search_place(
    editor: &mut Editor,
    config: &Config,
    query: &str,
    interactive: bool,
    output: &Output,
) -> Result<()> {
    let lookup = HttpPlaceLookup::new(config.search_url.clone())?;

    let search = editor.search_mut();
    search.input(query, Instant::now());
    let Some(request) = search.flush() else {
        return Ok(());
    };
    let result = lookup.lookup(&request.query).await;
    search.complete(request.generation, result);
    output.print_panel(search.panel());

    let count = search.results().len();
    if count == 0 {
        return Ok(());
    }

    let index = if interactive && count > 1 {
        loop {
            let answer = prompt_optional(&format!("Pick a place [1-{}]", count))?;
            match answer.as_deref().map(str::parse::<usize>) {
                Some(Ok(n)) if (1..=count).contains(&n) => break n - 1,
                None => {
                    editor.search_mut().dismiss();
                    return Ok(());
                }
                _ => println!("Enter a number between 1 and {}.", count),
            }
        }
    } else {
        0
    };

    if let Some(place) = editor.select_place(index) {
        output.message(&format!("Selected: {} ({})", place.name, place.address));
    }
    Ok(())
}

/// Commit, asking for missing required fields when interactive
fn commit(editor: &mut Editor, store: &mut Store, interactive: bool) -> Result<Uuid> {
    loop {
        match editor.commit(store) {
            Ok(id) => return Ok(id),
            Err(CommitError::Validation(e)) if interactive => {
                eprintln!("⚠ {}", e);
                match e {
                    ValidationError::NameRequired => match prompt_optional("Title")? {
                        Some(name) => editor.draft_mut().name = name,
                        None => bail!("Entry was not saved: {}", e),
                    },
                    ValidationError::MainPhotoRequired => {
                        match prompt_optional("Main photo path")? {
                            Some(path) => editor.set_main_photo(load_image(Path::new(&path))?, None),
                            None => bail!("Entry was not saved: {}", e),
                        }
                    }
                    other => bail!("Entry was not saved: {}", other),
                }
            }
            Err(e) => return Err(e).context("Entry was not saved"),
        }
    }
}

/// List entries, newest first
pub fn list(store: &Store, query: Option<String>, page: usize, output: &Output) -> Result<()> {
    let entries = match query.as_deref() {
        Some(q) => store.search(q)?,
        None => store.get_all()?,
    };

    output.print_entries(&paginate(entries, page), query.as_deref());
    Ok(())
}

/// Show a single entry
pub fn show(store: &Store, id: String, output: &Output) -> Result<()> {
    let uuid = parse_entry_id(&id, store)?;
    let stored = store
        .get_by_id(uuid)?
        .ok_or_else(|| anyhow!("Entry not found: {}", id))?;

    output.print_entry(&stored);
    Ok(())
}

/// Delete an entry
pub fn delete(store: &mut Store, id: String, output: &Output) -> Result<()> {
    let uuid = parse_entry_id(&id, store)?;

    if output.should_prompt() {
        if let Some(stored) = store.get_by_id(uuid)? {
            println!(
                "Delete entry: {} - {}",
                &uuid.to_string()[..8],
                stored.entry.name
            );
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if store.delete(uuid).context("Failed to delete entry")? {
        output.success(&format!("Deleted entry: {}", uuid));
    } else {
        output.message(&format!("Entry {} was already gone", uuid));
    }
    Ok(())
}

/// Open the entry's address in Naver Map
pub fn map(store: &Store, id: String, output: &Output) -> Result<()> {
    let uuid = parse_entry_id(&id, store)?;
    let stored = store
        .get_by_id(uuid)?
        .ok_or_else(|| anyhow!("Entry not found: {}", id))?;

    let url = map_url(&stored.entry.address)
        .ok_or_else(|| anyhow!("No address for '{}'", stored.entry.name))?;

    output.message(url.as_str());
    open::that(url.as_str()).context("Failed to open browser")?;
    Ok(())
}

/// Write the full entry, payloads included, as JSON
pub fn export(store: &Store, id: String, path: Option<PathBuf>, output: &Output) -> Result<()> {
    let uuid = parse_entry_id(&id, store)?;
    let stored = store
        .get_by_id(uuid)?
        .ok_or_else(|| anyhow!("Entry not found: {}", id))?;

    let json = serde_json::to_string_pretty(&stored.entry).context("Failed to serialize entry")?;
    match path {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output.success(&format!("Exported {} to {}", uuid, path.display()));
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Read an exported entry and store it under its own id
pub fn import(store: &mut Store, path: PathBuf, output: &Output) -> Result<()> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let entry: DiaryEntry = serde_json::from_str(&content)
        .with_context(|| format!("{} is not an exported entry", path.display()))?;

    store.put(&entry).context("Failed to import entry")?;
    output.success(&format!("Imported entry: {} - {}", entry.id, entry.name));
    Ok(())
}

fn load_image(path: &Path) -> Result<InlineImage> {
    InlineImage::from_path(path).with_context(|| format!("Cannot use {} as a photo", path.display()))
}

fn map_url(address: &str) -> Option<Url> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }
    let mut url = Url::parse(NAVER_MAP_SEARCH).ok()?;
    url.path_segments_mut().ok()?.push(address);
    Some(url)
}

fn parse_coords(s: &str) -> Result<Coords, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lng\", got '{}'", s))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {}", e))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("longitude: {}", e))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(format!("coordinates out of range: {}, {}", lat, lng));
    }
    Ok(Coords { lat, lng })
}

fn parse_stroke(s: &str) -> Result<Vec<(f64, f64)>> {
    let points = s
        .split_whitespace()
        .map(|pair| -> Result<(f64, f64)> {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| anyhow!("Invalid stroke point '{}', expected x,y", pair))?;
            let x: f64 = x.parse().with_context(|| format!("Invalid x in '{}'", pair))?;
            let y: f64 = y.parse().with_context(|| format!("Invalid y in '{}'", pair))?;
            if !x.is_finite() || !y.is_finite() {
                bail!("Stroke point '{}' is not a finite position", pair);
            }
            Ok((x, y))
        })
        .collect::<Result<Vec<_>>>()?;

    if points.is_empty() {
        bail!("Empty stroke");
    }
    Ok(points)
}

/// Parse an entry ID (supports full UUID or prefix)
fn parse_entry_id(id: &str, store: &Store) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid);
    }

    let entries = store.get_all()?;
    let matches: Vec<_> = entries
        .iter()
        .filter(|s| s.entry.id.to_string().starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("No entry found matching: {}", id),
        1 => Ok(matches[0].entry.id),
        _ => {
            eprintln!("Multiple entries match '{}':", id);
            for stored in &matches {
                eprintln!("  {} - {}", stored.entry.id, stored.entry.name);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
