//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde_json::json;

use diary_core::search::{Panel, PlaceCandidate};
use diary_core::store::Page;
use diary_core::{DiaryEntry, LayerKind, Preferences, StoredEntry};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print the detail view of one entry
    pub fn print_entry(&self, stored: &StoredEntry) {
        let entry = &stored.entry;
        match self.format {
            OutputFormat::Human => {
                println!("ID:         {}", entry.id);
                println!("Place:      {}", entry.name);
                println!("Address:    {}", entry.address_or_fallback());
                if let Some(coords) = entry.coords {
                    println!("Coords:     {:.6}, {:.6}", coords.lat, coords.lng);
                }
                println!("Created:    {}", entry.created_at.format("%Y-%m-%d %H:%M"));
                println!(
                    "Theme:      {} ({}, background {})",
                    entry.theme,
                    entry.theme.name(),
                    entry.bg_color
                );
                println!("Line style: {}", entry.line_style.as_str());
                println!(
                    "Photos:     main ({}) + {} more",
                    human_bytes(entry.main_photo.len()),
                    entry.additional_photos.len()
                );
                println!(
                    "Drawing:    {}",
                    entry
                        .drawing
                        .as_ref()
                        .map(|d| human_bytes(d.len()))
                        .unwrap_or_else(|| "(none)".to_string())
                );

                if !entry.layers.is_empty() {
                    println!();
                    println!("── Layers ({}) ──", entry.layers.len());
                    for layer in &entry.layers {
                        let t = &layer.transform;
                        let what = match &layer.kind {
                            LayerKind::Photo { photo, shape } => {
                                format!("photo #{} [{:?}]", photo + 1, shape)
                            }
                            LayerKind::Sticker { emoji } => format!("sticker {}", emoji),
                        };
                        println!(
                            "{:>3}  {:<20} at ({:.0}, {:.0}) {:.0}x{:.0} scale {:.2} rot {:.0}°",
                            layer.id, what, t.x, t.y, t.width, t.height, t.scale, t.rotation
                        );
                    }
                }

                println!();
                println!("── Memo ──");
                println!("{}", entry.memo_or_placeholder());
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&entry_detail(entry)).unwrap_or_default()
                );
            }
            OutputFormat::Quiet => {
                println!("{}", entry.id);
            }
        }
    }

    /// Print one page of the entry list
    pub fn print_entries(&self, page: &Page<StoredEntry>, query: Option<&str>) {
        match self.format {
            OutputFormat::Human => {
                if page.items.is_empty() {
                    match query {
                        Some(q) => println!("No entries match '{}'.", q),
                        None => println!("No entries yet. Create one with `diary entry new`."),
                    }
                    return;
                }
                for stored in &page.items {
                    let entry = &stored.entry;
                    println!(
                        "{} | {} | {} | {}",
                        &entry.id.to_string()[..8],
                        entry.created_at.format("%Y-%m-%d"),
                        truncate(&entry.name, 30),
                        truncate(entry.address_or_fallback(), 40)
                    );
                }
                println!(
                    "\nPage {}/{} · {} entr{}",
                    page.number,
                    page.total_pages,
                    page.total_items,
                    if page.total_items == 1 { "y" } else { "ies" }
                );
            }
            OutputFormat::Json => {
                let items: Vec<_> = page.items.iter().map(|s| entry_summary(&s.entry)).collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "page": page.number,
                        "total_pages": page.total_pages,
                        "total_items": page.total_items,
                        "items": items,
                    }))
                    .unwrap_or_default()
                );
            }
            OutputFormat::Quiet => {
                for stored in &page.items {
                    println!("{}", stored.entry.id);
                }
            }
        }
    }

    /// Print the place search panel
    pub fn print_panel(&self, panel: Panel<'_>) {
        match self.format {
            OutputFormat::Human => match panel {
                Panel::Hidden => {}
                Panel::Loading => println!("Searching..."),
                Panel::NoResults => println!("No results"),
                Panel::Results(items) => {
                    for (i, item) in items.iter().enumerate() {
                        println!("  [{}] {} - {}", i + 1, item.name, item.address);
                    }
                }
            },
            OutputFormat::Json => {
                let items: &[PlaceCandidate] = match panel {
                    Panel::Results(items) => items,
                    _ => &[],
                };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "items": items })).unwrap_or_default()
                );
            }
            OutputFormat::Quiet => {
                if let Panel::Results(items) = panel {
                    for item in items {
                        println!("{}", item.name);
                    }
                }
            }
        }
    }

    /// Print the current preferences
    pub fn print_preferences(&self, prefs: &Preferences) {
        match self.format {
            OutputFormat::Human => {
                println!("Font:  {} ({})", prefs.font, prefs.font.css_stack());
                println!(
                    "Theme: {} - {} (background {}, primary {})",
                    prefs.theme,
                    prefs.theme.name(),
                    prefs.theme.background(),
                    prefs.theme.primary()
                );
                println!("Color: {}", prefs.color);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(prefs).unwrap_or_default());
            }
            OutputFormat::Quiet => {
                println!("{} {} {}", prefs.font, prefs.theme, prefs.color);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!("{}", json!({"status": "success", "message": message}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Entry fields without the image payloads
fn entry_summary(entry: &DiaryEntry) -> serde_json::Value {
    json!({
        "id": entry.id,
        "name": entry.name,
        "address": entry.address,
        "coords": entry.coords,
        "memo": entry.memo,
        "theme": entry.theme,
        "bg_color": entry.bg_color,
        "line_style": entry.line_style,
        "created_at": entry.created_at,
        "photos": entry.additional_photos.len(),
        "layers": entry.layers,
        "has_drawing": entry.drawing.is_some(),
    })
}

/// Summary plus the CSS a page renderer needs
fn entry_detail(entry: &DiaryEntry) -> serde_json::Value {
    let layers: Vec<_> = entry
        .layers
        .iter()
        .map(|layer| {
            let clip_path = match &layer.kind {
                LayerKind::Photo { shape, .. } => Some(shape.clip_path()),
                LayerKind::Sticker { .. } => None,
            };
            json!({
                "id": layer.id,
                "transform": layer.transform.css(),
                "clip_path": clip_path,
            })
        })
        .collect();

    let mut value = entry_summary(entry);
    value["render"] = json!({
        "border": entry.line_style.border_css(),
        "background": entry.bg_color,
        "primary": entry.theme.primary(),
        "layers": layers,
    });
    value
}

/// Format a byte count for display
fn human_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let bytes = bytes as f64;
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < KB * KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{:.1} MB", bytes / (KB * KB))
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diary_core::{ClipShape, InlineImage, Layer, LayerId, LineStyle, Transform};

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("맛있는 국수집 본점 강남", 8), "맛있는 국...");
    }

    #[test]
    fn test_entry_detail_renders_css() {
        let photo = InlineImage::from_bytes(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
            .unwrap();
        let mut entry = DiaryEntry::new("국수집", photo);
        entry.line_style = LineStyle::Dashed;
        entry.layers.push(Layer {
            id: LayerId(1),
            transform: Transform::at(10.0, 20.0),
            kind: LayerKind::Photo {
                photo: 0,
                shape: ClipShape::Circle,
            },
        });
        entry
            .layers
            .push(Layer::sticker(LayerId(2), "🍜", Transform::at(5.0, 5.0)));

        let detail = entry_detail(&entry);
        let render = &detail["render"];
        assert_eq!(render["border"], "2px dashed #94a3b8");
        assert_eq!(render["background"], entry.bg_color.as_str());
        assert_eq!(
            render["layers"][0]["transform"],
            Transform::at(10.0, 20.0).css().as_str()
        );
        assert_eq!(render["layers"][0]["clip_path"], "circle(50%)");
        assert!(render["layers"][1]["clip_path"].is_null());
        // Summary fields stay alongside
        assert_eq!(detail["name"], "국수집");
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
