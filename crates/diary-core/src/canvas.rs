//! Sticker and drawing canvas
//!
//! The canvas turns pointer and gesture input into `CanvasEvent`s for the
//! editor to apply. It never mutates layers itself: transform handlers take
//! the current layers as input and describe the change.
//!
//! Freehand strokes are rasterized onto a `DrawingSurface`. When a stroke
//! ends, the whole surface is flattened to a PNG and emitted.

use std::io::Cursor;

use image::{imageops, ImageFormat, Rgba, RgbaImage};

use crate::media::{ImageError, InlineImage};
use crate::models::{clamp_layer_size, Layer, LayerId, LayerPatch};

/// Drawing surface width in pixels
pub const SURFACE_WIDTH: u32 = 640;
/// Drawing surface height in pixels
pub const SURFACE_HEIGHT: u32 = 670;

pub const PEN_WIDTH: f64 = 3.0;
pub const ERASER_WIDTH: f64 = 20.0;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Active drawing tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Pen(Rgba<u8>),
    Eraser,
}

impl Default for Tool {
    fn default() -> Self {
        Tool::Pen(Rgba([0, 0, 0, 255]))
    }
}

impl Tool {
    /// Pen in a `#RRGGBB` colour
    pub fn pen(hex: &str) -> Option<Self> {
        parse_hex_color(hex).map(Tool::Pen)
    }

    pub fn width(self) -> f64 {
        match self {
            Tool::Pen(_) => PEN_WIDTH,
            Tool::Eraser => ERASER_WIDTH,
        }
    }
}

/// Parse `#RRGGBB` into an opaque colour
pub fn parse_hex_color(hex: &str) -> Option<Rgba<u8>> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

/// Raster layer holding the freehand drawing
#[derive(Debug, Clone)]
pub struct DrawingSurface {
    image: RgbaImage,
}

impl Default for DrawingSurface {
    fn default() -> Self {
        Self::new(SURFACE_WIDTH, SURFACE_HEIGHT)
    }
}

impl DrawingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| p.0[3] == 0)
    }

    pub fn clear(&mut self) {
        self.image.pixels_mut().for_each(|p| *p = TRANSPARENT);
    }

    /// Stamp one round tip centred on `(x, y)`
    pub fn stamp(&mut self, x: f64, y: f64, tool: Tool) {
        let radius = tool.width() / 2.0;
        let color = match tool {
            Tool::Pen(color) => color,
            Tool::Eraser => TRANSPARENT,
        };

        let min_x = (x - radius).floor().max(0.0) as u32;
        let min_y = (y - radius).floor().max(0.0) as u32;
        let max_x = (x + radius).ceil().min(f64::from(self.width()) - 1.0);
        let max_y = (y + radius).ceil().min(f64::from(self.height()) - 1.0);
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }

        for py in min_y..=max_y as u32 {
            for px in min_x..=max_x as u32 {
                let dx = f64::from(px) + 0.5 - x;
                let dy = f64::from(py) + 0.5 - y;
                if dx * dx + dy * dy <= radius * radius {
                    self.image.put_pixel(px, py, color);
                }
            }
        }
    }

    /// Draw a round-capped segment
    ///
    /// Only the part within reach of the surface is rasterized, so far
    /// off-surface endpoints cost no more than an edge-to-edge stroke.
    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), tool: Tool) {
        let reach = tool.width() / 2.0;
        let bounds = (
            -reach,
            -reach,
            f64::from(self.width()) + reach,
            f64::from(self.height()) + reach,
        );
        let Some((from, to)) = clip_segment(from, to, bounds) else {
            return;
        };

        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = (dx * dx + dy * dy).sqrt();
        let spacing = (tool.width() / 4.0).max(0.5);
        let steps = (length / spacing).ceil().max(1.0) as u32;

        for i in 0..=steps {
            let t = f64::from(i) / f64::from(steps);
            self.stamp(from.0 + dx * t, from.1 + dy * t, tool);
        }
    }

    /// Composite a stored drawing over the surface
    pub fn paint(&mut self, drawing: &InlineImage) -> Result<(), ImageError> {
        let layer = image::load_from_memory(drawing.bytes())?.to_rgba8();
        imageops::overlay(&mut self.image, &layer, 0, 0);
        Ok(())
    }

    /// Flatten the surface to PNG
    pub fn encode_png(&self) -> Result<InlineImage, ImageError> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, ImageFormat::Png)?;
        InlineImage::with_mime("image/png", buf.into_inner())
    }
}

/// Clip a segment to `(min_x, min_y, max_x, max_y)` (Liang-Barsky)
fn clip_segment(
    from: (f64, f64),
    to: (f64, f64),
    (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (mut enter, mut exit) = (0.0_f64, 1.0_f64);

    for (p, q) in [
        (-dx, from.0 - min_x),
        (dx, max_x - from.0),
        (-dy, from.1 - min_y),
        (dy, max_y - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            enter = enter.max(t);
        } else {
            exit = exit.min(t);
        }
        if enter > exit {
            return None;
        }
    }

    Some((
        (from.0 + dx * enter, from.1 + dy * enter),
        (from.0 + dx * exit, from.1 + dy * exit),
    ))
}

/// Interaction mode, derived from the read-only and drawing flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasMode {
    /// Read-only display; no handler has any effect
    View,
    /// Layers can be moved, scaled, resized, reshaped and removed
    Transform,
    /// Pointer input draws; layer handlers are disabled
    Drawing,
}

/// A change for the editor to apply to its draft
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    Transform { id: LayerId, patch: LayerPatch },
    Remove { id: LayerId },
    /// The full flattened drawing, replacing any previous one
    Drawing(InlineImage),
}

#[derive(Debug, Clone)]
pub struct Canvas {
    read_only: bool,
    drawing_mode: bool,
    tool: Tool,
    surface: DrawingSurface,
    /// Last pointer position of the active stroke
    stroke: Option<(f64, f64)>,
    /// Drawing the surface currently reflects, if synced
    loaded: Option<Option<InlineImage>>,
}

impl Canvas {
    pub fn new(read_only: bool) -> Self {
        Self {
            read_only,
            drawing_mode: false,
            tool: Tool::default(),
            surface: DrawingSurface::default(),
            stroke: None,
            loaded: None,
        }
    }

    pub fn mode(&self) -> CanvasMode {
        if self.read_only {
            CanvasMode::View
        } else if self.drawing_mode {
            CanvasMode::Drawing
        } else {
            CanvasMode::Transform
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Switch between transforming layers and drawing; returns the new state
    pub fn toggle_drawing_mode(&mut self) -> bool {
        if !self.read_only {
            self.drawing_mode = !self.drawing_mode;
            self.stroke = None;
        }
        self.drawing_mode
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    fn target<'a>(&self, layers: &'a [Layer], id: LayerId) -> Option<&'a Layer> {
        if self.mode() != CanvasMode::Transform {
            return None;
        }
        layers.iter().find(|layer| layer.id == id)
    }

    // ==================== Layer handlers ====================

    /// Drag by a pointer delta
    pub fn drag(&self, layers: &[Layer], id: LayerId, dx: f64, dy: f64) -> Option<CanvasEvent> {
        let t = self.target(layers, id)?.transform;
        Some(CanvasEvent::Transform {
            id,
            patch: LayerPatch::Position {
                x: t.x + dx,
                y: t.y + dy,
            },
        })
    }

    /// Pinch/rotate gesture with a relative scale delta and an angle delta
    pub fn gesture(
        &self,
        layers: &[Layer],
        id: LayerId,
        scale_delta: f64,
        angle_delta: f64,
    ) -> Option<CanvasEvent> {
        let t = self.target(layers, id)?.transform;
        Some(CanvasEvent::Transform {
            id,
            patch: LayerPatch::ScaleRotation {
                scale: t.scale * (1.0 + scale_delta),
                rotation: t.rotation + angle_delta,
            },
        })
    }

    /// Resize handle; both axes are clamped into the allowed box
    pub fn resize(
        &self,
        layers: &[Layer],
        id: LayerId,
        width: f64,
        height: f64,
    ) -> Option<CanvasEvent> {
        self.target(layers, id)?;
        Some(CanvasEvent::Transform {
            id,
            patch: LayerPatch::Size {
                width: clamp_layer_size(width),
                height: clamp_layer_size(height),
            },
        })
    }

    /// Click cycles the clip shape of photo layers
    pub fn click(&self, layers: &[Layer], id: LayerId) -> Option<CanvasEvent> {
        let shape = self.target(layers, id)?.shape()?;
        Some(CanvasEvent::Transform {
            id,
            patch: LayerPatch::Shape(shape.next()),
        })
    }

    pub fn remove(&self, id: LayerId) -> Option<CanvasEvent> {
        (self.mode() == CanvasMode::Transform).then_some(CanvasEvent::Remove { id })
    }

    // ==================== Drawing ====================

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        if self.mode() != CanvasMode::Drawing || !x.is_finite() || !y.is_finite() {
            return;
        }
        self.surface.stamp(x, y, self.tool);
        self.stroke = Some((x, y));
    }

    /// Extend the active stroke; non-finite positions are ignored
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        if let Some(last) = self.stroke {
            self.surface.line(last, (x, y), self.tool);
            self.stroke = Some((x, y));
        }
    }

    /// End the stroke and emit the flattened drawing
    pub fn pointer_up(&mut self) -> Result<Option<CanvasEvent>, ImageError> {
        if self.stroke.take().is_none() {
            return Ok(None);
        }
        let png = self.surface.encode_png()?;
        self.loaded = Some(Some(png.clone()));
        Ok(Some(CanvasEvent::Drawing(png)))
    }

    pub fn pointer_leave(&mut self) -> Result<Option<CanvasEvent>, ImageError> {
        self.pointer_up()
    }

    /// Repaint from the entry's drawing if it differs from what is shown
    ///
    /// The first call after construction or `remount` always repaints.
    /// Returns whether the surface was repainted.
    pub fn sync_drawing(&mut self, drawing: Option<&InlineImage>) -> Result<bool, ImageError> {
        if let Some(loaded) = &self.loaded {
            if loaded.as_ref() == drawing {
                return Ok(false);
            }
        }

        self.surface.clear();
        if let Some(drawing) = drawing {
            self.surface.paint(drawing)?;
        }
        self.loaded = Some(drawing.cloned());
        Ok(true)
    }

    /// Forget the synced drawing so the next sync repaints
    pub fn remount(&mut self) {
        self.loaded = None;
        self.stroke = None;
    }
}
