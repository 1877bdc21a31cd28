//! Inline image payloads
//!
//! Photos and drawings travel through the app as bytes plus a MIME type.
//! Their portable form is a base64 `data:` URL, which is also what they
//! serialize to.

use std::fmt;
use std::io::{self, Cursor};
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use exif::{In, Tag, Value};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::models::Coords;

/// Errors raised while reading or converting image payloads
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image payload is empty")]
    Empty,

    #[error("Unrecognized image format")]
    UnknownFormat,

    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    #[error("Failed to read image '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// An owned image payload with its MIME type
#[derive(Clone, PartialEq, Eq)]
pub struct InlineImage {
    mime: String,
    bytes: Vec<u8>,
}

impl InlineImage {
    /// Build from raw bytes, sniffing the format from magic bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let format = image::guess_format(&bytes).map_err(|_| ImageError::UnknownFormat)?;
        Ok(Self {
            mime: format.to_mime_type().to_string(),
            bytes,
        })
    }

    /// Build from bytes with a known MIME type (for loading from storage)
    pub fn with_mime(mime: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        Ok(Self {
            mime: mime.into(),
            bytes,
        })
    }

    /// Read an image file into its inline form
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ImageError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(bytes)
    }

    /// Parse a base64 `data:` URL
    pub fn from_data_url(url: &str) -> Result<Self, ImageError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::MalformedDataUrl("missing data: scheme".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ImageError::MalformedDataUrl("missing payload".into()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| ImageError::MalformedDataUrl("only base64 payloads are supported".into()))?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| ImageError::MalformedDataUrl(e.to_string()))?;

        if mime.is_empty() {
            Self::from_bytes(bytes)
        } else {
            Self::with_mime(mime, bytes)
        }
    }

    /// Render as a displayable `data:` URL
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Where the photo was taken, from its EXIF GPS tags
    ///
    /// Missing or unreadable metadata yields None.
    pub fn gps_coords(&self) -> Option<Coords> {
        let exif = exif::Reader::new()
            .read_from_container(&mut Cursor::new(self.bytes.as_slice()))
            .ok()?;
        let lat = gps_degrees(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S')?;
        let lng = gps_degrees(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W')?;
        if lat.abs() > 90.0 || lng.abs() > 180.0 {
            return None;
        }
        Some(Coords { lat, lng })
    }
}

/// Degrees/minutes/seconds to signed decimal degrees
fn gps_degrees(exif: &exif::Exif, value: Tag, reference: Tag, negative: u8) -> Option<f64> {
    let Value::Rational(parts) = &exif.get_field(value, In::PRIMARY)?.value else {
        return None;
    };
    let [deg, min, sec] = parts.get(..3)? else {
        return None;
    };
    let degrees = deg.to_f64() + min.to_f64() / 60.0 + sec.to_f64() / 3600.0;
    if !degrees.is_finite() {
        return None;
    }

    let sign = match exif.get_field(reference, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Ascii(refs)) if refs.first().and_then(|r| r.first()) == Some(&negative) => -1.0,
        _ => 1.0,
    };
    Some(sign * degrees)
}

impl fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Serialize for InlineImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.data_url())
    }
}

impl<'de> Deserialize<'de> for InlineImage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        Self::from_data_url(&url).map_err(serde::de::Error::custom)
    }
}
