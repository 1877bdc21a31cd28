//! Process-wide UI preferences
//!
//! Font, theme and text colour are stored under three independent keys.
//! They are loaded once at startup into a `PreferencesHandle`; changes go
//! through the handle, which persists them and notifies subscribers.
//! Views receive `&Preferences` explicitly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::warn;

use crate::storage::StorageResult;
use crate::store::Store;

/// Store key for the font family
pub const FONT_KEY: &str = "font";
/// Store key for the colour theme
pub const THEME_KEY: &str = "theme";
/// Store key for the text colour
pub const COLOR_KEY: &str = "color";

const DEFAULT_COLOR: &str = "#000000";

/// Font families offered by the theme picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Font {
    #[default]
    Malgun,
    Roboto,
    Nanum,
    Gothic,
    Serif,
    Comic,
    Courier,
    Futura,
    Garamond,
    Impact,
}

impl Font {
    pub const ALL: [Font; 10] = [
        Font::Malgun,
        Font::Roboto,
        Font::Nanum,
        Font::Gothic,
        Font::Serif,
        Font::Comic,
        Font::Courier,
        Font::Futura,
        Font::Garamond,
        Font::Impact,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Font::Malgun => "malgun",
            Font::Roboto => "roboto",
            Font::Nanum => "nanum",
            Font::Gothic => "gothic",
            Font::Serif => "serif",
            Font::Comic => "comic",
            Font::Courier => "courier",
            Font::Futura => "futura",
            Font::Garamond => "garamond",
            Font::Impact => "impact",
        }
    }

    /// CSS font-family stack
    pub fn css_stack(self) -> &'static str {
        match self {
            Font::Malgun => {
                r#""Malgun Gothic","Apple SD Gothic Neo","Noto Sans KR",-apple-system,BlinkMacSystemFont,system-ui,sans-serif"#
            }
            Font::Roboto => {
                r#"Roboto,"Noto Sans KR",-apple-system,BlinkMacSystemFont,system-ui,sans-serif"#
            }
            Font::Nanum => r#""Nanum Pen Script","Comic Neue","Patrick Hand",-apple-system,system-ui,cursive"#,
            Font::Gothic => {
                r#""Noto Sans KR","Apple SD Gothic Neo",-apple-system,BlinkMacSystemFont,system-ui,sans-serif"#
            }
            Font::Serif => r#"Georgia,"Times New Roman","Noto Serif KR",-apple-system,system-ui,serif"#,
            Font::Comic => r#""Comic Sans MS","Comic Neue","Patrick Hand",-apple-system,system-ui,cursive"#,
            Font::Courier => r#""Courier New","SFMono-Regular","Menlo","Monaco","Noto Sans Mono",monospace"#,
            Font::Futura => r#"Futura,"Avenir Next","Nunito",-apple-system,system-ui,sans-serif"#,
            Font::Garamond => r#""Garamond","EB Garamond","Noto Serif KR","Times New Roman",serif"#,
            Font::Impact => r#""Impact","Anton","Bebas Neue","Arial Black",-apple-system,system-ui,sans-serif"#,
        }
    }
}

impl FromStr for Font {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Font::ALL
            .into_iter()
            .find(|font| font.key() == s)
            .ok_or_else(|| format!("unknown font: {s}"))
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Colour themes, keyed by letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Theme {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    #[default]
    K,
}

impl Theme {
    pub const ALL: [Theme; 11] = [
        Theme::A,
        Theme::B,
        Theme::C,
        Theme::D,
        Theme::E,
        Theme::F,
        Theme::G,
        Theme::H,
        Theme::I,
        Theme::J,
        Theme::K,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Theme::A => "A",
            Theme::B => "B",
            Theme::C => "C",
            Theme::D => "D",
            Theme::E => "E",
            Theme::F => "F",
            Theme::G => "G",
            Theme::H => "H",
            Theme::I => "I",
            Theme::J => "J",
            Theme::K => "K",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::A => "Sky",
            Theme::B => "Pink",
            Theme::C => "Mint",
            Theme::D => "Purple",
            Theme::E => "Yellow",
            Theme::F => "Orange",
            Theme::G => "Lavender",
            Theme::H => "Mint Blue",
            Theme::I => "Peach",
            Theme::J => "Gray",
            Theme::K => "Black & White",
        }
    }

    pub fn background(self) -> &'static str {
        match self {
            Theme::A => "#E7F5FF",
            Theme::B => "#f9d9e0ff",
            Theme::C => "#D3F9D8",
            Theme::D => "#F3F0FF",
            Theme::E => "#fef7d5ff",
            Theme::F => "#f7e3c8ff",
            Theme::G => "#F8F0FC",
            Theme::H => "#E6FCF5",
            Theme::I => "#FFF0F6",
            Theme::J => "#F8F9FA",
            Theme::K => "#FFFFFF",
        }
    }

    pub fn primary(self) -> &'static str {
        match self {
            Theme::A => "#74C0FC",
            Theme::B => "#F783AC",
            Theme::C => "#38D9A9",
            Theme::D => "#9476edff",
            Theme::E => "#fcd970ff",
            Theme::F => "#FF922B",
            Theme::G => "#DA77F2",
            Theme::H => "#15AABF",
            Theme::I => "#F06595",
            Theme::J => "#868E96",
            Theme::K => "#000000",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown theme: {s}"))
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The three UI preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub font: Font,
    pub theme: Theme,
    /// Text colour as a CSS hex string
    pub color: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            font: Font::default(),
            theme: Theme::default(),
            color: DEFAULT_COLOR.to_string(),
        }
    }
}

impl Preferences {
    /// Build from stored key/value pairs
    ///
    /// Missing keys and unrecognized values fall back to defaults.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut prefs = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                FONT_KEY => match value.parse() {
                    Ok(font) => prefs.font = font,
                    Err(e) => warn!("Ignoring stored preference: {}", e),
                },
                THEME_KEY => match value.parse() {
                    Ok(theme) => prefs.theme = theme,
                    Err(e) => warn!("Ignoring stored preference: {}", e),
                },
                COLOR_KEY if is_hex_color(value) => prefs.color = value.to_string(),
                COLOR_KEY => warn!("Ignoring stored text colour: {}", value),
                other => warn!("Unknown preference key: {}", other),
            }
        }
        prefs
    }

    /// The key/value pairs to persist
    pub fn to_pairs(&self) -> [(&'static str, String); 3] {
        [
            (FONT_KEY, self.font.key().to_string()),
            (THEME_KEY, self.theme.key().to_string()),
            (COLOR_KEY, self.color.clone()),
        ]
    }
}

/// Whether a string is a `#RRGGBB` or `#RRGGBBAA` colour
pub fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Live preferences shared across views
///
/// Cloning the handle shares the same underlying value.
#[derive(Debug, Clone)]
pub struct PreferencesHandle {
    tx: watch::Sender<Preferences>,
}

impl PreferencesHandle {
    pub fn new(initial: Preferences) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Load from the store at startup
    pub fn load(store: &Store) -> StorageResult<Self> {
        Ok(Self::new(store.load_preferences()?))
    }

    /// Snapshot of the current preferences
    pub fn get(&self) -> Preferences {
        self.tx.borrow().clone()
    }

    /// Receive a notification on every change
    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.tx.subscribe()
    }

    /// Persist new preferences, then publish them
    pub fn set(&self, store: &mut Store, prefs: Preferences) -> StorageResult<()> {
        store.save_preferences(&prefs)?;
        self.tx.send_replace(prefs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert_eq!(prefs.font, Font::Malgun);
        assert_eq!(prefs.theme, Theme::K);
        assert_eq!(prefs.color, "#000000");
        assert_eq!(prefs.theme.background(), "#FFFFFF");
    }

    #[test]
    fn test_from_pairs() {
        let prefs = Preferences::from_pairs([("font", "nanum"), ("theme", "B"), ("color", "#333333")]);
        assert_eq!(prefs.font, Font::Nanum);
        assert_eq!(prefs.theme, Theme::B);
        assert_eq!(prefs.color, "#333333");
    }

    #[test]
    fn test_from_pairs_falls_back() {
        let prefs = Preferences::from_pairs([
            ("font", "wingdings"),
            ("theme", "Z"),
            ("color", "red"),
            ("unrelated", "x"),
        ]);
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_pairs_round_trip() {
        let prefs = Preferences {
            font: Font::Courier,
            theme: Theme::H,
            color: "#112233".into(),
        };
        assert_eq!(Preferences::from_pairs(prefs.to_pairs()), prefs);
    }

    #[test]
    fn test_theme_parse_is_case_insensitive() {
        assert_eq!("c".parse::<Theme>().unwrap(), Theme::C);
        assert_eq!("C".parse::<Theme>().unwrap(), Theme::C);
        assert!("L".parse::<Theme>().is_err());
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#a1B2c3"));
        assert!(is_hex_color("#a1B2c3ff"));
        assert!(!is_hex_color("a1b2c3"));
        assert!(!is_hex_color("#abc"));
        assert!(!is_hex_color("#gggggg"));
    }

    #[test]
    fn test_handle_notifies_subscribers() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = Store::open_with_config(crate::config::tests::test_config(&dir)).unwrap();

        let handle = PreferencesHandle::load(&store).unwrap();
        assert_eq!(handle.get(), Preferences::default());

        let mut rx = handle.subscribe();
        let next = Preferences {
            font: Font::Serif,
            theme: Theme::A,
            color: "#222222".into(),
        };
        handle.set(&mut store, next.clone()).unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), next);
        assert_eq!(store.load_preferences().unwrap(), next);
    }
}
