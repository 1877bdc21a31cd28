//! Theme and preference command handlers

use anyhow::{bail, Result};

use diary_core::preferences::is_hex_color;
use diary_core::{Font, PreferencesHandle, Store, Theme};

use crate::output::{Output, OutputFormat};

/// Show the current preferences
pub fn show(store: &Store, output: &Output) -> Result<()> {
    output.print_preferences(&store.load_preferences()?);
    Ok(())
}

/// List available themes and fonts
pub fn list(output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            let themes: Vec<_> = Theme::ALL
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "key": t.key(),
                        "name": t.name(),
                        "background": t.background(),
                        "primary": t.primary(),
                    })
                })
                .collect();
            let fonts: Vec<_> = Font::ALL.iter().map(|f| f.key()).collect();
            println!(
                "{}",
                serde_json::json!({ "themes": themes, "fonts": fonts })
            );
        }
        OutputFormat::Quiet => {
            for theme in Theme::ALL {
                println!("{}", theme);
            }
        }
        OutputFormat::Human => {
            println!("Themes:");
            for theme in Theme::ALL {
                println!(
                    "  {}  {:<14} background {}  primary {}",
                    theme,
                    theme.name(),
                    theme.background(),
                    theme.primary()
                );
            }
            println!();
            println!("Fonts:");
            for font in Font::ALL {
                println!("  {:<10} {}", font.key(), font.css_stack());
            }
        }
    }
    Ok(())
}

/// Change any of theme, font and text colour
pub fn set(
    store: &mut Store,
    theme: Option<Theme>,
    font: Option<Font>,
    color: Option<String>,
    output: &Output,
) -> Result<()> {
    if theme.is_none() && font.is_none() && color.is_none() {
        bail!("Nothing to change. Pass --theme, --font or --color.");
    }

    let handle = PreferencesHandle::load(store)?;
    let mut prefs = handle.get();

    if let Some(theme) = theme {
        prefs.theme = theme;
    }
    if let Some(font) = font {
        prefs.font = font;
    }
    if let Some(color) = color {
        if !is_hex_color(&color) {
            bail!("Invalid colour '{}'. Use #RRGGBB.", color);
        }
        prefs.color = color;
    }

    // Report what subscribers observe, not the local copy
    let mut applied = handle.subscribe();
    handle.set(store, prefs)?;

    if applied.has_changed().unwrap_or(false) {
        output.success("Preferences saved");
        output.print_preferences(&applied.borrow_and_update());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diary_core::Config;
    use tempfile::TempDir;

    fn temp_store(dir: &TempDir) -> Store {
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        Store::open_with_config(config).unwrap()
    }

    #[test]
    fn test_set_persists_partial_change() {
        let dir = TempDir::new().unwrap();
        let mut store = temp_store(&dir);
        let output = Output::new(OutputFormat::Quiet);

        set(&mut store, Some(Theme::B), None, None, &output).unwrap();
        set(&mut store, None, Some(Font::Gothic), None, &output).unwrap();

        let prefs = store.load_preferences().unwrap();
        assert_eq!(prefs.theme, Theme::B);
        assert_eq!(prefs.font, Font::Gothic);
        assert_eq!(prefs.color, "#000000");
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let mut store = temp_store(&dir);
        let output = Output::new(OutputFormat::Quiet);

        assert!(set(&mut store, None, None, None, &output).is_err());
        assert!(set(&mut store, None, None, Some("red".into()), &output).is_err());
        assert_eq!(store.load_preferences().unwrap().theme, Theme::K);
    }
}
