//! Terminal input helpers
//!
//! Memos are written in the user's editor; everything else is a one-line
//! answer read from stdin.

use std::env;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Editors tried in order when neither $VISUAL nor $EDITOR is set
const FALLBACK_EDITORS: [&str; 3] = ["nano", "vim", "vi"];

/// Edit a memo in $VISUAL/$EDITOR and return the trimmed result
pub fn edit_text(initial: &str) -> Result<String> {
    let editor = find_editor().context("No editor found. Set $EDITOR, e.g. export EDITOR=nano")?;

    let file = tempfile::Builder::new()
        .prefix("diary-memo-")
        .suffix(".txt")
        .tempfile()
        .context("Failed to create memo file")?;
    fs::write(file.path(), initial).context("Failed to write memo file")?;

    let status = Command::new(&editor)
        .arg(file.path())
        .status()
        .with_context(|| format!("Failed to run editor '{}'", editor))?;
    if !status.success() {
        bail!("Editor '{}' exited with {}", editor, status);
    }

    let memo = fs::read_to_string(file.path()).context("Failed to read memo file")?;
    Ok(memo.trim_end().to_string())
}

fn find_editor() -> Option<String> {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|var| env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .or_else(|| {
            FALLBACK_EDITORS
                .into_iter()
                .find(|name| on_path(name))
                .map(String::from)
        })
}

fn on_path(program: &str) -> bool {
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Whether stdin is attached to a terminal
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Ask a yes/no question; anything but y/yes (or no TTY) is a no
pub fn confirm(question: &str) -> Result<bool> {
    if !is_interactive() {
        return Ok(false);
    }
    let answer = ask(&format!("{} [y/N] ", question))?;
    Ok(matches!(
        answer.as_deref().map(str::to_lowercase).as_deref(),
        Some("y" | "yes")
    ))
}

/// Prompt for a value; None when the answer is blank
pub fn prompt_optional(label: &str) -> Result<Option<String>> {
    ask(&format!("{}: ", label))
}

/// Prompt showing the current value; None keeps it
pub fn prompt_with_default(label: &str, current: &str) -> Result<Option<String>> {
    if current.is_empty() {
        prompt_optional(label)
    } else {
        ask(&format!("{} [{}]: ", label, current))
    }
}

fn ask(prompt: &str) -> Result<Option<String>> {
    let mut stdout = io::stdout();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(non_blank(&line))
}

fn non_blank(input: &str) -> Option<String> {
    let input = input.trim();
    (!input.is_empty()).then(|| input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  ramen \n"), Some("ramen".to_string()));
        assert_eq!(non_blank(" \n"), None);
        assert_eq!(non_blank(""), None);
    }

    #[test]
    fn test_on_path_rejects_missing_program() {
        assert!(!on_path("diary-no-such-editor-for-tests"));
    }
}
