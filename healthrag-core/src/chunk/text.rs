//! Document text normalization and language tagging

use std::path::{Component, Path};

/// Language tag used when no path segment names a language
pub const DEFAULT_LANGUAGE: &str = "en";

/// Path segment aliases, checked in order
const LANGUAGE_ALIASES: &[(&[&str], &str)] = &[(&["tamil", "ta"], "ta"), (&["hindi", "hi"], "hi")];

/// Decode bytes as UTF-8, dropping invalid sequences instead of replacing them
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// Trim every line, drop the empty ones and rejoin with `\n`
pub fn clean_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Infer a two-letter language code from the segments of a relative path.
///
/// Content is never inspected: `ta/fever.txt` is Tamil, `docs/en_general/fever.txt`
/// falls back to [`DEFAULT_LANGUAGE`].
pub fn infer_language(rel_path: &Path) -> &'static str {
    let segments: Vec<String> = rel_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_lowercase()),
            _ => None,
        })
        .collect();

    LANGUAGE_ALIASES
        .iter()
        .find(|(aliases, _)| segments.iter().any(|s| aliases.contains(&s.as_str())))
        .map(|(_, code)| *code)
        .unwrap_or(DEFAULT_LANGUAGE)
}

/// `/`-joined form of a relative path, stable across platforms
pub fn source_name(rel_path: &Path) -> String {
    rel_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
