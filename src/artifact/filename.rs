//! Suggested filenames for generated artifacts and safe save paths.
//!
//! Names come from, in order: a hint supplied with the artifact (the remote
//! locator's last path segment, or a `Content-Disposition` filename), then
//! the request's topic, then [`FALLBACK_STEM`].

use std::path::{Component, Path, PathBuf};

/// Stem used when neither a hint nor the topic yields a usable name.
pub const FALLBACK_STEM: &str = "presentation";

/// Extension appended to topic-derived names.
pub const ARTIFACT_EXTENSION: &str = ".pptx";

/// Maximum characters kept from the topic.
pub const TOPIC_STEM_MAX_CHARS: usize = 20;

/// Builds the save name for an artifact.
///
/// A usable `hint` wins; otherwise the name is derived from `topic`.
#[must_use]
pub fn suggested_filename(hint: Option<&str>, topic: &str) -> String {
    hint.and_then(usable_hint)
        .unwrap_or_else(|| filename_from_topic(topic))
}

/// Derives `<stem>.pptx` from free text.
///
/// Whitespace runs become a single `_`, characters outside letters, digits,
/// `-` and `.` are dropped, and the stem is cut to [`TOPIC_STEM_MAX_CHARS`].
#[must_use]
pub fn filename_from_topic(topic: &str) -> String {
    let cleaned = sanitize_stem(topic);
    let truncated: String = cleaned.chars().take(TOPIC_STEM_MAX_CHARS).collect();
    let stem = truncated.trim_matches(|c: char| c == '_' || c == '.' || c == '-');
    if stem.is_empty() {
        format!("{FALLBACK_STEM}{ARTIFACT_EXTENSION}")
    } else {
        format!("{stem}{ARTIFACT_EXTENSION}")
    }
}

/// Last path segment of a locator, percent-decoded.
///
/// Works for absolute URLs and for relative locators such as `/files/abc.pptx`.
#[must_use]
pub fn filename_from_locator(locator: &str) -> Option<String> {
    let path = locator.split(['?', '#']).next().unwrap_or("");
    let last = path.rsplit('/').next()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| last.to_string());
    Some(decoded)
}

fn usable_hint(hint: &str) -> Option<String> {
    let trimmed = hint.trim();
    if trimmed.is_empty() {
        return None;
    }
    let sanitized = sanitize_filename(trimmed);
    let meaningful = sanitized.chars().any(char::is_alphanumeric);
    (meaningful && is_safe_filename_segment(&sanitized)).then_some(sanitized)
}

fn sanitize_stem(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_whitespace() || ch == '_' {
            if !prev_sep && !out.is_empty() {
                out.push('_');
                prev_sep = true;
            }
        } else if ch.is_alphanumeric() || matches!(ch, '-' | '.') {
            out.push(ch);
            prev_sep = false;
        }
    }
    out
}

/// Parses Content-Disposition header to extract filename.
///
/// Handles both:
/// - `attachment; filename="deck.pptx"`
/// - `attachment; filename=deck.pptx`
/// - `attachment; filename*=UTF-8''deck.pptx` (RFC 5987)
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + 10..].trim();
        // Format: charset'language'encoded_value
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            if let Ok(decoded) = urlencoding::decode(encoded[..end].trim()) {
                return Some(decoded.into_owned());
            }
        }
    }

    if let Some(pos) = header.find("filename=") {
        let value = header[pos + 9..].trim();
        if let Some(stripped) = value.strip_prefix('"') {
            if let Some(end) = stripped.find('"') {
                return Some(stripped[..end].to_string());
            }
        } else {
            let end = value.find(';').unwrap_or(value.len());
            let filename = value[..end].trim();
            if !filename.is_empty() {
                return Some(filename.to_string());
            }
        }
    }

    None
}

/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized.replace('.', "_")
    }
}

/// Picks a path in `dir` that does not exist yet.
///
/// `deck.pptx`, then `deck_2.pptx`, `deck_3.pptx`, ...
pub(crate) fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    let filename = {
        let sanitized = sanitize_filename(filename);
        if sanitized.trim_matches('_').is_empty() {
            format!("{FALLBACK_STEM}{ARTIFACT_EXTENSION}")
        } else {
            sanitized
        }
    };
    let base_path = dir.join(&filename);
    if !base_path.exists() {
        return base_path;
    }

    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename.as_str(), ""),
    };

    for i in 2..1000 {
        let candidate = dir.join(format!("{stem}_{i}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dir.join(format!("{stem}_{timestamp}{ext}"))
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
