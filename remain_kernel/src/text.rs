//! Text helpers shared by the chat-facing strategies.

use serde_json::json;

/// Section sign the client uses for formatting codes.
pub const COLOR_CHAR: char = '\u{00A7}';

/// Translate `&`-prefixed formatting codes into section-sign codes.
pub fn colorize(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut chars = message.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '&' {
            if let Some(&next) = chars.peek() {
                if is_format_code(next) {
                    out.push(COLOR_CHAR);
                    out.push(next.to_ascii_lowercase());
                    chars.next();
                    continue;
                }
            }
        }
        out.push(ch);
    }
    out
}

fn is_format_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r')
}

/// Remove section-sign formatting codes. `&` sequences are plain text here.
pub fn strip_colors(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut chars = message.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == COLOR_CHAR {
            if let Some(&next) = chars.peek() {
                if is_format_code(next) || next.eq_ignore_ascii_case(&'x') {
                    chars.next();
                    continue;
                }
            }
        }
        out.push(ch);
    }
    out
}

/// Drop one pair of surrounding single or double quotes.
pub fn strip_quotes(text: &str) -> &str {
    let quoted = text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\'')));
    if quoted {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Minimal JSON chat component carrying colorized text.
pub fn component_json(text: &str) -> String {
    json!({ "text": colorize(strip_quotes(text)) }).to_string()
}

/// Extract the `text` field from a minimal chat component.
/// Returns an empty string for anything else.
pub fn component_text(json: &str) -> String {
    serde_json::from_str::<serde_json::Value>(json)
        .ok()
        .and_then(|v| v.get("text").and_then(|t| t.as_str()).map(str::to_string))
        .unwrap_or_default()
}
