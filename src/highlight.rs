//! Syntax highlighting of event payloads for the detail pane.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use thiserror::Error;

use crate::theme::{syntax_palette, SyntaxPalette};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HighlightError {
    #[error("no highlighter for language `{0}`")]
    UnknownLanguage(String),
    #[error("unknown syntax theme `{0}`")]
    UnknownTheme(String),
}

/// Turns source text into styled terminal text.
pub trait Highlighter: Send {
    fn highlight(&self, text: &str, language: &str, theme: &str)
        -> Result<Text<'static>, HighlightError>;
}

/// Built-in highlighter for the JSON and YAML renderings of events.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntaxHighlighter;

impl Highlighter for SyntaxHighlighter {
    fn highlight(
        &self,
        text: &str,
        language: &str,
        theme: &str,
    ) -> Result<Text<'static>, HighlightError> {
        let palette =
            syntax_palette(theme).ok_or_else(|| HighlightError::UnknownTheme(theme.to_string()))?;
        let segments = match language.trim().to_ascii_lowercase().as_str() {
            "json" => json_segments(text),
            "yaml" | "yml" => yaml_segments(text),
            _ => return Err(HighlightError::UnknownLanguage(language.to_string())),
        };
        Ok(styled_text(segments, &palette))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyntaxKind {
    Key,
    String,
    Number,
    Bool,
    Null,
    Comment,
    Punctuation,
    Other,
}

impl SyntaxKind {
    fn style(self, palette: &SyntaxPalette) -> Style {
        let base = Style::default();
        match self {
            Self::Key => base.fg(palette.key).add_modifier(Modifier::BOLD),
            Self::String => base.fg(palette.string),
            Self::Number => base.fg(palette.number),
            Self::Bool => base.fg(palette.boolean),
            Self::Null => base.fg(palette.null),
            Self::Comment => base.fg(palette.comment).add_modifier(Modifier::ITALIC),
            Self::Punctuation => base.fg(palette.punctuation),
            Self::Other => base.fg(palette.text),
        }
    }
}

fn styled_text(segments: Vec<(SyntaxKind, &str)>, palette: &SyntaxPalette) -> Text<'static> {
    let mut lines: Vec<Vec<Span<'static>>> = vec![Vec::new()];

    for (kind, segment) in segments {
        let style = kind.style(palette);
        for (idx, part) in segment.split('\n').enumerate() {
            if idx > 0 {
                lines.push(Vec::new());
            }
            if part.is_empty() {
                continue;
            }
            if let Some(line) = lines.last_mut() {
                line.push(Span::styled(part.to_string(), style));
            }
        }
    }

    Text::from(lines.into_iter().map(Line::from).collect::<Vec<_>>())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectPhase {
    KeyOrEnd,
    Colon,
    Value,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayPhase {
    ValueOrEnd,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonContext {
    Object(ObjectPhase),
    Array(ArrayPhase),
}

fn after_value(context: &mut [JsonContext]) {
    match context.last_mut() {
        Some(JsonContext::Object(phase)) if *phase == ObjectPhase::Value => {
            *phase = ObjectPhase::CommaOrEnd;
        }
        Some(JsonContext::Array(phase)) if *phase == ArrayPhase::ValueOrEnd => {
            *phase = ArrayPhase::CommaOrEnd;
        }
        _ => {}
    }
}

/// Splits JSON into classified segments. Tolerates malformed input, including
/// strings broken across lines by the word-wrap transform.
pub(crate) fn json_segments(input: &str) -> Vec<(SyntaxKind, &str)> {
    let bytes = input.as_bytes();
    let mut i = 0usize;
    let mut out = Vec::new();
    let mut context: Vec<JsonContext> = Vec::new();

    while i < bytes.len() {
        let start = i;
        match bytes[i] {
            b'"' => {
                i += 1;
                let mut escaped = false;
                while i < bytes.len() {
                    let byte = bytes[i];
                    i += 1;
                    if escaped {
                        escaped = false;
                        continue;
                    }
                    match byte {
                        b'\\' => escaped = true,
                        b'"' => break,
                        _ => {}
                    }
                }
                // Escapes may precede a multi-byte character.
                while !input.is_char_boundary(i) {
                    i += 1;
                }

                let kind = match context.last_mut() {
                    Some(JsonContext::Object(phase)) if *phase == ObjectPhase::KeyOrEnd => {
                        *phase = ObjectPhase::Colon;
                        SyntaxKind::Key
                    }
                    _ => {
                        after_value(&mut context);
                        SyntaxKind::String
                    }
                };
                out.push((kind, &input[start..i]));
            }
            b'{' | b'[' => {
                i += 1;
                out.push((SyntaxKind::Punctuation, &input[start..i]));
                context.push(if bytes[start] == b'{' {
                    JsonContext::Object(ObjectPhase::KeyOrEnd)
                } else {
                    JsonContext::Array(ArrayPhase::ValueOrEnd)
                });
            }
            b'}' => {
                i += 1;
                out.push((SyntaxKind::Punctuation, &input[start..i]));
                if matches!(context.last(), Some(JsonContext::Object(_))) {
                    context.pop();
                    after_value(&mut context);
                }
            }
            b']' => {
                i += 1;
                out.push((SyntaxKind::Punctuation, &input[start..i]));
                if matches!(context.last(), Some(JsonContext::Array(_))) {
                    context.pop();
                    after_value(&mut context);
                }
            }
            b':' => {
                i += 1;
                out.push((SyntaxKind::Punctuation, &input[start..i]));
                if let Some(JsonContext::Object(phase)) = context.last_mut() {
                    if *phase == ObjectPhase::Colon {
                        *phase = ObjectPhase::Value;
                    }
                }
            }
            b',' => {
                i += 1;
                out.push((SyntaxKind::Punctuation, &input[start..i]));
                match context.last_mut() {
                    Some(JsonContext::Object(phase)) if *phase == ObjectPhase::CommaOrEnd => {
                        *phase = ObjectPhase::KeyOrEnd;
                    }
                    Some(JsonContext::Array(phase)) if *phase == ArrayPhase::CommaOrEnd => {
                        *phase = ArrayPhase::ValueOrEnd;
                    }
                    _ => {}
                }
            }
            b'-' | b'0'..=b'9' => {
                if bytes[i] == b'-' {
                    i += 1;
                }
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if i < bytes.len() && bytes[i] == b'.' {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
                    i += 1;
                    if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
                        i += 1;
                    }
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                out.push((SyntaxKind::Number, &input[start..i]));
                after_value(&mut context);
            }
            b't' if bytes[i..].starts_with(b"true") => {
                i += 4;
                out.push((SyntaxKind::Bool, &input[start..i]));
                after_value(&mut context);
            }
            b'f' if bytes[i..].starts_with(b"false") => {
                i += 5;
                out.push((SyntaxKind::Bool, &input[start..i]));
                after_value(&mut context);
            }
            b'n' if bytes[i..].starts_with(b"null") => {
                i += 4;
                out.push((SyntaxKind::Null, &input[start..i]));
                after_value(&mut context);
            }
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n') {
                    i += 1;
                }
                out.push((SyntaxKind::Other, &input[start..i]));
            }
            _ => {
                i += input[start..].chars().next().map_or(1, char::len_utf8);
                out.push((SyntaxKind::Other, &input[start..i]));
            }
        }
    }

    out
}

/// Splits YAML into classified segments, one line at a time.
pub(crate) fn yaml_segments(input: &str) -> Vec<(SyntaxKind, &str)> {
    let mut out = Vec::new();
    for (idx, line) in input.split('\n').enumerate() {
        if idx > 0 {
            out.push((SyntaxKind::Other, "\n"));
        }
        yaml_line_segments(line, &mut out);
    }
    out
}

fn yaml_line_segments<'a>(line: &'a str, out: &mut Vec<(SyntaxKind, &'a str)>) {
    let indent = line.len() - line.trim_start().len();
    if indent > 0 {
        out.push((SyntaxKind::Other, &line[..indent]));
    }
    let mut rest = &line[indent..];

    while let Some(after) = rest.strip_prefix("- ") {
        out.push((SyntaxKind::Punctuation, &rest[..1]));
        out.push((SyntaxKind::Other, &rest[1..2]));
        rest = after;
    }
    if rest == "-" || rest == "---" {
        out.push((SyntaxKind::Punctuation, rest));
        return;
    }
    if rest.starts_with('#') {
        out.push((SyntaxKind::Comment, rest));
        return;
    }

    if let Some(colon) = yaml_key_end(rest) {
        out.push((SyntaxKind::Key, &rest[..colon]));
        out.push((SyntaxKind::Punctuation, &rest[colon..colon + 1]));
        rest = &rest[colon + 1..];
        let gap = rest.len() - rest.trim_start().len();
        if gap > 0 {
            out.push((SyntaxKind::Other, &rest[..gap]));
        }
        rest = &rest[gap..];
    }

    if !rest.is_empty() {
        out.push((yaml_scalar_kind(rest), rest));
    }
}

fn yaml_key_end(text: &str) -> Option<usize> {
    if text.starts_with(|ch| matches!(ch, '"' | '\'' | '|' | '>' | '[' | '{')) {
        return None;
    }
    let bytes = text.as_bytes();
    for (idx, byte) in bytes.iter().enumerate() {
        match byte {
            b':' if idx > 0 && bytes.get(idx + 1).map_or(true, |next| *next == b' ') => {
                return Some(idx);
            }
            b' ' if bytes.get(idx + 1) == Some(&b'#') => return None,
            _ => {}
        }
    }
    None
}

fn yaml_scalar_kind(value: &str) -> SyntaxKind {
    let trimmed = value.trim_end();
    match trimmed {
        "null" | "Null" | "NULL" | "~" => SyntaxKind::Null,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => SyntaxKind::Bool,
        "{}" | "[]" => SyntaxKind::Punctuation,
        _ if trimmed.starts_with('|') || trimmed.starts_with('>') => SyntaxKind::Punctuation,
        _ if looks_numeric(trimmed) => SyntaxKind::Number,
        _ => SyntaxKind::String,
    }
}

fn looks_numeric(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    digits.starts_with(|ch: char| ch.is_ascii_digit()) && value.parse::<f64>().is_ok()
}
