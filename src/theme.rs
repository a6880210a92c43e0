//! Named themes for syntax highlighting and the dashboard chrome.
//!
//! Syntax themes are looked up by name at render time; an unknown name is reported by the
//! highlighter and the detail pane falls back to plain text. Chrome colors live in
//! [`UiTheme`], which is handed to the TUI at construction.

use ratatui::style::Color;

pub const DEFAULT_SYNTAX_THEME: &str = "solarized-dark";

/// Official syntax theme names.
pub const SYNTAX_THEMES: [&str; 3] = ["solarized-dark", "solarized-light", "terminal"];

/// Default selection color of the event list.
pub const DEFAULT_SELECTION: Color = Color::Rgb(0xfc, 0xc2, 0x03);

mod solarized {
    use ratatui::style::Color;

    pub const BASE01: Color = Color::Rgb(0x58, 0x6e, 0x75);
    pub const BASE00: Color = Color::Rgb(0x65, 0x7b, 0x83);
    pub const BASE0: Color = Color::Rgb(0x83, 0x94, 0x96);
    pub const BASE1: Color = Color::Rgb(0x93, 0xa1, 0xa1);
    pub const YELLOW: Color = Color::Rgb(0xb5, 0x89, 0x00);
    pub const ORANGE: Color = Color::Rgb(0xcb, 0x4b, 0x16);
    pub const RED: Color = Color::Rgb(0xdc, 0x32, 0x2f);
    pub const MAGENTA: Color = Color::Rgb(0xd3, 0x36, 0x82);
    pub const BLUE: Color = Color::Rgb(0x26, 0x8b, 0xd2);
    pub const CYAN: Color = Color::Rgb(0x2a, 0xa1, 0x98);
}

/// Colors per syntax element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxPalette {
    pub key: Color,
    pub string: Color,
    pub number: Color,
    pub boolean: Color,
    pub null: Color,
    pub comment: Color,
    pub punctuation: Color,
    pub text: Color,
}

/// Resolve a syntax theme by name. Returns `None` for unknown themes.
pub fn syntax_palette(name: &str) -> Option<SyntaxPalette> {
    let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
    match normalized.as_str() {
        "solarized-dark" | "solarized" => Some(SyntaxPalette {
            key: solarized::BLUE,
            string: solarized::CYAN,
            number: solarized::MAGENTA,
            boolean: solarized::YELLOW,
            null: solarized::ORANGE,
            comment: solarized::BASE01,
            punctuation: solarized::BASE01,
            text: solarized::BASE0,
        }),
        "solarized-light" => Some(SyntaxPalette {
            key: solarized::BLUE,
            string: solarized::CYAN,
            number: solarized::MAGENTA,
            boolean: solarized::YELLOW,
            null: solarized::RED,
            comment: solarized::BASE1,
            punctuation: solarized::BASE1,
            text: solarized::BASE00,
        }),
        "terminal" | "ansi" => Some(SyntaxPalette {
            key: Color::Cyan,
            string: Color::Green,
            number: Color::Magenta,
            boolean: Color::Yellow,
            null: Color::Yellow,
            comment: Color::DarkGray,
            punctuation: Color::Reset,
            text: Color::Reset,
        }),
        _ => None,
    }
}

/// Chrome colors of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiTheme {
    /// Name of the syntax theme used by the detail pane.
    pub syntax: String,
    pub selection: Color,
    pub app_title_fg: Color,
    pub app_title_bg: Color,
    pub list_title_fg: Color,
    pub list_title_bg: Color,
    pub border: Color,
    pub dimmed: Color,
    pub error: Color,
    pub frozen: Color,
}

impl Default for UiTheme {
    fn default() -> Self {
        Self {
            syntax: DEFAULT_SYNTAX_THEME.to_string(),
            selection: DEFAULT_SELECTION,
            app_title_fg: Color::Rgb(0xff, 0xfd, 0xf5),
            app_title_bg: solarized::BLUE,
            list_title_fg: Color::Rgb(0xff, 0xfd, 0xf5),
            list_title_bg: Color::Rgb(0x25, 0xa0, 0x65),
            border: solarized::BASE01,
            dimmed: Color::DarkGray,
            error: solarized::RED,
            frozen: solarized::ORANGE,
        }
    }
}

impl UiTheme {
    pub fn with_syntax(mut self, syntax: impl Into<String>) -> Self {
        self.syntax = syntax.into();
        self
    }

    pub fn with_selection(mut self, selection: Color) -> Self {
        self.selection = selection;
        self
    }

    /// Title background while the list is frozen.
    pub fn list_title_bg_for(&self, frozen: bool) -> Color {
        if frozen {
            self.frozen
        } else {
            self.list_title_bg
        }
    }
}

/// Parse `#RRGGBB`, `0xRRGGBB`, `RRGGBB` or `rgb:RR/GG/BB` into a color.
pub fn parse_hex_color(value: &str) -> Result<Color, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("empty color".to_string());
    }

    let lower = trimmed.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("rgb:") {
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != 3 {
            return Err(format!("invalid rgb: value: {trimmed}"));
        }
        let r = parse_hex_channel(parts[0])?;
        let g = parse_hex_channel(parts[1])?;
        let b = parse_hex_channel(parts[2])?;
        return Ok(Color::Rgb(r, g, b));
    }

    let hex = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(format!("invalid hex color: {trimmed} (expected #RRGGBB)"));
    }
    let rgb = u32::from_str_radix(hex, 16).map_err(|_| format!("invalid hex color: {trimmed}"))?;
    let r = ((rgb >> 16) & 0xFF) as u8;
    let g = ((rgb >> 8) & 0xFF) as u8;
    let b = (rgb & 0xFF) as u8;
    Ok(Color::Rgb(r, g, b))
}

fn parse_hex_channel(value: &str) -> Result<u8, String> {
    let value = value.trim();
    match value.len() {
        2 => u8::from_str_radix(value, 16).map_err(|_| format!("invalid rgb: component {value}")),
        4 => u16::from_str_radix(value, 16)
            .map(|parsed| (parsed >> 8) as u8)
            .map_err(|_| format!("invalid rgb: component {value}")),
        _ => Err(format!("invalid rgb: component {value} (expected 2 or 4 hex digits)")),
    }
}
