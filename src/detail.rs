//! Raw-details pane content: format selection, word-wrap and highlighting.

use ratatui::text::Text;
use tracing::debug;

use crate::display_item::DisplayItem;
use crate::highlight::{Highlighter, SyntaxHighlighter};
use crate::theme::DEFAULT_SYNTAX_THEME;

/// Escaped newlines become a real line break, marked with a trailing `  \`.
const WRAP_REPLACEMENT: &str = "  \\\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl Format {
    pub const ALL: [Format; 2] = [Format::Json, Format::Yaml];

    pub fn next(self) -> Self {
        match self {
            Self::Json => Self::Yaml,
            Self::Yaml => Self::Json,
        }
    }

    /// Highlighter language name.
    pub fn language(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }

    pub fn text_of(self, item: &DisplayItem) -> &str {
        match self {
            Self::Json => &item.json,
            Self::Yaml => &item.yaml,
        }
    }
}

/// Turns every escaped `\n` sequence into a visible line break.
pub fn wrap_escaped_newlines(text: &str) -> String {
    text.replace("\\n", WRAP_REPLACEMENT)
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailBody {
    Highlighted(Text<'static>),
    /// Highlighting failed; the source text is shown unstyled.
    Plain(String),
}

/// What the detail pane shows for the selected item.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailContent {
    /// Text handed to the highlighter (after the optional word-wrap transform).
    pub source: String,
    pub format: Format,
    pub body: DetailBody,
}

impl DetailContent {
    pub fn is_highlighted(&self) -> bool {
        matches!(self.body, DetailBody::Highlighted(_))
    }

    pub fn to_text(&self) -> Text<'static> {
        match &self.body {
            DetailBody::Highlighted(text) => text.clone(),
            DetailBody::Plain(plain) => Text::raw(plain.clone()),
        }
    }

    pub fn line_count(&self) -> usize {
        match &self.body {
            DetailBody::Highlighted(text) => text.lines.len(),
            DetailBody::Plain(plain) => plain.lines().count().max(1),
        }
    }
}

pub struct DetailRenderer {
    highlighter: Box<dyn Highlighter>,
    theme: String,
}

impl Default for DetailRenderer {
    fn default() -> Self {
        Self::new(Box::new(SyntaxHighlighter), DEFAULT_SYNTAX_THEME)
    }
}

impl std::fmt::Debug for DetailRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailRenderer").field("theme", &self.theme).finish_non_exhaustive()
    }
}

impl DetailRenderer {
    pub fn new(highlighter: Box<dyn Highlighter>, theme: impl Into<String>) -> Self {
        Self { highlighter, theme: theme.into() }
    }

    /// Renders `item` in `format`; `None` when nothing is selected.
    pub fn render(
        &self,
        item: Option<&DisplayItem>,
        format: Format,
        word_wrap: bool,
    ) -> Option<DetailContent> {
        let item = item?;
        let raw = format.text_of(item);
        let source = if word_wrap { wrap_escaped_newlines(raw) } else { raw.to_string() };

        let body = match self.highlighter.highlight(&source, format.language(), &self.theme) {
            Ok(text) => DetailBody::Highlighted(text),
            Err(error) => {
                debug!(error = %error, format = format.label(), "highlighting failed; showing plain text");
                DetailBody::Plain(source.clone())
            }
        };

        Some(DetailContent { source, format, body })
    }
}
