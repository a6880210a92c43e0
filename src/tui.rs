//! Ratatui interface for salt-live.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::detail::{DetailContent, DetailRenderer, Format};
use crate::display_item::DisplayItem;
use crate::follow::{FollowController, FollowMode};
use crate::highlight::{Highlighter, SyntaxHighlighter};
use crate::history::HistoryBuffer;
use crate::layout;
use crate::theme::UiTheme;
use crate::visible::{FilterState, VisibleList, ROWS_PER_ITEM};

pub const DEFAULT_MAX_ITEMS: usize = 1000;

const APP_TITLE: &str = "Salt live";
const DETAIL_TITLE: &str = "Raw details";
const KEY_HELP: &str = "f follow · w wrap · m json/yaml · / filter · q quit";

#[derive(Debug, Clone)]
pub struct TuiConfig {
    pub max_items: usize,
    pub theme: UiTheme,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self { max_items: DEFAULT_MAX_ITEMS, theme: UiTheme::default() }
    }
}

/// View toggles and pane geometry.
#[derive(Debug, Clone, Default)]
pub struct TuiState {
    pub format: Format,
    pub word_wrap: bool,
    pub detail_scroll: u16,
    pub detail_viewport_height: u16,
    pub terminal_size: (u16, u16),
}

/// Possible actions requiring external side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
}

#[derive(Debug, Clone)]
struct DetailKey {
    item: Arc<DisplayItem>,
    format: Format,
    word_wrap: bool,
}

impl DetailKey {
    fn matches(&self, item: &Arc<DisplayItem>, format: Format, word_wrap: bool) -> bool {
        Arc::ptr_eq(&self.item, item) && self.format == format && self.word_wrap == word_wrap
    }
}

#[derive(Debug)]
pub struct Tui {
    pub config: TuiConfig,
    pub state: TuiState,
    history: HistoryBuffer,
    visible: VisibleList,
    follow: FollowController,
    renderer: DetailRenderer,
    detail: Option<DetailContent>,
    detail_key: Option<DetailKey>,
}

impl Tui {
    pub fn new(config: TuiConfig) -> Self {
        Self::with_highlighter(config, Box::new(SyntaxHighlighter))
    }

    pub fn with_highlighter(config: TuiConfig, highlighter: Box<dyn Highlighter>) -> Self {
        let renderer = DetailRenderer::new(highlighter, config.theme.syntax.clone());
        Self {
            history: HistoryBuffer::new(config.max_items),
            visible: VisibleList::new(),
            follow: FollowController::new(),
            renderer,
            detail: None,
            detail_key: None,
            state: TuiState::default(),
            config,
        }
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn visible(&self) -> &VisibleList {
        &self.visible
    }

    pub fn follow_mode(&self) -> FollowMode {
        self.follow.mode()
    }

    pub fn list_title(&self) -> String {
        self.follow.title()
    }

    pub fn selected_item(&self) -> Option<&Arc<DisplayItem>> {
        self.visible.selected_item()
    }

    pub fn detail(&self) -> Option<&DetailContent> {
        self.detail.as_ref()
    }

    /// Records a new event. The visible list only moves while following.
    pub fn push_item(&mut self, item: DisplayItem) {
        self.history.push(Arc::new(item));
        self.follow.on_push(&self.history, &mut self.visible);
        self.refresh_detail();
    }

    pub fn handle_resize(&mut self, width: u16, height: u16) {
        self.state.terminal_size = (width, height);
        let panes = layout::compute(Rect::new(0, 0, width, height), self.detail.is_some());
        let inner = list_block().inner(panes.list);
        self.visible.set_size(inner.width, inner.height);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        if self.visible.filter_state() == FilterState::Filtering {
            self.visible.handle_key(key);
        } else {
            match key.code {
                KeyCode::Char('q') => return Action::Quit,
                KeyCode::Char('f') => {
                    self.follow.enable_follow(&self.history, &mut self.visible);
                }
                KeyCode::Char('w') => self.state.word_wrap = !self.state.word_wrap,
                KeyCode::Char('m') => self.state.format = self.state.format.next(),
                KeyCode::Char('J') => {
                    let next = self.state.detail_scroll.saturating_add(1);
                    self.state.detail_scroll = next.min(self.max_detail_scroll());
                }
                KeyCode::Char('K') => {
                    self.state.detail_scroll = self.state.detail_scroll.saturating_sub(1);
                }
                _ => {
                    self.visible.handle_key(key);
                }
            }
        }

        self.follow.observe_selection(self.visible.index());
        self.refresh_detail();
        Action::None
    }

    /// Furthest the detail pane can scroll given the last drawn viewport.
    fn max_detail_scroll(&self) -> u16 {
        let lines = self.detail.as_ref().map_or(0, DetailContent::line_count);
        lines
            .saturating_sub(usize::from(self.state.detail_viewport_height))
            .min(usize::from(u16::MAX)) as u16
    }

    fn refresh_detail(&mut self) {
        let Some(item) = self.visible.selected_item().cloned() else {
            return;
        };
        let (format, word_wrap) = (self.state.format, self.state.word_wrap);
        if self.detail_key.as_ref().is_some_and(|key| key.matches(&item, format, word_wrap)) {
            return;
        }

        let content = self.renderer.render(Some(item.as_ref()), format, word_wrap);
        if content != self.detail {
            self.state.detail_scroll = 0;
        }
        self.detail = content;
        self.detail_key = Some(DetailKey { item, format, word_wrap });
    }

    pub fn render(&mut self, frame: &mut Frame<'_>) {
        let area = frame.area();
        self.state.terminal_size = (area.width, area.height);
        let panes = layout::compute(area, self.detail.is_some());

        self.render_top_bar(frame, panes.top_bar);
        self.render_list(frame, panes.list);
        if let Some(detail_area) = panes.detail {
            self.render_detail(frame, detail_area);
        }
    }

    fn theme(&self) -> &UiTheme {
        &self.config.theme
    }

    fn dimmed_style(&self) -> Style {
        Style::default().fg(self.theme().dimmed)
    }

    fn render_top_bar(&self, frame: &mut Frame<'_>, area: Rect) {
        let theme = self.theme();
        let (status, status_color) = match self.follow.mode() {
            FollowMode::Following => ("▶ follow", theme.list_title_bg),
            FollowMode::Frozen => ("⏸ frozen", theme.frozen),
        };
        let wrap = if self.state.word_wrap { "wrap on" } else { "wrap off" };

        let spans = vec![
            Span::styled(
                format!(" {APP_TITLE} "),
                Style::default()
                    .fg(theme.app_title_fg)
                    .bg(theme.app_title_bg)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(status, Style::default().fg(status_color).add_modifier(Modifier::BOLD)),
            Span::styled(" · ", self.dimmed_style()),
            Span::raw(self.state.format.label()),
            Span::styled(" · ", self.dimmed_style()),
            Span::raw(wrap),
            Span::styled(" · ", self.dimmed_style()),
            Span::raw(format!("{}/{} buffered", self.history.len(), self.history.capacity())),
        ];
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_list(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let theme = self.theme().clone();
        let frozen = self.follow.mode() == FollowMode::Frozen;
        let total = self.visible.len();
        let pos = if total == 0 { 0 } else { self.visible.index().saturating_add(1).min(total) };

        let title = Line::from(Span::styled(
            format!(" {} ", self.follow.title()),
            Style::default()
                .fg(theme.list_title_fg)
                .bg(theme.list_title_bg_for(frozen))
                .add_modifier(Modifier::BOLD),
        ));
        let block = list_block()
            .title(title)
            .title_bottom(Line::from(format!("─ {KEY_HELP} ─")).left_aligned())
            .title_bottom(Line::from(format!("─ {pos} of {total} ─")).right_aligned())
            .border_style(Style::default().fg(theme.border));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let list_area = if self.visible.filter_state() == FilterState::Unfiltered {
            inner
        } else {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(0)])
                .split(inner);
            frame.render_widget(Paragraph::new(self.filter_line()), chunks[0]);
            chunks[1]
        };
        self.visible.set_size(list_area.width, list_area.height);

        let capacity = usize::from(list_area.height / ROWS_PER_ITEM);
        let offset = self.visible.scroll_offset(capacity);
        let items: Vec<ListItem> = self
            .visible
            .items()
            .map(|item| {
                let title_style = if item.failed {
                    Style::default().fg(theme.error).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().add_modifier(Modifier::BOLD)
                };
                ListItem::new(Text::from(vec![
                    Line::from(Span::styled(item.title.clone(), title_style)),
                    Line::from(Span::styled(item.summary(), Style::default().fg(theme.dimmed))),
                ]))
            })
            .collect();

        let mut state = ListState::default().with_offset(offset);
        if total > 0 {
            state.select(Some(self.visible.index()));
        }
        let list = List::new(items)
            .highlight_style(Style::default().fg(theme.selection))
            .highlight_symbol("│ ");
        frame.render_stateful_widget(list, list_area, &mut state);
    }

    fn filter_line(&self) -> Line<'static> {
        let editing = self.visible.filter_state() == FilterState::Filtering;
        let mut spans = vec![
            Span::styled("Filter: ", self.dimmed_style()),
            Span::raw(self.visible.filter_query().to_string()),
        ];
        if editing {
            spans.push(Span::styled("▏", Style::default().fg(self.theme().selection)));
        }
        Line::from(spans)
    }

    fn render_detail(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let Some(content) = self.detail.as_ref() else {
            return;
        };
        let theme = self.theme();
        let title = Line::from(vec![
            Span::raw("─ "),
            Span::styled(DETAIL_TITLE, Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(" · ", self.dimmed_style()),
            Span::raw(content.format.label()),
            Span::raw(" "),
        ]);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_bottom(Line::from(format!("─ {} lines ─", content.line_count())).right_aligned())
            .border_style(Style::default().fg(theme.border));
        let inner = block.inner(area);

        let text = content.to_text();
        self.state.detail_viewport_height = inner.height;
        self.state.detail_scroll = self.state.detail_scroll.min(self.max_detail_scroll());

        let paragraph = Paragraph::new(text).block(block).scroll((self.state.detail_scroll, 0));
        frame.render_widget(paragraph, area);
    }
}

fn list_block() -> Block<'static> {
    Block::default().borders(Borders::ALL)
}
