//! Screen geometry: top bar, event list on the left, details on the right.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub const TOP_BAR_HEIGHT: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneLayout {
    pub top_bar: Rect,
    pub list: Rect,
    /// Absent until there is something to show.
    pub detail: Option<Rect>,
}

/// Splits `area` into panes. The list takes the left half, the detail pane the remainder.
pub fn compute(area: Rect, show_detail: bool) -> PaneLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(TOP_BAR_HEIGHT), Constraint::Min(0)])
        .split(area);
    let body = rows[1];

    let list_width = body.width / 2;
    let list = Rect { width: list_width, ..body };
    let detail = Rect {
        x: body.x.saturating_add(list_width),
        width: body.width - list_width,
        ..body
    };

    PaneLayout { top_bar: rows[0], list, detail: show_detail.then_some(detail) }
}
