//! The list of events actually shown, with selection and text filtering.
//!
//! Kept apart from [`HistoryBuffer`]: the history always holds the newest events, while
//! the visible list only changes on [`VisibleList::resync`].

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::display_item::DisplayItem;
use crate::history::HistoryBuffer;

/// Each list entry occupies a title row and a summary row.
pub const ROWS_PER_ITEM: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Unfiltered,
    /// The operator is typing a filter; plain characters belong to the filter input.
    Filtering,
    FilterApplied,
}

/// Input buffer with a cursor.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub buffer: String,
    pub cursor: usize,
}

impl InputState {
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    pub fn insert_char(&mut self, ch: char) {
        if self.cursor >= self.buffer.len() {
            self.buffer.push(ch);
            self.cursor = self.buffer.len();
            return;
        }
        self.buffer.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 || self.buffer.is_empty() {
            return;
        }
        let prev = self.buffer[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        self.buffer.replace_range(prev..self.cursor, "");
        self.cursor = prev;
    }
}

#[derive(Debug, Clone)]
pub struct VisibleList {
    items: Vec<Arc<DisplayItem>>,
    filtered: Vec<usize>,
    selected: usize,
    offset: usize,
    filter: InputState,
    filter_state: FilterState,
    width: u16,
    height: u16,
}

impl Default for VisibleList {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibleList {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            filtered: Vec::new(),
            selected: 0,
            offset: 0,
            filter: InputState::default(),
            filter_state: FilterState::Unfiltered,
            width: 0,
            height: 0,
        }
    }

    /// Replaces the visible collection with the current history contents.
    pub fn resync(&mut self, history: &HistoryBuffer) {
        self.items = history.snapshot();
        self.recompute_filter();
    }

    /// Number of items currently visible (after filtering).
    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    /// Number of items held, ignoring the filter.
    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> impl Iterator<Item = &Arc<DisplayItem>> {
        self.filtered.iter().filter_map(|idx| self.items.get(*idx))
    }

    pub fn index(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&Arc<DisplayItem>> {
        let idx = *self.filtered.get(self.selected)?;
        self.items.get(idx)
    }

    pub fn reset_selected(&mut self) {
        self.selected = 0;
        self.offset = 0;
    }

    pub fn select(&mut self, index: usize) {
        self.selected = index.min(self.filtered.len().saturating_sub(1));
    }

    pub fn filter_state(&self) -> FilterState {
        self.filter_state
    }

    pub fn filter_query(&self) -> &str {
        &self.filter.buffer
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Items per page, at least one.
    pub fn page_size(&self) -> usize {
        usize::from((self.height / ROWS_PER_ITEM).max(1))
    }

    /// First visible item for a viewport of `capacity` items, keeping the selection in view.
    pub fn scroll_offset(&mut self, capacity: usize) -> usize {
        let capacity = capacity.max(1);
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + capacity {
            self.offset = self.selected + 1 - capacity;
        }
        let max_offset = self.filtered.len().saturating_sub(capacity);
        self.offset = self.offset.min(max_offset);
        self.offset
    }

    /// Applies a navigation or filter key. Returns `false` when the key is not a list key.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.filter_state == FilterState::Filtering {
            return self.handle_filter_key(key);
        }

        match key {
            KeyEvent { code: KeyCode::Char('j') | KeyCode::Down, modifiers: KeyModifiers::NONE, .. } => {
                self.move_selection(1);
            }
            KeyEvent { code: KeyCode::Char('k') | KeyCode::Up, modifiers: KeyModifiers::NONE, .. } => {
                self.move_selection(-1);
            }
            KeyEvent { code: KeyCode::Char('g') | KeyCode::Home, modifiers: KeyModifiers::NONE, .. } => {
                self.selected = 0;
            }
            KeyEvent { code: KeyCode::Char('G'), .. }
            | KeyEvent { code: KeyCode::End, modifiers: KeyModifiers::NONE, .. } => {
                self.selected = self.filtered.len().saturating_sub(1);
            }
            KeyEvent { code: KeyCode::PageDown, modifiers: KeyModifiers::NONE, .. } => {
                self.move_selection(self.page_size() as i64);
            }
            KeyEvent { code: KeyCode::PageUp, modifiers: KeyModifiers::NONE, .. } => {
                self.move_selection(-(self.page_size() as i64));
            }
            KeyEvent { code: KeyCode::Char('/'), modifiers: KeyModifiers::NONE, .. } => {
                self.filter.clear();
                self.filter_state = FilterState::Filtering;
                self.recompute_filter();
            }
            KeyEvent { code: KeyCode::Esc, .. } if self.filter_state == FilterState::FilterApplied => {
                self.clear_filter();
            }
            _ => return false,
        }
        true
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> bool {
        match key {
            KeyEvent { code: KeyCode::Esc, .. } => self.clear_filter(),
            KeyEvent { code: KeyCode::Enter, .. } => {
                self.filter_state = if self.filter.buffer.trim().is_empty() {
                    FilterState::Unfiltered
                } else {
                    FilterState::FilterApplied
                };
            }
            KeyEvent { code: KeyCode::Backspace, .. } => {
                self.filter.backspace();
                self.on_filter_edited();
            }
            KeyEvent { code: KeyCode::Down, .. } => self.move_selection(1),
            KeyEvent { code: KeyCode::Up, .. } => self.move_selection(-1),
            KeyEvent { code: KeyCode::Char(ch), modifiers, .. }
                if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.filter.insert_char(ch);
                self.on_filter_edited();
            }
            _ => return false,
        }
        true
    }

    fn clear_filter(&mut self) {
        self.filter.clear();
        self.filter_state = FilterState::Unfiltered;
        self.recompute_filter();
    }

    fn on_filter_edited(&mut self) {
        self.recompute_filter();
        self.reset_selected();
    }

    fn move_selection(&mut self, delta: i64) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let next = (self.selected as i64 + delta).clamp(0, len as i64 - 1);
        self.selected = next as usize;
    }

    fn recompute_filter(&mut self) {
        let words: Vec<String> =
            self.filter.buffer.split_whitespace().map(str::to_lowercase).collect();
        self.filtered = if words.is_empty() {
            (0..self.items.len()).collect()
        } else {
            self.items
                .iter()
                .enumerate()
                .filter(|(_, item)| matches_words(item, &words))
                .map(|(idx, _)| idx)
                .collect()
        };
        if self.filtered.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len() - 1;
        }
    }
}

/// Every word must occur in the item's filter value, ignoring case.
fn matches_words(item: &DisplayItem, words: &[String]) -> bool {
    let haystack = item.filter_value().to_lowercase();
    words.iter().all(|word| haystack.contains(word.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent { code, modifiers, kind: KeyEventKind::Press, state: KeyEventState::empty() }
    }

    fn item(title: &str, sender: &str) -> Arc<DisplayItem> {
        Arc::new(DisplayItem {
            title: title.to_string(),
            description: "ret".to_string(),
            module: String::new(),
            timestamp: "-".to_string(),
            sender: sender.to_string(),
            state: String::new(),
            json: "{}".to_string(),
            yaml: "{}".to_string(),
            failed: false,
        })
    }

    fn seeded() -> VisibleList {
        let mut history = HistoryBuffer::new(10);
        history.push(item("salt/job/1/ret/web01", "web01"));
        history.push(item("salt/job/1/ret/db01", "db01"));
        history.push(item("salt/job/2/ret/web02", "web02"));
        let mut list = VisibleList::new();
        list.resync(&history);
        list
    }

    fn type_str(list: &mut VisibleList, text: &str) {
        for ch in text.chars() {
            list.handle_key(key(KeyCode::Char(ch), KeyModifiers::NONE));
        }
    }

    #[test]
    fn navigation_clamps_to_bounds() {
        let mut list = seeded();
        list.handle_key(key(KeyCode::Char('k'), KeyModifiers::NONE));
        assert_eq!(list.index(), 0);
        list.handle_key(key(KeyCode::Char('j'), KeyModifiers::NONE));
        list.handle_key(key(KeyCode::Down, KeyModifiers::NONE));
        list.handle_key(key(KeyCode::Down, KeyModifiers::NONE));
        assert_eq!(list.index(), 2);
        list.handle_key(key(KeyCode::Home, KeyModifiers::NONE));
        assert_eq!(list.index(), 0);
        list.handle_key(key(KeyCode::Char('G'), KeyModifiers::SHIFT));
        assert_eq!(list.index(), 2);
    }

    #[test]
    fn unknown_keys_are_not_consumed() {
        let mut list = seeded();
        assert!(!list.handle_key(key(KeyCode::Char('f'), KeyModifiers::NONE)));
        assert!(!list.handle_key(key(KeyCode::Char('m'), KeyModifiers::NONE)));
    }

    #[test]
    fn words_filter_requires_every_word() {
        let mut list = seeded();
        list.handle_key(key(KeyCode::Char('/'), KeyModifiers::NONE));
        assert_eq!(list.filter_state(), FilterState::Filtering);
        type_str(&mut list, "WEB job/2");
        assert_eq!(list.len(), 1);
        assert_eq!(list.selected_item().map(|item| item.sender.as_str()), Some("web02"));
        assert_eq!(list.total(), 3);
    }

    #[test]
    fn filtering_consumes_plain_characters() {
        let mut list = seeded();
        list.handle_key(key(KeyCode::Char('/'), KeyModifiers::NONE));
        assert!(list.handle_key(key(KeyCode::Char('f'), KeyModifiers::NONE)));
        assert_eq!(list.filter_query(), "f");
    }

    #[test]
    fn enter_applies_and_esc_clears_filter() {
        let mut list = seeded();
        list.handle_key(key(KeyCode::Char('/'), KeyModifiers::NONE));
        type_str(&mut list, "db");
        list.handle_key(key(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(list.filter_state(), FilterState::FilterApplied);
        assert_eq!(list.len(), 1);

        list.handle_key(key(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(list.filter_state(), FilterState::Unfiltered);
        assert_eq!(list.len(), 3);
        assert!(list.filter_query().is_empty());
    }

    #[test]
    fn backspace_edits_filter() {
        let mut list = seeded();
        list.handle_key(key(KeyCode::Char('/'), KeyModifiers::NONE));
        type_str(&mut list, "dbx");
        assert_eq!(list.len(), 0);
        assert!(list.selected_item().is_none());
        list.handle_key(key(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(list.filter_query(), "db");
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn input_state_backspace_handles_multibyte() {
        let mut input = InputState::default();
        input.insert_char('é');
        input.insert_char('x');
        input.backspace();
        input.backspace();
        assert!(input.buffer.is_empty());
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn resync_keeps_filter_applied() {
        let mut list = seeded();
        list.handle_key(key(KeyCode::Char('/'), KeyModifiers::NONE));
        type_str(&mut list, "web");
        list.handle_key(key(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(list.len(), 2);

        let mut history = HistoryBuffer::new(10);
        history.push(item("salt/job/3/ret/web03", "web03"));
        history.push(item("salt/job/3/ret/db03", "db03"));
        list.resync(&history);
        assert_eq!(list.len(), 1);
        assert_eq!(list.total(), 2);
    }

    #[test]
    fn page_keys_move_by_page_size() {
        let mut history = HistoryBuffer::new(100);
        for idx in 0..20 {
            history.push(item(&format!("salt/job/{idx}/new"), "master"));
        }
        let mut list = VisibleList::new();
        list.resync(&history);
        list.set_size(40, 10);
        assert_eq!(list.page_size(), 5);
        list.handle_key(key(KeyCode::PageDown, KeyModifiers::NONE));
        assert_eq!(list.index(), 5);
        list.handle_key(key(KeyCode::PageUp, KeyModifiers::NONE));
        assert_eq!(list.index(), 0);
    }

    #[test]
    fn scroll_offset_follows_selection() {
        let mut history = HistoryBuffer::new(100);
        for idx in 0..10 {
            history.push(item(&format!("salt/job/{idx}/new"), "master"));
        }
        let mut list = VisibleList::new();
        list.resync(&history);
        list.select(7);
        assert_eq!(list.scroll_offset(3), 5);
        list.select(6);
        assert_eq!(list.scroll_offset(3), 5);
        list.select(1);
        assert_eq!(list.scroll_offset(3), 1);
    }
}
