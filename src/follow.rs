//! Follow/freeze state machine deciding when the visible list may move.

use crate::history::HistoryBuffer;
use crate::visible::VisibleList;

const LIST_TITLE: &str = "Events";
const FROZEN_SUFFIX: &str = " (frozen)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowMode {
    /// The visible list tracks the newest events.
    #[default]
    Following,
    /// The visible list is pinned for inspection.
    Frozen,
}

#[derive(Debug, Clone, Default)]
pub struct FollowController {
    mode: FollowMode,
}

impl FollowController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    pub fn is_following(&self) -> bool {
        self.mode == FollowMode::Following
    }

    /// Freezes as soon as the selection leaves the newest item. Returns `true` on transition.
    pub fn observe_selection(&mut self, index: usize) -> bool {
        if self.mode == FollowMode::Following && index > 0 {
            self.mode = FollowMode::Frozen;
            return true;
        }
        false
    }

    /// Called after `item` landed in `history`; resyncs `visible` only while following.
    pub fn on_push(&self, history: &HistoryBuffer, visible: &mut VisibleList) -> bool {
        if self.is_following() {
            visible.resync(history);
            return true;
        }
        false
    }

    /// Explicit return to live view: selection goes back to the top and the list is resynced
    /// immediately rather than waiting for the next event.
    pub fn enable_follow(&mut self, history: &HistoryBuffer, visible: &mut VisibleList) {
        self.mode = FollowMode::Following;
        visible.reset_selected();
        visible.resync(history);
    }

    pub fn title(&self) -> String {
        match self.mode {
            FollowMode::Following => LIST_TITLE.to_string(),
            FollowMode::Frozen => format!("{LIST_TITLE}{FROZEN_SUFFIX}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_item::DisplayItem;
    use std::sync::Arc;

    fn item(title: &str) -> Arc<DisplayItem> {
        Arc::new(DisplayItem {
            title: title.to_string(),
            description: "new".to_string(),
            module: String::new(),
            timestamp: "-".to_string(),
            sender: "master".to_string(),
            state: String::new(),
            json: "{}".to_string(),
            yaml: "{}".to_string(),
            failed: false,
        })
    }

    fn visible_titles(visible: &VisibleList) -> Vec<String> {
        visible.items().map(|item| item.title.clone()).collect()
    }

    #[test]
    fn starts_following() {
        let controller = FollowController::new();
        assert_eq!(controller.mode(), FollowMode::Following);
        assert_eq!(controller.title(), "Events");
    }

    #[test]
    fn selection_at_top_keeps_following() {
        let mut controller = FollowController::new();
        assert!(!controller.observe_selection(0));
        assert!(controller.is_following());
    }

    #[test]
    fn nonzero_selection_freezes() {
        let mut controller = FollowController::new();
        assert!(controller.observe_selection(3));
        assert_eq!(controller.mode(), FollowMode::Frozen);
        assert_eq!(controller.title(), "Events (frozen)");
        assert!(!controller.observe_selection(0), "only enable_follow unfreezes");
        assert_eq!(controller.mode(), FollowMode::Frozen);
    }

    #[test]
    fn pushes_resync_only_while_following() {
        let mut controller = FollowController::new();
        let mut history = HistoryBuffer::new(3);
        let mut visible = VisibleList::new();

        history.push(item("A"));
        assert!(controller.on_push(&history, &mut visible));
        assert_eq!(visible_titles(&visible), ["A"]);

        controller.observe_selection(1);
        history.push(item("B"));
        assert!(!controller.on_push(&history, &mut visible));
        assert_eq!(visible_titles(&visible), ["A"]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn enable_follow_resets_selection_and_resyncs() {
        let mut controller = FollowController::new();
        let mut history = HistoryBuffer::new(5);
        let mut visible = VisibleList::new();
        for title in ["A", "B", "C"] {
            history.push(item(title));
            controller.on_push(&history, &mut visible);
        }
        visible.select(2);
        controller.observe_selection(visible.index());
        history.push(item("D"));
        controller.on_push(&history, &mut visible);
        assert_eq!(visible_titles(&visible), ["C", "B", "A"]);

        controller.enable_follow(&history, &mut visible);
        assert!(controller.is_following());
        assert_eq!(visible.index(), 0);
        assert_eq!(visible_titles(&visible), ["D", "C", "B", "A"]);
    }
}
