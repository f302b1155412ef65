use crate::model::{ActionEvent, ActionName, ActionView, ActivationOutcome, Notice, StatusLine};
use std::collections::VecDeque;

/// Grid width in controls.
pub const GRID_COLUMNS: usize = 2;
const MAX_RECENT: usize = 20;

pub struct UiState {
    pub tab: usize,
    pub actions: Vec<ActionView>,
    pub selected: usize,
    pub status: StatusLine,
    /// Modal on screen; others wait in `queued_notices`.
    pub notice: Option<Notice>,
    pub queued_notices: VecDeque<Notice>,
    /// Most recent first.
    pub recent: Vec<ActivationOutcome>,
    pub info: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            actions: Vec::new(),
            selected: 0,
            status: StatusLine::Ready,
            notice: None,
            queued_notices: VecDeque::new(),
            recent: Vec::new(),
            info: String::new(),
        }
    }
}

impl UiState {
    pub fn with_actions(actions: Vec<ActionView>) -> Self {
        Self {
            actions,
            ..Default::default()
        }
    }

    pub fn selected_action(&self) -> Option<&ActionView> {
        self.actions.get(self.selected)
    }

    /// Action to dispatch for the current selection; `None` if it is disabled.
    pub fn trigger_selected(&self) -> Option<ActionName> {
        self.selected_action()
            .filter(|v| v.eligible)
            .map(|v| v.name)
    }

    /// Move the cursor by whole cells; stays put at grid edges.
    pub fn move_selection(&mut self, d_row: isize, d_col: isize) {
        if self.actions.is_empty() {
            return;
        }
        let row = (self.selected / GRID_COLUMNS) as isize + d_row;
        let col = (self.selected % GRID_COLUMNS) as isize + d_col;
        if row < 0 || col < 0 || col >= GRID_COLUMNS as isize {
            return;
        }
        let idx = row as usize * GRID_COLUMNS + col as usize;
        if idx < self.actions.len() {
            self.selected = idx;
        }
    }

    /// Swap in a freshly validated view, keeping the cursor on the same action.
    pub fn replace_actions(&mut self, actions: Vec<ActionView>) {
        let current = self.selected_action().map(|v| v.name);
        self.actions = actions;
        self.selected = current
            .and_then(|name| self.actions.iter().position(|v| v.name == name))
            .unwrap_or(0);
        let disabled = self.actions.iter().filter(|v| !v.eligible).count();
        self.info = if disabled == 0 {
            "Scripts re-checked: all available".into()
        } else {
            format!("Scripts re-checked: {disabled} missing")
        };
    }

    /// Apply an orchestrator event. Returns true when the screen must be redrawn right away.
    pub fn apply_event(&mut self, ev: ActionEvent) -> bool {
        match ev {
            ActionEvent::Status(s) => self.status = s,
            ActionEvent::Notice(n) => {
                if self.notice.is_none() {
                    self.notice = Some(n);
                } else {
                    self.queued_notices.push_back(n);
                }
            }
            ActionEvent::Repaint => return true,
            ActionEvent::Completed(outcome) => {
                self.recent.insert(0, outcome);
                self.recent.truncate(MAX_RECENT);
            }
        }
        false
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = self.queued_notices.pop_front();
    }
}
