use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::contracts::FieldWidget;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum WidgetError {
    #[error("widget cannot take focus")]
    NotFocusable,
    #[error("caret position {position} is past the end of a {len}-character value")]
    CaretOutOfRange { position: usize, len: usize },
}

/// Editing buffer with a caret and an optional selection, measured in characters.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    pub value: String,
    pub caret: usize,
    pub selection: Option<(usize, usize)>,
}

impl InputState {
    pub fn new(value: impl Into<String>, caret: usize) -> Self {
        let value = value.into();
        let caret = caret.min(value.chars().count());
        Self {
            value,
            caret,
            selection: None,
        }
    }

    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn select(&mut self, start: usize, end: usize) {
        let len = self.len();
        let (start, end) = (start.min(len), end.min(len));
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        self.selection = (start < end).then_some((start, end));
        self.caret = end;
    }

    pub fn insert_text(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let (start, end) = self.selection.unwrap_or((self.caret, self.caret));
        self.replace_char_range(start, end, text);
        true
    }

    pub fn delete_backward(&mut self) -> bool {
        if let Some((start, end)) = self.selection {
            self.replace_char_range(start, end, "");
            return true;
        }
        if self.caret == 0 {
            return false;
        }
        self.replace_char_range(self.caret - 1, self.caret, "");
        true
    }

    pub fn replace_char_range(&mut self, start: usize, end: usize, insert: &str) {
        let len = self.len();
        let start = start.min(len);
        let end = end.min(len).max(start);
        let byte_start = Self::byte_index_at_char(&self.value, start);
        let byte_end = Self::byte_index_at_char(&self.value, end);
        self.value.replace_range(byte_start..byte_end, insert);
        self.caret = (start + insert.chars().count()).min(self.len());
        self.selection = None;
    }

    /// Replaces the whole value, keeping the caret where it was when it still fits.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.caret = self.caret.min(self.len());
        self.selection = None;
    }

    pub fn byte_index_at_char(value: &str, char_index: usize) -> usize {
        value
            .char_indices()
            .nth(char_index)
            .map(|(index, _)| index)
            .unwrap_or(value.len())
    }
}

/// In-memory text input. Hosts without a native widget, and tests, drive fields through it.
#[derive(Debug)]
pub struct TextWidget {
    state: Mutex<InputState>,
    focusable: bool,
    focused: AtomicBool,
}

impl TextWidget {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let caret = value.chars().count();
        Self {
            state: Mutex::new(InputState::new(value, caret)),
            focusable: true,
            focused: AtomicBool::new(false),
        }
    }

    pub fn focusable(mut self, value: bool) -> Self {
        self.focusable = value;
        self
    }

    pub fn value(&self) -> String {
        self.lock().value.clone()
    }

    pub fn caret(&self) -> usize {
        self.lock().caret
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    pub fn move_caret(&self, position: usize) {
        let mut state = self.lock();
        state.caret = position.min(state.len());
        state.selection = None;
    }

    pub fn select(&self, start: usize, end: usize) {
        self.lock().select(start, end);
    }

    /// Types `text` at the caret (replacing any selection) and returns the edited value.
    pub fn type_text(&self, text: &str) -> String {
        let mut state = self.lock();
        state.insert_text(text);
        state.value.clone()
    }

    pub fn backspace(&self) -> String {
        let mut state = self.lock();
        state.delete_backward();
        state.value.clone()
    }

    /// Shows a value produced by the field controller.
    pub fn render(&self, value: &str) {
        self.lock().set_value(value);
    }

    fn lock(&self) -> MutexGuard<'_, InputState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for TextWidget {
    fn default() -> Self {
        Self::new("")
    }
}

impl FieldWidget for TextWidget {
    fn selection_start(&self) -> Option<usize> {
        let state = self.lock();
        Some(state.selection.map_or(state.caret, |(start, _)| start))
    }

    fn set_selection(&self, position: usize) -> Result<(), WidgetError> {
        let mut state = self.lock();
        let len = state.len();
        if position > len {
            return Err(WidgetError::CaretOutOfRange { position, len });
        }
        state.caret = position;
        state.selection = None;
        Ok(())
    }

    fn focus(&self) -> Result<(), WidgetError> {
        if !self.focusable {
            return Err(WidgetError::NotFocusable);
        }
        self.focused.store(true, Ordering::SeqCst);
        Ok(())
    }
}
