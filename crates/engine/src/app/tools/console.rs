use std::collections::VecDeque;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

pub(crate) const MAX_HISTORY_LINES: usize = 64;
pub(crate) const MAX_CURRENT_LINE_CHARS: usize = 256;

/// Line-input state for the debug console overlay. While the console is open
/// the frame loop routes key-down events here instead of to the application;
/// the application only consults `is_open` when deciding the mouse-capture
/// mode at session start.
#[derive(Debug, Default)]
pub struct ConsoleState {
    is_open: bool,
    current_line: String,
    history: VecDeque<String>,
}

impl ConsoleState {
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn toggle_open(&mut self) {
        self.is_open = !self.is_open;
        self.current_line.clear();
    }

    pub fn current_line(&self) -> &str {
        &self.current_line
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub fn handle_key_event(&mut self, key_event: &KeyEvent) {
        if !self.is_open || key_event.state != ElementState::Pressed {
            return;
        }

        if let PhysicalKey::Code(code) = key_event.physical_key {
            match code {
                KeyCode::Backspace => {
                    self.current_line.pop();
                    return;
                }
                KeyCode::Enter => {
                    self.submit_current_line();
                    return;
                }
                KeyCode::Escape => {
                    self.is_open = false;
                    self.current_line.clear();
                    return;
                }
                _ => {}
            }
        }

        if let Some(text) = key_event.text.as_ref() {
            self.append_printable_text(text);
        }
    }

    fn append_printable_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_control() {
                continue;
            }
            if self.current_line.chars().count() >= MAX_CURRENT_LINE_CHARS {
                break;
            }
            self.current_line.push(ch);
        }
    }

    fn submit_current_line(&mut self) {
        if self.history.len() == MAX_HISTORY_LINES {
            self.history.pop_front();
        }
        self.history.push_back(std::mem::take(&mut self.current_line));
    }
}
