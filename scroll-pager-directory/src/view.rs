//! Text rendering of the user directory page.
//!
//! Rendering is pure: a [`ListView`] goes in, a [`Frame`] with the drawn lines and the row extent
//! of every element comes out. The extents feed the viewport watch.
use scroll_pager::ItemExtent;

use crate::list::{ListView, card_key};
use crate::user::User;

pub const DEFAULT_ERROR_TEXT: &str = "An error occurred";
pub const PAGE_TITLE: &str = "User List";

const TITLE_KEY: &str = "#title";
const ERROR_KEY: &str = "#error";
const SPINNER_KEY: &str = "#spinner";
const SKELETON_KEY_PREFIX: &str = "#skeleton-";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: usize,
    pub skeleton_count: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 48,
            skeleton_count: 5,
        }
    }
}

/// Rendered lines plus the extent of each element, keyed by [`card_key`] (or `#`-prefixed
/// names for non-card elements).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub lines: Vec<String>,
    pub layout: Vec<(String, ItemExtent)>,
}

impl Frame {
    fn push_element(&mut self, key: impl Into<String>, lines: Vec<String>) {
        let start = self.lines.len() as u64;
        let size = lines.len() as u32;
        self.lines.extend(lines);
        self.layout.push((key.into(), ItemExtent::new(start, size)));
    }

    pub fn extent_of(&self, key: &str) -> Option<ItemExtent> {
        self.layout
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, extent)| *extent)
    }

    /// Lines inside `[offset, offset + rows)`.
    pub fn window(&self, offset: u64, rows: u32) -> &[String] {
        let start = (offset as usize).min(self.lines.len());
        let end = start.saturating_add(rows as usize).min(self.lines.len());
        &self.lines[start..end]
    }
}

pub fn render(view: &ListView, options: &RenderOptions) -> Frame {
    let width = options.width.max(16);
    let mut frame = Frame::default();

    frame.push_element(TITLE_KEY, vec![center(PAGE_TITLE, width), String::new()]);

    if let Some(message) = &view.error {
        frame.push_element(ERROR_KEY, error_text(message, width));
    }
    if view.show_spinner {
        frame.push_element(SPINNER_KEY, vec![center("( loading... )", width)]);
    }
    for (index, user) in view.users.iter().enumerate() {
        frame.push_element(card_key(index, user), user_card(user, width));
    }
    if view.show_skeletons {
        for i in 0..options.skeleton_count {
            frame.push_element(format!("{SKELETON_KEY_PREFIX}{i}"), skeleton_card(width));
        }
    }
    frame
}

pub fn user_card(user: &User, width: usize) -> Vec<String> {
    vec![
        border(width),
        boxed(&format!("[o] {}", user.display_name()), width),
        boxed(&format!("    {}", user.email), width),
        boxed(&format!("    {}", user.picture.thumbnail), width),
        border(width),
    ]
}

pub fn skeleton_card(width: usize) -> Vec<String> {
    let inner = width.saturating_sub(4);
    vec![
        border(width),
        boxed(&"░".repeat(inner * 3 / 4), width),
        boxed(&"░".repeat(inner / 2), width),
        boxed(&"░".repeat(inner / 4), width),
        border(width),
    ]
}

pub fn error_text(message: &str, width: usize) -> Vec<String> {
    let message = if message.trim().is_empty() {
        DEFAULT_ERROR_TEXT
    } else {
        message
    };
    vec![
        border(width),
        boxed(&format!("! {message}"), width),
        border(width),
    ]
}

fn border(width: usize) -> String {
    format!("+{}+", "-".repeat(width.saturating_sub(2)))
}

/// `| text |`, truncated or padded to exactly `width` characters.
fn boxed(text: &str, width: usize) -> String {
    let inner = width.saturating_sub(4);
    let clipped: String = text.chars().take(inner).collect();
    let pad = inner - clipped.chars().count();
    format!("| {clipped}{} |", " ".repeat(pad))
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }
    let left = (width - len) / 2;
    format!("{}{text}", " ".repeat(left))
}
