use crate::{LoadState, Threshold};

/// A lightweight, copyable snapshot of the controller state.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PagerSnapshot {
    /// `true` only while a load triggered by visibility is outstanding.
    pub is_fetching: bool,
    pub load_state: LoadState,
    pub threshold: Threshold,
    /// Whether a visibility watch is currently active on the sentinel.
    pub is_watching: bool,
}

impl PagerSnapshot {
    /// Whether a consumer should show trailing loading placeholders.
    pub fn shows_placeholders(&self) -> bool {
        self.is_fetching
    }
}
