//! A headless infinite-scroll pagination controller.
//!
//! This crate decouples "an element became visible" from "fetch more data". It enforces at most
//! one visibility-triggered load in flight, respects exhaustion (`has_more == false`), and
//! suspends observation entirely while a load is outstanding.
//!
//! It is UI-agnostic and runtime-agnostic. An adapter is expected to provide:
//! - a [`VisibilityWatch`] backend (a browser intersection observer binding, a terminal
//!   viewport, or the bundled [`ViewportWatch`])
//! - a spawner that runs load futures on its executor
//! - the load flags it owns (`has_more`, `is_loading`) and the current sentinel element
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod controller;
mod options;
mod state;
mod types;
mod viewport;
mod watch;


pub use controller::{PagerHandle, PaginationController};
pub use options::{LoadMore, OnChangeCallback, PagerOptions, Spawner};
pub use state::PagerSnapshot;
pub use types::{IntersectionEntry, LoadOutcome, LoadState, Threshold, WatchOptions};
pub use viewport::{ItemExtent, ViewportWatch};
pub use watch::{VisibilityCallback, VisibilityWatch, WatchSubscription};
