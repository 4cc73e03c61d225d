//! An infinitely scrolling user directory built on `scroll-pager`.
//!
//! The pieces, from the outside in:
//! - [`api`]: the paginated [`UserSource`] and its HTTP implementation for randomuser.me
//! - [`list`]: [`UserList`], which owns the loaded users and the paging flags
//! - [`view`]: pure text rendering of a list frame, including the row layout of every card
//! - [`app`]: [`Directory`], which wires the list to a [`scroll_pager::PaginationController`]
//!   over a terminal [`scroll_pager::ViewportWatch`]
//! - [`config`]: [`Settings`] from defaults, a TOML file, and `DIRECTORY__*` variables
#![forbid(unsafe_code)]

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod list;
pub mod user;
pub mod view;

pub use api::{RandomUserClient, UserSource};
pub use app::Directory;
pub use config::Settings;
pub use error::{DirectoryError, Result};
pub use list::{ListView, UserList};
pub use user::User;
pub use view::{Frame, RenderOptions};
