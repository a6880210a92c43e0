//! salt-live: real-time terminal view of a Salt master event stream.

mod cli;
pub mod detail;
pub mod display_item;
pub mod event;
pub mod follow;
pub mod highlight;
pub mod history;
pub mod layout;
pub mod source;
pub mod theme;
pub mod tui;
pub mod visible;

pub use cli::{run, DynError};
