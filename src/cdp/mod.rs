//! Minimal Chrome DevTools Protocol client
//!
//! Hand-written transport, connection and command types - just enough to
//! navigate, evaluate scripts, dispatch input and take screenshots.

pub mod connection;
pub mod transport;
pub mod types;

pub use connection::{Connection, Session};
pub use transport::Transport;
pub use types::{KeyEventType, MouseButton, MouseEventType};
