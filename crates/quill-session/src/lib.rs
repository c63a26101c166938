//! Client-side session engine for Quill notebooks.
//!
//! Everything here is a pure, synchronous reduction over session state.
//! The host owns the transport and the UI; it feeds decoded server events
//! and user intents into [`session::SessionState::apply`] and executes the
//! returned effects. Wire types live in the `quill-comm` crate.
//!
//! Module map:
//! - [`editor`]: path-addressed edits over the document tree.
//! - [`object_graph`]: parsed object dumps for the workspace inspector.
//! - [`workspace`]: the globals tree and its incremental patch engine.
//! - [`run`]: per-run kernel lifecycle and output queue.
//! - [`notebook`]: one open notebook (document plus runs).
//! - [`session`]: the reducer tying it all together.

pub mod editor;
pub mod notebook;
pub mod object_graph;
pub mod run;
pub mod session;
pub mod workspace;

pub use session::{Action, Effect, Notification, NotificationKind, SessionState};
