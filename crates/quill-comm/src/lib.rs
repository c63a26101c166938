//! quill-comm - shared data model and message protocol for Quill notebooks.
//!
//! This crate defines the shapes that cross the client/server boundary:
//! typed ids, the editor document tree, output values, the globals patch
//! convention, and the closed sets of client commands and server events.
//! It contains no behavior beyond (de)serialization; the session engine in
//! `quill-session` owns all state transitions.

pub mod editor;
pub mod ids;
pub mod messages;

pub use editor::{EditorCell, EditorGroup, EditorNode, ScopeKind};
pub use ids::{EditorId, NotebookId, OutputCellId, RunId, ScopeId};
pub use messages::{
    parse_event, serialize_command, DirEntry, DirEntryKind, Exception, FromClientMessage,
    GlobalsDump, GlobalsPatch, KernelState, NotebookDesc, OutputCell, OutputFlag, OutputValue,
    ProtocolError, RunDesc, ToClientMessage,
};
