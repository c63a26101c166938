//! The closed sets of client commands and server events.
//!
//! Both directions are JSON with an internal `type` tag. The transport below
//! this layer (socket framing, reconnection) is not our concern: messages
//! arrive and leave as text frames, and `parse_event` / `serialize_command`
//! are the only entry points.
//!
//! ## Globals patch convention
//!
//! After an execution the server re-sends the variable tree of the run's
//! scopes. Variables whose object graph did not change since the previous
//! snapshot are sent as `null` (the "unchanged" marker) and must be carried
//! over from the previous snapshot by the client; variables absent from the
//! patch no longer exist. `GlobalsDump` is the same shape without markers,
//! used for full snapshots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::editor::EditorNode;
use crate::ids::{EditorId, NotebookId, OutputCellId, RunId, ScopeId};

/// Kernel state of one run, as the client tracks it.
///
/// `Init` is the optimistic state between triggering execution and the
/// server's readiness confirmation. `Crashed` and `Closed` are terminal:
/// a run never leaves them, it can only be closed and replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KernelState {
    Init,
    Running,
    Crashed { message: String },
    Closed,
}

impl KernelState {
    /// Whether the run can still accept submissions.
    pub fn is_active(&self) -> bool {
        match self {
            KernelState::Init | KernelState::Running => true,
            KernelState::Crashed { .. } | KernelState::Closed => false,
        }
    }
}

/// Execution status of an output cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFlag {
    Pending,
    Running,
    Success,
    Fail,
}

impl OutputFlag {
    pub fn is_final(&self) -> bool {
        match self {
            OutputFlag::Pending | OutputFlag::Running => false,
            OutputFlag::Success | OutputFlag::Fail => true,
        }
    }
}

/// An exception reported by the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    pub message: String,
    pub traceback: String,
}

/// One value produced by an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputValue {
    Text { value: String },
    Html { value: String },
    Exception { value: Exception },
    None,
}

/// One output cell: the result record of a single submission.
///
/// `editor_node` is a pruned snapshot of the document subtree that was
/// actually submitted (see the session crate's `extract_subtree_for_run`);
/// it is frozen at submission time and independent of later edits.
/// `called_id` is the id of the node the user triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputCell {
    pub id: OutputCellId,
    pub values: Vec<OutputValue>,
    pub flag: OutputFlag,
    pub editor_node: EditorNode,
    pub called_id: EditorId,
}

/// Incremental update of a run's variable tree.
///
/// `None` payload means "unchanged since the previous snapshot"; a name
/// absent from `variables` means the variable no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalsPatch {
    pub name: String,
    pub variables: HashMap<String, Option<String>>,
    pub children: HashMap<ScopeId, GlobalsPatch>,
}

/// Full snapshot of a run's variable tree. Payloads are serialized object
/// graph dumps, parsed lazily by the workspace engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalsDump {
    pub name: String,
    pub variables: HashMap<String, String>,
    pub children: HashMap<ScopeId, GlobalsDump>,
}

/// Kind of a directory listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirEntryKind {
    Notebook,
    LoadedNotebook,
    Dir,
    File,
}

/// One entry of a server-side directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub path: String,
    pub kind: DirEntryKind,
}

/// Wire description of an existing run, sent inside `NewNotebook` when a
/// previously saved or already-open notebook is (re)loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDesc {
    pub id: RunId,
    pub title: String,
    pub output_cells: Vec<OutputCell>,
    pub kernel_state: KernelState,
    pub globals: GlobalsDump,
}

/// Wire description of a notebook, sent on `NewNotebook`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookDesc {
    pub id: NotebookId,
    pub path: String,
    pub editor_root: EditorNode,
    pub editor_open_nodes: Vec<EditorId>,
    pub runs: Vec<RunDesc>,
}

/// Commands the client sends to the server. This set is closed.
///
/// `Fork` is declared for protocol compatibility but has no client-side
/// transition yet; it is reserved until its semantics are settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FromClientMessage {
    /// Authentication handshake, sent once right after connecting.
    #[serde(rename = "login")]
    Login { token: String },
    CreateNewNotebook,
    CreateNewKernel {
        notebook_id: NotebookId,
        run_id: RunId,
        run_title: String,
    },
    RunCode {
        notebook_id: NotebookId,
        run_id: RunId,
        cell_id: OutputCellId,
        editor_node: EditorNode,
        called_id: EditorId,
    },
    CloseRun {
        notebook_id: NotebookId,
        run_id: RunId,
    },
    Fork {
        notebook_id: NotebookId,
        run_id: RunId,
        new_run_id: RunId,
        new_run_title: String,
    },
    LoadNotebook {
        path: String,
    },
    SaveNotebook {
        notebook_id: NotebookId,
        editor_root: EditorNode,
    },
    QueryDir,
}

/// Events the server sends to the client. This set is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToClientMessage {
    Error {
        message: String,
    },
    NewNotebook {
        notebook: NotebookDesc,
    },
    KernelReady {
        notebook_id: NotebookId,
        run_id: RunId,
    },
    KernelCrashed {
        notebook_id: NotebookId,
        run_id: RunId,
        message: String,
    },
    Output {
        notebook_id: NotebookId,
        run_id: RunId,
        cell_id: OutputCellId,
        flag: OutputFlag,
        value: OutputValue,
        update: Option<GlobalsPatch>,
        kernel_state: KernelState,
    },
    NewGlobals {
        notebook_id: NotebookId,
        run_id: RunId,
        globals: GlobalsDump,
    },
    SaveCompleted {
        notebook_id: NotebookId,
        error: Option<String>,
    },
    DirList {
        entries: Vec<DirEntry>,
    },
}

/// Error type for message decode/encode failures.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Failed to decode server event: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode client command: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decode one server event from a text frame.
pub fn parse_event(text: &str) -> Result<ToClientMessage, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

/// Encode one client command into a text frame.
pub fn serialize_command(message: &FromClientMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}
