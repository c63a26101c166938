//! The session reducer: one total function folding user actions and server
//! events into the next session state plus a list of boundary effects.
//!
//! The engine never talks to a socket or a widget itself. `apply` consumes
//! the current state and an [`Action`], and returns the next state together
//! with [`Effect`]s for the host to execute: commands to send to the server
//! and notifications to show the user. Events from the transport become
//! actions through `Action::from(ToClientMessage)` and must be applied in
//! arrival order per notebook.

use std::collections::HashSet;

use log::warn;
use quill_comm::editor::EditorNode;
use quill_comm::ids::{EditorId, NotebookId, OutputCellId, RunId};
use quill_comm::messages::{
    DirEntry, FromClientMessage, GlobalsDump, GlobalsPatch, KernelState, NotebookDesc, OutputCell,
    OutputFlag, OutputValue, ToClientMessage,
};

use crate::editor::{self, EditorUpdate, InsertMode};
use crate::notebook::Notebook;
use crate::run::{Run, RunViewMode};
use crate::workspace::Globals;

// ── Notifications ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A transient, non-blocking message for the user. Failures never abort the
/// session; they all flow through here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn success(text: impl Into<String>) -> Self {
        Notification {
            text: text.into(),
            kind: NotificationKind::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notification {
            text: text.into(),
            kind: NotificationKind::Error,
        }
    }
}

/// Boundary effect requested by the reducer; the host executes these after
/// installing the new state.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(FromClientMessage),
    Notify(Notification),
}

// ── Actions ────────────────────────────────────────────────────────────────

/// Everything that can change the session: user intents and decoded server
/// events, in one closed set.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // User intents.
    SelectNotebook {
        notebook_id: NotebookId,
    },
    NewNotebook,
    LoadNotebook {
        path: String,
    },
    SaveNotebook {
        notebook_id: NotebookId,
    },
    QueryDir,
    InsertNode {
        notebook_id: NotebookId,
        anchor_path: Vec<EditorId>,
        node: EditorNode,
        mode: InsertMode,
    },
    RemoveNode {
        notebook_id: NotebookId,
        path: Vec<EditorId>,
    },
    UpdateNode {
        notebook_id: NotebookId,
        path: Vec<EditorId>,
        update: EditorUpdate,
    },
    ToggleOpenNode {
        notebook_id: NotebookId,
        node_id: EditorId,
    },
    SelectEditorNode {
        notebook_id: NotebookId,
        node_id: Option<EditorId>,
    },
    RunCode {
        notebook_id: NotebookId,
        path: Vec<EditorId>,
    },
    CloseRun {
        notebook_id: NotebookId,
        run_id: RunId,
    },
    SetCurrentRun {
        notebook_id: NotebookId,
        run_id: RunId,
    },
    SetRunViewMode {
        notebook_id: NotebookId,
        run_id: RunId,
        view_mode: RunViewMode,
    },
    ToggleOpenObject {
        notebook_id: NotebookId,
        run_id: RunId,
        object_path: String,
    },

    // Server events.
    NotebookAdded {
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
    OutputArrived {
        notebook_id: NotebookId,
        run_id: RunId,
        cell_id: OutputCellId,
        flag: OutputFlag,
        value: OutputValue,
        update: Option<GlobalsPatch>,
        kernel_state: KernelState,
    },
    GlobalsReplaced {
        notebook_id: NotebookId,
        run_id: RunId,
        globals: GlobalsDump,
    },
    SaveCompleted {
        notebook_id: NotebookId,
        error: Option<String>,
    },
    DirListed {
        entries: Vec<DirEntry>,
    },
    ServerError {
        message: String,
    },
}

impl From<ToClientMessage> for Action {
    fn from(event: ToClientMessage) -> Self {
        match event {
            ToClientMessage::Error { message } => Action::ServerError { message },
            ToClientMessage::NewNotebook { notebook } => Action::NotebookAdded { notebook },
            ToClientMessage::KernelReady {
                notebook_id,
                run_id,
            } => Action::KernelReady {
                notebook_id,
                run_id,
            },
            ToClientMessage::KernelCrashed {
                notebook_id,
                run_id,
                message,
            } => Action::KernelCrashed {
                notebook_id,
                run_id,
                message,
            },
            ToClientMessage::Output {
                notebook_id,
                run_id,
                cell_id,
                flag,
                value,
                update,
                kernel_state,
            } => Action::OutputArrived {
                notebook_id,
                run_id,
                cell_id,
                flag,
                value,
                update,
                kernel_state,
            },
            ToClientMessage::NewGlobals {
                notebook_id,
                run_id,
                globals,
            } => Action::GlobalsReplaced {
                notebook_id,
                run_id,
                globals,
            },
            ToClientMessage::SaveCompleted { notebook_id, error } => {
                Action::SaveCompleted { notebook_id, error }
            }
            ToClientMessage::DirList { entries } => Action::DirListed { entries },
        }
    }
}

// ── Session state ──────────────────────────────────────────────────────────

/// The whole client-side session: every open notebook plus cross-notebook
/// UI state. Readers must treat a returned state as immutable and re-read
/// through ids after every `apply`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub notebooks: Vec<Notebook>,
    pub selected_notebook_id: Option<NotebookId>,
    pub dir_entries: Vec<DirEntry>,
}

impl SessionState {
    pub fn find_notebook(&self, notebook_id: NotebookId) -> Option<&Notebook> {
        self.notebooks.iter().find(|n| n.id == notebook_id)
    }

    fn find_notebook_mut(&mut self, notebook_id: NotebookId) -> Option<&mut Notebook> {
        self.notebooks.iter_mut().find(|n| n.id == notebook_id)
    }

    pub fn selected_notebook(&self) -> Option<&Notebook> {
        self.selected_notebook_id.and_then(|id| self.find_notebook(id))
    }

    /// Apply one action, returning the next state and the effects the host
    /// must carry out. Total: unknown ids are logged and ignored, malformed
    /// edits are no-ops, and no action can fail the session.
    pub fn apply(mut self, action: Action) -> (Self, Vec<Effect>) {
        let mut effects = Vec::new();
        match action {
            Action::SelectNotebook { notebook_id } => {
                if self.find_notebook(notebook_id).is_some() {
                    self.selected_notebook_id = Some(notebook_id);
                } else {
                    warn!("[session] Selecting unknown notebook {notebook_id:?}");
                }
            }
            Action::NewNotebook => {
                effects.push(Effect::Send(FromClientMessage::CreateNewNotebook));
            }
            Action::LoadNotebook { path } => {
                // A notebook already open under this path is just selected;
                // the server keeps one live instance per path.
                match self.notebooks.iter().find(|n| n.path == path) {
                    Some(notebook) => self.selected_notebook_id = Some(notebook.id),
                    None => effects.push(Effect::Send(FromClientMessage::LoadNotebook { path })),
                }
            }
            Action::SaveNotebook { notebook_id } => {
                if let Some(notebook) = self.find_notebook_mut(notebook_id) {
                    notebook.save_in_progress = true;
                    effects.push(Effect::Send(FromClientMessage::SaveNotebook {
                        notebook_id,
                        editor_root: notebook.editor_root.clone(),
                    }));
                } else {
                    warn!("[session] Saving unknown notebook {notebook_id:?}");
                }
            }
            Action::QueryDir => {
                effects.push(Effect::Send(FromClientMessage::QueryDir));
            }
            Action::InsertNode {
                notebook_id,
                anchor_path,
                node,
                mode,
            } => {
                if let Some(notebook) = self.find_notebook_mut(notebook_id) {
                    editor::insert(
                        &mut notebook.editor_root,
                        &anchor_path,
                        node,
                        mode,
                        &mut notebook.editor_open_nodes,
                    );
                }
            }
            Action::RemoveNode { notebook_id, path } => {
                if let Some(notebook) = self.find_notebook_mut(notebook_id) {
                    if editor::remove(&mut notebook.editor_root, &path) {
                        // A removed node cannot stay selected.
                        if let (Some(selected), Some(removed_id)) =
                            (notebook.selected_editor_node_id, path.last())
                        {
                            if selected == *removed_id {
                                notebook.selected_editor_node_id = None;
                            }
                        }
                    }
                }
            }
            Action::UpdateNode {
                notebook_id,
                path,
                update,
            } => {
                if let Some(notebook) = self.find_notebook_mut(notebook_id) {
                    editor::update(&mut notebook.editor_root, &path, update);
                }
            }
            Action::ToggleOpenNode {
                notebook_id,
                node_id,
            } => {
                if let Some(notebook) = self.find_notebook_mut(notebook_id) {
                    editor::toggle_open(&mut notebook.editor_open_nodes, node_id);
                }
            }
            Action::SelectEditorNode {
                notebook_id,
                node_id,
            } => {
                if let Some(notebook) = self.find_notebook_mut(notebook_id) {
                    notebook.selected_editor_node_id = node_id;
                }
            }
            Action::RunCode { notebook_id, path } => {
                if let Some(notebook) = self.find_notebook_mut(notebook_id) {
                    run_code(notebook, &path, &mut effects);
                } else {
                    warn!("[session] RunCode for unknown notebook {notebook_id:?}");
                }
            }
            Action::CloseRun {
                notebook_id,
                run_id,
            } => {
                if let Some(notebook) = self.find_notebook_mut(notebook_id) {
                    if notebook.close_run(run_id) {
                        effects.push(Effect::Send(FromClientMessage::CloseRun {
                            notebook_id,
                            run_id,
                        }));
                    }
                }
            }
            Action::SetCurrentRun {
                notebook_id,
                run_id,
            } => {
                if let Some(notebook) = self.find_notebook_mut(notebook_id) {
                    if notebook.find_run(run_id).is_some() {
                        notebook.current_run_id = Some(run_id);
                    }
                }
            }
            Action::SetRunViewMode {
                notebook_id,
                run_id,
                view_mode,
            } => {
                if let Some(run) = self.find_run_mut(notebook_id, run_id) {
                    run.view_mode = view_mode;
                }
            }
            Action::ToggleOpenObject {
                notebook_id,
                run_id,
                object_path,
            } => {
                if let Some(run) = self.find_run_mut(notebook_id, run_id) {
                    if !run.open_objects.remove(&object_path) {
                        run.open_objects.insert(object_path);
                    }
                }
            }
            Action::NotebookAdded { notebook } => {
                let notebook_id = notebook.id;
                let mut notebook = Notebook::from_desc(notebook);
                // A brand-new notebook carries no expansion state; start
                // with every group open.
                if notebook.editor_open_nodes.is_empty() {
                    notebook.editor_open_nodes = initial_open_nodes(&notebook.editor_root);
                }
                match self.notebooks.iter().position(|n| n.id == notebook_id) {
                    Some(index) => self.notebooks[index] = notebook,
                    None => self.notebooks.push(notebook),
                }
                self.selected_notebook_id = Some(notebook_id);
            }
            Action::KernelReady {
                notebook_id,
                run_id,
            } => {
                if let Some(run) = self.find_run_mut(notebook_id, run_id) {
                    run.set_ready();
                }
            }
            Action::KernelCrashed {
                notebook_id,
                run_id,
                message,
            } => {
                if let Some(run) = self.find_run_mut(notebook_id, run_id) {
                    run.set_crashed(message);
                }
            }
            Action::OutputArrived {
                notebook_id,
                run_id,
                cell_id,
                flag,
                value,
                update,
                kernel_state,
            } => {
                if let Some(run) = self.find_run_mut(notebook_id, run_id) {
                    // Crashed/Closed are terminal; an output that raced with
                    // a crash notification must not resurrect the run.
                    if run.kernel_state.is_active() {
                        run.kernel_state = kernel_state;
                    }
                    run.add_output(cell_id, value, flag);
                    if let Some(patch) = update {
                        run.globals = Globals::apply_patch(patch, Some(&run.globals));
                    }
                }
            }
            Action::GlobalsReplaced {
                notebook_id,
                run_id,
                globals,
            } => {
                if let Some(run) = self.find_run_mut(notebook_id, run_id) {
                    run.globals = Globals::from_dump(globals);
                }
            }
            Action::SaveCompleted { notebook_id, error } => {
                if let Some(notebook) = self.find_notebook_mut(notebook_id) {
                    // Cleared on both outcomes so the UI never gets stuck.
                    notebook.save_in_progress = false;
                    match error {
                        Some(message) => {
                            effects.push(Effect::Notify(Notification::error(message)));
                        }
                        None => {
                            effects.push(Effect::Notify(Notification::success("Notebook saved")));
                        }
                    }
                } else {
                    warn!("[session] SaveCompleted for unknown notebook {notebook_id:?}");
                }
            }
            Action::DirListed { entries } => {
                self.dir_entries = entries;
            }
            Action::ServerError { message } => {
                effects.push(Effect::Notify(Notification::error(message)));
            }
        }
        (self, effects)
    }

    fn find_run_mut(&mut self, notebook_id: NotebookId, run_id: RunId) -> Option<&mut Run> {
        let Some(notebook) = self.find_notebook_mut(notebook_id) else {
            warn!("[session] Event for unknown notebook {notebook_id:?}");
            return None;
        };
        let run = notebook.find_run_mut(run_id);
        if run.is_none() {
            warn!("[session] Event for unknown run {run_id} in notebook {notebook_id:?}");
        }
        run
    }
}

/// Submit the node at `path` for execution on the notebook's current run,
/// creating an optimistic run (plus a kernel-creation command) if none
/// exists.
fn run_code(notebook: &mut Notebook, path: &[EditorId], effects: &mut Vec<Effect>) {
    let Some(snapshot) = editor::extract_subtree_for_run(&notebook.editor_root, path) else {
        warn!("[session] RunCode path does not resolve in notebook {:?}", notebook.id);
        return;
    };
    let Some(called) = editor::locate(&notebook.editor_root, path) else {
        return;
    };
    let called_id = called.id();

    if notebook.current_run().is_none() {
        let run_id = RunId::fresh();
        let title = notebook.next_run_title();
        notebook.add_run(Run::new(run_id, title.clone()));
        effects.push(Effect::Send(FromClientMessage::CreateNewKernel {
            notebook_id: notebook.id,
            run_id,
            run_title: title,
        }));
    }

    let notebook_id = notebook.id;
    // add_run above guarantees a current run exists past this point.
    let Some(run) = notebook.current_run_mut() else {
        return;
    };
    if !run.is_active() {
        effects.push(Effect::Notify(Notification::error(
            "Kernel for this run is inactive. Start a new one.",
        )));
        return;
    }

    let flag = if run.kernel_state == KernelState::Running && !run.has_running_cell() {
        OutputFlag::Running
    } else {
        OutputFlag::Pending
    };
    let cell_id = OutputCellId::fresh();
    run.add_output_cell(OutputCell {
        id: cell_id,
        values: Vec::new(),
        flag,
        editor_node: snapshot.clone(),
        called_id,
    });
    let run_id = run.id;
    effects.push(Effect::Send(FromClientMessage::RunCode {
        notebook_id,
        run_id,
        cell_id,
        editor_node: snapshot,
        called_id,
    }));
}

/// Open-node set a freshly created notebook starts with: every group
/// expanded.
pub fn initial_open_nodes(root: &EditorNode) -> HashSet<EditorId> {
    let mut ids = Vec::new();
    root.collect_group_ids(&mut ids);
    ids.into_iter().collect()
}
