//! One open notebook: the editable document tree plus its runs.

use std::collections::HashSet;

use quill_comm::editor::EditorNode;
use quill_comm::ids::{EditorId, NotebookId, RunId};
use quill_comm::messages::NotebookDesc;

use crate::run::Run;

#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
    pub id: NotebookId,
    pub path: String,
    pub editor_root: EditorNode,
    /// Expanded groups in the document tree view.
    pub editor_open_nodes: HashSet<EditorId>,
    pub runs: Vec<Run>,
    /// The run shown in the output panel; new submissions go here.
    pub current_run_id: Option<RunId>,
    pub selected_editor_node_id: Option<EditorId>,
    pub save_in_progress: bool,
}

impl Notebook {
    /// Build a notebook from its wire descriptor. The most recently created
    /// run (last in the descriptor) becomes current.
    pub fn from_desc(desc: NotebookDesc) -> Self {
        let runs: Vec<Run> = desc.runs.into_iter().map(Run::from_desc).collect();
        let current_run_id = runs.last().map(|run| run.id);
        Notebook {
            id: desc.id,
            path: desc.path,
            editor_root: desc.editor_root,
            editor_open_nodes: desc.editor_open_nodes.into_iter().collect(),
            runs,
            current_run_id,
            selected_editor_node_id: None,
            save_in_progress: false,
        }
    }

    pub fn find_run(&self, run_id: RunId) -> Option<&Run> {
        self.runs.iter().find(|run| run.id == run_id)
    }

    pub fn find_run_mut(&mut self, run_id: RunId) -> Option<&mut Run> {
        self.runs.iter_mut().find(|run| run.id == run_id)
    }

    pub fn current_run(&self) -> Option<&Run> {
        self.current_run_id.and_then(|id| self.find_run(id))
    }

    pub fn current_run_mut(&mut self) -> Option<&mut Run> {
        match self.current_run_id {
            Some(id) => self.find_run_mut(id),
            None => None,
        }
    }

    /// Append a run and make it current.
    pub fn add_run(&mut self, run: Run) {
        self.current_run_id = Some(run.id);
        self.runs.push(run);
    }

    /// Remove a run. If it was current, the run that took its index becomes
    /// current, falling back to the previous one, then to none.
    pub fn close_run(&mut self, run_id: RunId) -> bool {
        let Some(index) = self.runs.iter().position(|run| run.id == run_id) else {
            return false;
        };
        self.runs.remove(index);
        if self.current_run_id == Some(run_id) {
            self.current_run_id = self
                .runs
                .get(index)
                .or_else(|| index.checked_sub(1).and_then(|i| self.runs.get(i)))
                .map(|run| run.id);
        }
        true
    }

    /// Title for the next run, numbered from the count of live runs.
    pub fn next_run_title(&self) -> String {
        format!("Run {}", self.runs.len() + 1)
    }
}
