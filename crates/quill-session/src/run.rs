//! Per-run kernel lifecycle and the ordered output-cell buffer.
//!
//! A run models one kernel session. Its kernel state moves
//! `Init -> Running -> Crashed | Closed` and never back; a crashed or closed
//! run only goes away by being closed and replaced. Output cells form a
//! single-threaded execution queue: at most one cell is `Running` at a time,
//! and finishing one promotes the next pending cell.

use std::collections::HashSet;

use log::warn;
use quill_comm::ids::{OutputCellId, RunId};
use quill_comm::messages::{KernelState, OutputCell, OutputFlag, OutputValue, RunDesc};

use crate::workspace::Globals;

/// Which panel of a run the UI is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunViewMode {
    #[default]
    Outputs,
    Workspace,
}

/// One execution session against a kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub id: RunId,
    pub title: String,
    pub kernel_state: KernelState,
    pub output_cells: Vec<OutputCell>,
    pub view_mode: RunViewMode,
    pub globals: Globals,
    /// Slot paths of expanded entries in the workspace inspector.
    pub open_objects: HashSet<String>,
}

impl Run {
    /// A fresh, optimistic run: created locally the moment the user triggers
    /// execution, before the backend confirms the kernel exists.
    pub fn new(id: RunId, title: String) -> Self {
        Run {
            id,
            title,
            kernel_state: KernelState::Init,
            output_cells: Vec::new(),
            view_mode: RunViewMode::default(),
            globals: Globals::default(),
            open_objects: HashSet::new(),
        }
    }

    /// Rebuild a run from a wire descriptor (loaded notebooks carry their
    /// existing runs).
    pub fn from_desc(desc: RunDesc) -> Self {
        Run {
            id: desc.id,
            title: desc.title,
            kernel_state: desc.kernel_state,
            output_cells: desc.output_cells,
            view_mode: RunViewMode::default(),
            globals: Globals::from_dump(desc.globals),
            open_objects: HashSet::new(),
        }
    }

    /// Whether the run can still accept submissions.
    pub fn is_active(&self) -> bool {
        self.kernel_state.is_active()
    }

    /// Whether some cell is currently executing.
    pub fn has_running_cell(&self) -> bool {
        self.output_cells
            .iter()
            .any(|cell| cell.flag == OutputFlag::Running)
    }

    /// The backend confirmed the kernel is up. Cells queued before the
    /// confirmation can start: the head of the pending queue (and only it)
    /// is promoted.
    pub fn set_ready(&mut self) {
        self.kernel_state = KernelState::Running;
        self.promote_next_pending();
    }

    /// The backend reported a crash. Terminal: the queue is dead and further
    /// submissions are rejected locally.
    pub fn set_crashed(&mut self, message: String) {
        self.kernel_state = KernelState::Crashed { message };
    }

    pub fn add_output_cell(&mut self, cell: OutputCell) {
        self.output_cells.push(cell);
    }

    /// Apply one output event for `cell_id`: record the value, move the
    /// cell's flag, and advance the queue when the cell finished.
    ///
    /// Consecutive `Text` values are coalesced into one, so a streamed
    /// stdout stays a single logical block. Returns `false` when the cell
    /// is unknown (stale event for a closed run, or a server defect).
    pub fn add_output(&mut self, cell_id: OutputCellId, value: OutputValue, flag: OutputFlag) -> bool {
        let Some(cell) = self.output_cells.iter_mut().find(|c| c.id == cell_id) else {
            warn!("[run] Output for unknown cell {} in run {}", cell_id, self.id);
            return false;
        };

        match (&value, cell.values.last_mut()) {
            (OutputValue::Text { value: new_text }, Some(OutputValue::Text { value: last_text })) => {
                last_text.push_str(new_text);
            }
            _ => cell.values.push(value),
        }
        let was_final = cell.flag.is_final();
        cell.flag = flag;

        // Promote only on the transition into a final state, so a duplicate
        // final event cannot start a second cell.
        if flag.is_final() && !was_final {
            self.promote_next_pending();
        }
        true
    }

    /// Promote the first `Pending` cell (scan order) to `Running`. Only one
    /// cell runs at a time per kernel, so only one is ever promoted.
    fn promote_next_pending(&mut self) {
        if let Some(cell) = self
            .output_cells
            .iter_mut()
            .find(|c| c.flag == OutputFlag::Pending)
        {
            cell.flag = OutputFlag::Running;
        }
    }
}
