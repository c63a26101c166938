//! Typed identifiers for the session data model.
//!
//! Every id that crosses the wire gets its own newtype so that a run id can
//! never be passed where an editor node id is expected. `NotebookId` is a
//! small integer assigned by the server; everything else is a UUID minted by
//! whichever side creates the entity (runs and output cells are created
//! optimistically on the client).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-assigned identifier of an open notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotebookId(pub u32);

impl fmt::Display for NotebookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh random id.
            pub fn fresh() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of one execution session (a "run") against a kernel.
    RunId
);
uuid_id!(
    /// Identifier of an output cell within a run.
    OutputCellId
);
uuid_id!(
    /// Identifier of an editor node (group or cell) in the document tree.
    EditorId
);
uuid_id!(
    /// Identifier of a kernel-side variable scope.
    ScopeId
);
