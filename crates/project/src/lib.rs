pub mod actions;
pub mod automation;
pub mod config;
pub mod error;
pub mod graph;
pub mod ids;
pub mod persistence;
pub mod plugin;
pub mod ports;
mod project;
pub mod region;
pub mod routing;
pub mod selections;
pub mod snapshot;
pub mod track;
pub mod transport;
pub mod undo;

pub use actions::{ActionKind, ActionVariant, EditRequest, Undoable};
pub use config::EditorConfig;
pub use error::{ConsistencyError, EditError, InstantiationError, PersistenceError, ValidationError};
pub use graph::ProjectGraph;
pub use ids::{ClipId, Id, NoteId, PluginId, RegionId, SlotAddress, SlotKind, TrackId};
pub use project::Project;
pub use snapshot::ProjectSnapshot;
pub use undo::{ActionHandle, UndoManager, UndoStack};
