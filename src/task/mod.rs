//! Task manager interface
//!
//! The dashboard only reads task state; these are the types it reads.

pub mod state;

pub use state::{ErrorData, TaskManager, TaskSnapshot, TaskState, TaskStateChange, TaskStates};
