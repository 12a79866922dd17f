// created = "2026-10-16"
// modified = "2026-10-16"

//! Operational transformation over keyed, positional edits.

pub mod engine;
pub mod history;
pub mod op;
pub mod primitives;
pub mod state;

pub use engine::OperationEngine;
pub use engine::Origin;
pub use history::HistoryBuffer;
pub use op::Edit;
pub use op::OpKind;
pub use op::Operation;
pub use state::EngineState;
pub use state::OpState;
