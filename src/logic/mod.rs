pub mod breaker_graph;
pub mod cable;
pub mod operations;
pub mod panel_tree;
pub mod queries;
pub mod sync;

pub use breaker_graph::*;
pub use cable::{CableCalculator, CableReport, UnknownCrossSectionPolicy};
pub use operations::*;
pub use panel_tree::*;
pub use queries::*;
pub use sync::*;
