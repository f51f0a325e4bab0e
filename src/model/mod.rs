pub mod breaker;
pub mod cable;
pub mod common;
pub mod load;
pub mod panel;
pub mod source;
pub mod topology;

pub use breaker::*;
pub use cable::*;
pub use common::*;
pub use load::*;
pub use panel::*;
pub use source::*;
pub use topology::*;
