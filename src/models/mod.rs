pub mod batch;
pub mod generation;
pub mod illustration;

pub use batch::*;
pub use generation::*;
pub use illustration::*;
