//! Domain models for the pharmacy inventory engine.

mod batch;
mod medication;
mod snapshot;
mod summary;
mod transaction;

pub use batch::*;
pub use medication::*;
pub use snapshot::*;
pub use summary::*;
pub use transaction::*;
