//! Shared state that many actors mutate concurrently, and the primitive
//! used to join them.
//!
//! Every type here is constructed explicitly and handed to actors by clone
//! (each clone points at the same state), so tests can build isolated
//! instances instead of sharing process-wide globals.

mod barrier;
mod counter;
mod dataset;
mod drops;
mod ledger;

pub use barrier::*;
pub use counter::*;
pub use dataset::*;
pub use drops::*;
pub use ledger::*;
