//! Utility modules

pub mod local_invoker;
pub mod memory_storage;
pub mod validation;

pub use local_invoker::*;
pub use memory_storage::*;
pub use validation::*;
