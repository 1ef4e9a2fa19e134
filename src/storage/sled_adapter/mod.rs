// Submodule declaration
// -----------------------------------------------------------------------------
mod sled_collection;
mod sled_storage_engine;


// Re-export
// -----------------------------------------------------------------------------
pub use sled_collection::*;
pub use sled_storage_engine::*;
