mod registry;
mod sled_adapter;
mod storage_engine;


pub use registry::*;
#[doc(hidden)]
pub use sled_adapter::*;
pub use storage_engine::*;
