mod builder;
mod node;


pub use builder::*;
pub use node::*;
