//! RPC surface: argument validation, handlers and the HTTP transport.
mod args;
mod http;
pub mod reply;
mod service;

#[cfg(test)]
mod args_test;

pub use args::*;
pub use http::*;
pub use service::*;
