//! Books REST service
//!
//! Modules plug into the kernel registry and are served by `bookstore-http`.

pub mod modules;

pub use modules::*;
