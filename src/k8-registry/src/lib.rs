//!
//! # Generic registry
//!
//! Store configured per resource type which maps REST verbs onto backing storage.
//!
mod error;
mod predicate;
mod runtime;
mod server;
mod store;
mod table_convertor;
pub mod rest;
pub mod strategy;
#[cfg(test)]
mod test_spec;

pub use error::*;
pub use predicate::*;
pub use runtime::*;
pub use server::*;
pub use store::*;
pub use table_convertor::*;
