mod storage;
mod strategy;
mod validation;

pub use storage::*;
pub use strategy::*;
pub use validation::*;
