pub mod fields;
pub mod types;

pub use types::*;
