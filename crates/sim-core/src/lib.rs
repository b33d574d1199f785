pub mod error;
pub mod math;
pub mod types;

pub use error::*;
pub use types::*;
