pub mod engine;
pub mod metrics;
pub mod models;
pub mod optimizer;


pub use engine::*;
pub use metrics::*;
pub use models::*;
pub use optimizer::*;
