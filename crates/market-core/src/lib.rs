pub mod error;
pub mod symbols;
pub mod traits;
pub mod types;

pub use error::*;
pub use symbols::*;
pub use traits::*;
pub use types::*;
