pub mod coord;
pub mod error;
pub mod number;
pub mod value;

pub use coord::*;
pub use error::*;
pub use number::*;
pub use value::*;
