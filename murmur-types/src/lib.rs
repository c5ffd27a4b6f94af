#![doc = include_str!("../README.md")]

pub mod error;
pub mod session;
pub mod stream;
pub mod traits;
pub mod types;

pub use error::*;
pub use session::*;
pub use stream::*;
pub use traits::*;
pub use types::*;
