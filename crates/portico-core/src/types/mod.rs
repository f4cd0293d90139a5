//! Core types for Portico

mod directory;
mod endpoint;
mod health;
mod lookup;

pub use directory::*;
pub use endpoint::*;
pub use health::*;
pub use lookup::*;
