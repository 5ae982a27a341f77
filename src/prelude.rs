//! Traits which, typically, may be imported without concern:
//! `use argspec::prelude::*`.

// Needs to be imported in order to implement a custom `Collectable`.
pub use crate::bind::Collectable;

// Needs to be imported in order to implement a custom binding.
pub use crate::bind::Capturable;
