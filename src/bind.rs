//! The binding layer: typed targets that converted values are written into.

mod capture;
mod field;

pub use capture::{BindKind, Capturable, CaptureContext};
pub(crate) use capture::{AnyCapturable, ErasedCapture};
pub use field::{Collectable, Collection, Optional, Pairs, Scalar, Switch, Toggle};
