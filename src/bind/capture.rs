use std::any::{type_name, TypeId};
use std::str::FromStr;

use crate::convert::{ConvertError, ConvertFn, ConverterRegistry};

/// Parse-time context handed to captures: the converter registry plus the
/// separator used inside `key=value` pairs.
pub struct CaptureContext<'r> {
    pub(crate) registry: &'r ConverterRegistry,
    pub(crate) separator: String,
}

impl<'r> CaptureContext<'r> {
    /// Convert `raw` through the registry, falling back to `FromStr` on `T`.
    pub fn convert<T: FromStr + 'static>(&self, raw: &str) -> Result<T, ConvertError> {
        convert_value::<T>(self, &None, raw)
    }

    /// The separator between keys and values in `key=value` pairs.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    #[cfg(test)]
    pub(crate) fn test(registry: &'r ConverterRegistry) -> Self {
        Self {
            registry,
            separator: "=".to_string(),
        }
    }
}

/// How a binding consumes values; drives arity inference and repetition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    /// A boolean flag toggled by presence.
    Toggle,
    /// A fixed value assigned by presence.
    Switch,
    /// A single converted value.
    Scalar,
    /// An accumulating sequence of converted values.
    Collection,
    /// An accumulating sequence of converted `key=value` pairs.
    Map,
}

impl BindKind {
    /// Whether repetition overwrites rather than accumulates.
    pub(crate) fn is_single_valued(&self) -> bool {
        matches!(self, BindKind::Toggle | BindKind::Switch | BindKind::Scalar)
    }

    /// Whether captured operands are further divided by a split rule.
    pub(crate) fn is_multi_valued(&self) -> bool {
        matches!(self, BindKind::Collection | BindKind::Map)
    }
}

/// Behaviour to capture an explicit generic type `T` from an input `&str`.
///
/// This sits at the bottom of the command model object graph so the compiler
/// can maintain each binding's type.
pub trait Capturable<'a, T> {
    /// Declare that the parameter has been matched.
    fn matched(&mut self);

    /// Capture one raw value into this binding's target.
    fn capture(&mut self, ctx: &CaptureContext<'_>, raw: &str) -> Result<(), ConvertError>;

    /// How this binding consumes values.
    fn kind(&self) -> BindKind;

    /// The element type and its short display name.
    fn element(&self) -> (TypeId, &'static str);
}

// The type-erased face of Capturable, so specs of varying element types can
// live under one collection.
pub(crate) trait AnyCapturable {
    fn matched(&mut self);
    fn capture(&mut self, ctx: &CaptureContext<'_>, raw: &str) -> Result<(), ConvertError>;
    fn kind(&self) -> BindKind;
    fn element(&self) -> (TypeId, &'static str);
}

pub(crate) struct ErasedCapture<'a, T: 'a> {
    field: Box<dyn Capturable<'a, T> + 'a>,
}

impl<'a, T> ErasedCapture<'a, T> {
    pub(crate) fn bind(field: impl Capturable<'a, T> + 'a) -> Self {
        Self {
            field: Box::new(field),
        }
    }
}

impl<'a, T> AnyCapturable for ErasedCapture<'a, T> {
    fn matched(&mut self) {
        self.field.matched();
    }

    fn capture(&mut self, ctx: &CaptureContext<'_>, raw: &str) -> Result<(), ConvertError> {
        self.field.capture(ctx, raw)
    }

    fn kind(&self) -> BindKind {
        self.field.kind()
    }

    fn element(&self) -> (TypeId, &'static str) {
        self.field.element()
    }
}

/// Convert `raw` through the dispatch chain: explicit converter, registry
/// entry, `FromStr` on the element type.
pub(crate) fn convert_value<T: FromStr + 'static>(
    ctx: &CaptureContext<'_>,
    explicit: &Option<ConvertFn<T>>,
    raw: &str,
) -> Result<T, ConvertError> {
    if let Some(f) = explicit {
        return f(raw);
    }

    if let Some(f) = ctx.registry.lookup::<T>() {
        return f(raw);
    }

    T::from_str(raw).map_err(|_| ConvertError::new(raw, short_type_name::<T>()))
}

pub(crate) fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn short_names() {
        assert_eq!(short_type_name::<u32>(), "u32");
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<crate::convert::TimeOfDay>(), "TimeOfDay");
    }

    #[test]
    fn dispatch_explicit_first() {
        let registry = ConverterRegistry::defaults_excluding(&[]);
        let ctx = CaptureContext::test(&registry);
        let explicit: Option<ConvertFn<u32>> = Some(Rc::new(|_| Ok(42)));

        assert_eq!(convert_value::<u32>(&ctx, &explicit, "7").unwrap(), 42);
        assert_eq!(convert_value::<u32>(&ctx, &None, "7").unwrap(), 7);
    }

    #[test]
    fn dispatch_from_str_fallback() {
        #[derive(Debug, PartialEq)]
        enum Fruit {
            Apple,
            Pear,
        }

        impl std::str::FromStr for Fruit {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    "apple" => Ok(Fruit::Apple),
                    "pear" => Ok(Fruit::Pear),
                    _ => Err(format!("unknown: {value}")),
                }
            }
        }

        let registry = ConverterRegistry::empty();
        let ctx = CaptureContext::test(&registry);

        assert_eq!(convert_value::<Fruit>(&ctx, &None, "pear").unwrap(), Fruit::Pear);
        assert_eq!(
            convert_value::<Fruit>(&ctx, &None, "rock")
                .unwrap_err()
                .to_string(),
            "'rock' is not a Fruit"
        );
    }
}
