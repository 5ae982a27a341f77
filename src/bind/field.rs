use std::any::TypeId;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::marker::PhantomData;
use std::rc::Rc;
use std::str::FromStr;

use crate::bind::capture::{convert_value, short_type_name, BindKind, Capturable, CaptureContext};
use crate::convert::{ConvertError, ConvertFn};

/// Behaviour for multiple (0 to many) items `T` to be collected together.
pub trait Collectable<T> {
    /// Add a value to this `Collectable`.
    fn add(&mut self, item: T);
}

impl<T> Collectable<T> for Vec<T> {
    fn add(&mut self, item: T) {
        self.push(item);
    }
}

impl<T: Eq + std::hash::Hash> Collectable<T> for HashSet<T> {
    fn add(&mut self, item: T) {
        self.insert(item);
    }
}

impl<T: Ord> Collectable<T> for BTreeSet<T> {
    fn add(&mut self, item: T) {
        self.insert(item);
    }
}

impl<K: Eq + std::hash::Hash, V> Collectable<(K, V)> for HashMap<K, V> {
    fn add(&mut self, item: (K, V)) {
        self.insert(item.0, item.1);
    }
}

impl<K: Ord, V> Collectable<(K, V)> for BTreeMap<K, V> {
    fn add(&mut self, item: (K, V)) {
        self.insert(item.0, item.1);
    }
}

/// A binding that takes a single value; the last capture wins.
pub struct Scalar<'a, T> {
    variable: Rc<RefCell<&'a mut T>>,
    converter: Option<ConvertFn<T>>,
}

impl<'a, T> Scalar<'a, T> {
    /// Create a scalar binding.
    pub fn new(variable: &'a mut T) -> Self {
        Self {
            variable: Rc::new(RefCell::new(variable)),
            converter: None,
        }
    }

    /// Override the registry lookup with an explicit converter.
    pub fn with_converter(mut self, f: impl Fn(&str) -> Result<T, ConvertError> + 'static) -> Self {
        self.converter = Some(Rc::new(f));
        self
    }
}

impl<'a, T> Capturable<'a, T> for Scalar<'a, T>
where
    T: FromStr + 'static,
{
    fn matched(&mut self) {
        // Do nothing.
    }

    fn capture(&mut self, ctx: &CaptureContext<'_>, raw: &str) -> Result<(), ConvertError> {
        let value = convert_value(ctx, &self.converter, raw)?;
        **self.variable.borrow_mut() = value;
        Ok(())
    }

    fn kind(&self) -> BindKind {
        BindKind::Scalar
    }

    fn element(&self) -> (TypeId, &'static str) {
        (TypeId::of::<T>(), short_type_name::<T>())
    }
}

/// A boolean flag binding taking no values: each match negates the current
/// value, while an attached value (`--flag=false`) assigns it outright.
pub struct Toggle<'a> {
    variable: Rc<RefCell<&'a mut bool>>,
}

impl<'a> Toggle<'a> {
    /// Create a toggle binding.
    pub fn new(variable: &'a mut bool) -> Self {
        Self {
            variable: Rc::new(RefCell::new(variable)),
        }
    }
}

impl<'a> Capturable<'a, bool> for Toggle<'a> {
    fn matched(&mut self) {
        let mut variable = self.variable.borrow_mut();
        **variable = !**variable;
    }

    fn capture(&mut self, ctx: &CaptureContext<'_>, raw: &str) -> Result<(), ConvertError> {
        let value = convert_value::<bool>(ctx, &None, raw)?;
        **self.variable.borrow_mut() = value;
        Ok(())
    }

    fn kind(&self) -> BindKind {
        BindKind::Toggle
    }

    fn element(&self) -> (TypeId, &'static str) {
        (TypeId::of::<bool>(), "boolean")
    }
}

/// A binding that takes no values, assigning a fixed target value on match.
pub struct Switch<'a, T> {
    variable: Rc<RefCell<&'a mut T>>,
    target: Option<T>,
}

impl<'a, T> Switch<'a, T> {
    /// Create a switch binding; `target` is assigned when the parameter
    /// appears.
    pub fn new(variable: &'a mut T, target: T) -> Self {
        Self {
            variable: Rc::new(RefCell::new(variable)),
            target: Some(target),
        }
    }
}

impl<'a, T: 'static> Capturable<'a, T> for Switch<'a, T> {
    fn matched(&mut self) {
        if let Some(target) = self.target.take() {
            **self.variable.borrow_mut() = target;
        }
    }

    fn capture(&mut self, _ctx: &CaptureContext<'_>, _raw: &str) -> Result<(), ConvertError> {
        unreachable!("internal error - must not capture on a Switch");
    }

    fn kind(&self) -> BindKind {
        BindKind::Switch
    }

    fn element(&self) -> (TypeId, &'static str) {
        (TypeId::of::<T>(), short_type_name::<T>())
    }
}

/// A binding that maps down to [`Option`], taking a single value.
pub struct Optional<'a, T> {
    variable: Rc<RefCell<&'a mut Option<T>>>,
    converter: Option<ConvertFn<T>>,
}

impl<'a, T> Optional<'a, T> {
    /// Create an optional binding.
    pub fn new(variable: &'a mut Option<T>) -> Self {
        Self {
            variable: Rc::new(RefCell::new(variable)),
            converter: None,
        }
    }

    /// Override the registry lookup with an explicit converter.
    pub fn with_converter(mut self, f: impl Fn(&str) -> Result<T, ConvertError> + 'static) -> Self {
        self.converter = Some(Rc::new(f));
        self
    }
}

impl<'a, T> Capturable<'a, T> for Optional<'a, T>
where
    T: FromStr + 'static,
{
    fn matched(&mut self) {
        // Do nothing.
    }

    fn capture(&mut self, ctx: &CaptureContext<'_>, raw: &str) -> Result<(), ConvertError> {
        let value = convert_value(ctx, &self.converter, raw)?;
        self.variable.borrow_mut().replace(value);
        Ok(())
    }

    fn kind(&self) -> BindKind {
        BindKind::Scalar
    }

    fn element(&self) -> (TypeId, &'static str) {
        (TypeId::of::<T>(), short_type_name::<T>())
    }
}

/// A binding that accumulates values into any [`Collectable`], preserving
/// capture order. Pre-existing contents are reused, not replaced.
pub struct Collection<'a, C, T>
where
    C: 'a + Collectable<T>,
{
    variable: Rc<RefCell<&'a mut C>>,
    converter: Option<ConvertFn<T>>,
    _phantom: PhantomData<T>,
}

impl<'a, C, T> Collection<'a, C, T>
where
    C: 'a + Collectable<T>,
{
    /// Create a collection binding.
    pub fn new(variable: &'a mut C) -> Self {
        Self {
            variable: Rc::new(RefCell::new(variable)),
            converter: None,
            _phantom: PhantomData,
        }
    }

    /// Override the registry lookup with an explicit converter.
    pub fn with_converter(mut self, f: impl Fn(&str) -> Result<T, ConvertError> + 'static) -> Self {
        self.converter = Some(Rc::new(f));
        self
    }
}

impl<'a, C, T> Capturable<'a, T> for Collection<'a, C, T>
where
    T: FromStr + 'static,
    C: 'a + Collectable<T>,
{
    fn matched(&mut self) {
        // Do nothing.
    }

    fn capture(&mut self, ctx: &CaptureContext<'_>, raw: &str) -> Result<(), ConvertError> {
        let value = convert_value(ctx, &self.converter, raw)?;
        (**self.variable.borrow_mut()).add(value);
        Ok(())
    }

    fn kind(&self) -> BindKind {
        BindKind::Collection
    }

    fn element(&self) -> (TypeId, &'static str) {
        (TypeId::of::<T>(), short_type_name::<T>())
    }
}

/// A binding that accumulates `key=value` pairs into any
/// `Collectable<(K, V)>`; key and value convert independently.
///
/// `Vec<(K, V)>` keeps insertion order; `HashMap` and `BTreeMap` apply their
/// own ordering.
pub struct Pairs<'a, C, K, V>
where
    C: 'a + Collectable<(K, V)>,
{
    variable: Rc<RefCell<&'a mut C>>,
    key_converter: Option<ConvertFn<K>>,
    value_converter: Option<ConvertFn<V>>,
}

impl<'a, C, K, V> Pairs<'a, C, K, V>
where
    C: 'a + Collectable<(K, V)>,
{
    /// Create a pair binding.
    pub fn new(variable: &'a mut C) -> Self {
        Self {
            variable: Rc::new(RefCell::new(variable)),
            key_converter: None,
            value_converter: None,
        }
    }

    /// Override the registry lookup for keys.
    pub fn with_key_converter(
        mut self,
        f: impl Fn(&str) -> Result<K, ConvertError> + 'static,
    ) -> Self {
        self.key_converter = Some(Rc::new(f));
        self
    }

    /// Override the registry lookup for values.
    pub fn with_value_converter(
        mut self,
        f: impl Fn(&str) -> Result<V, ConvertError> + 'static,
    ) -> Self {
        self.value_converter = Some(Rc::new(f));
        self
    }
}

impl<'a, C, K, V> Capturable<'a, (K, V)> for Pairs<'a, C, K, V>
where
    K: FromStr + 'static,
    V: FromStr + 'static,
    C: 'a + Collectable<(K, V)>,
{
    fn matched(&mut self) {
        // Do nothing.
    }

    fn capture(&mut self, ctx: &CaptureContext<'_>, raw: &str) -> Result<(), ConvertError> {
        let (key, value) = raw
            .split_once(&ctx.separator)
            .ok_or_else(|| ConvertError::new(raw, format!("key{}value pair", ctx.separator)))?;
        let key = convert_value(ctx, &self.key_converter, key)?;
        let value = convert_value(ctx, &self.value_converter, value)?;
        (**self.variable.borrow_mut()).add((key, value));
        Ok(())
    }

    fn kind(&self) -> BindKind {
        BindKind::Map
    }

    fn element(&self) -> (TypeId, &'static str) {
        (TypeId::of::<(K, V)>(), "key=value pair")
    }
}
