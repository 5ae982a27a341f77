use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::spec::SpecError;

/// A closed integer interval with a textual `n`/`min..max`/`min..*` form.
///
/// Ranges describe both the arity of a parameter (how many operands it
/// consumes) and the index window of a positional parameter.
///
/// ### Example
/// ```
/// use argspec::Range;
///
/// let arity: Range = "2..*".parse().unwrap();
/// assert_eq!(arity.min(), 2);
/// assert!(arity.is_variable());
/// assert!(arity.contains(100));
/// ```
#[derive(Debug, Clone)]
pub struct Range {
    min: usize,
    max: usize,
    variable: bool,
    unspecified: bool,
    original: Option<String>,
}

impl Range {
    /// Create a range covering precisely `n`.
    pub fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: n,
            variable: false,
            unspecified: false,
            original: None,
        }
    }

    /// Create a range covering `min..max` inclusive.
    pub fn between(min: usize, max: usize) -> Result<Self, SpecError> {
        if min > max {
            return Err(SpecError::InvalidRange(format!("{min}..{max}")));
        }

        Ok(Self {
            min,
            max,
            variable: false,
            unspecified: false,
            original: None,
        })
    }

    /// Create an unbounded range covering `min..*`.
    pub fn at_least(min: usize) -> Self {
        Self {
            min,
            max: usize::MAX,
            variable: true,
            unspecified: false,
            original: None,
        }
    }

    /// Mark this range as synthesized rather than declared.
    pub(crate) fn inferred(mut self) -> Self {
        self.unspecified = true;
        self
    }

    /// The lower bound.
    pub fn min(&self) -> usize {
        self.min
    }

    /// The upper bound (`usize::MAX` when unbounded).
    pub fn max(&self) -> usize {
        self.max
    }

    /// Whether the range is unbounded above.
    pub fn is_variable(&self) -> bool {
        self.variable
    }

    /// Whether the range was synthesized rather than declared.
    pub fn is_unspecified(&self) -> bool {
        self.unspecified
    }

    /// Whether `n` falls within the interval.
    pub fn contains(&self, n: usize) -> bool {
        self.min <= n && n <= self.max
    }

    pub(crate) fn overlaps(&self, other: &Range) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

impl FromStr for Range {
    type Err = SpecError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bound = |token: &str| -> Result<usize, SpecError> {
            let value: i64 = token
                .trim()
                .parse()
                .map_err(|_| SpecError::InvalidRange(text.to_string()))?;

            if value < 0 {
                return Err(SpecError::InvalidRange(text.to_string()));
            }

            Ok(value as usize)
        };

        let mut range = match text.split_once("..") {
            Some((min, "*")) => Range::at_least(bound(min)?),
            Some((min, max)) => Range::between(bound(min)?, bound(max)?)
                .map_err(|_| SpecError::InvalidRange(text.to_string()))?,
            None => Range::exactly(bound(text)?),
        };
        range.original = Some(text.to_string());

        Ok(range)
    }
}

// Equality considers the interval only, not its textual provenance.
impl PartialEq for Range {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min && self.max == other.max
    }
}

impl Eq for Range {}

impl Hash for Range {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.min.hash(state);
        self.max.hash(state);
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variable {
            write!(f, "{}..*", self.min)
        } else if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..{}", self.min, self.max)
        }
    }
}

/// When an external renderer should surface a parameter's default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShowDefault {
    /// Always display the default.
    Always,
    /// Never display the default.
    Never,
    /// Display the default only when explicitly requested.
    #[default]
    OnDemand,
}
