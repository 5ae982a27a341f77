use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::constant::CONVERTER_EXCLUDES_VAR;

/// A raw operand failed to convert into its target type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{raw}' is not a {describes}")]
pub struct ConvertError {
    pub(crate) raw: String,
    pub(crate) describes: String,
}

impl ConvertError {
    /// Create a conversion error for the raw input `raw`, where `describes`
    /// names the expected shape (ex: `"boolean"`).
    pub fn new(raw: impl Into<String>, describes: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            describes: describes.into(),
        }
    }
}

pub(crate) type ConvertFn<T> = Rc<dyn Fn(&str) -> Result<T, ConvertError>>;

struct Entry {
    type_path: &'static str,
    func: Box<dyn std::any::Any>,
}

/// A pluggable map from target type to string conversion.
///
/// Each [`CommandLine`](crate::CommandLine) owns a registry seeded from
/// [`ConverterRegistry::defaults`]. Conversion consults, in order: the
/// binding's explicit converter, this registry, and finally the element
/// type's `FromStr` implementation.
pub struct ConverterRegistry {
    entries: HashMap<TypeId, Entry>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl ConverterRegistry {
    /// Create a registry with no converters.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::default(),
        }
    }

    /// Create the default registry, honoring the process-wide exclusion
    /// patterns (comma separated regexes in `ARGSPEC_CONVERTER_EXCLUDES`,
    /// matched against converter type paths).
    pub fn defaults() -> Self {
        Self::defaults_excluding(exclusion_patterns())
    }

    pub(crate) fn defaults_excluding(patterns: &[Regex]) -> Self {
        let mut registry = Self::empty();

        registry.register_from_str::<i8>("i8");
        registry.register_from_str::<i16>("i16");
        registry.register_from_str::<i32>("i32");
        registry.register_from_str::<i64>("i64");
        registry.register_from_str::<i128>("i128");
        registry.register_from_str::<isize>("isize");
        registry.register_from_str::<u8>("u8");
        registry.register_from_str::<u16>("u16");
        registry.register_from_str::<u32>("u32");
        registry.register_from_str::<u64>("u64");
        registry.register_from_str::<u128>("u128");
        registry.register_from_str::<usize>("usize");
        registry.register_from_str::<f32>("f32");
        registry.register_from_str::<f64>("f64");
        registry.register_from_str::<char>("character");
        registry.register_from_str::<String>("string");
        registry.register_from_str::<PathBuf>("path");
        registry.register_from_str::<Ipv4Addr>("IPv4 address");
        registry.register_from_str::<Ipv6Addr>("IPv6 address");
        registry.register_from_str::<IpAddr>("IP address");
        registry.register_from_str::<SocketAddr>("socket address");
        registry.register_from_str::<Regex>("pattern");
        registry.register_from_str::<url::Url>("URL");
        registry.register_from_str::<uuid::Uuid>("UUID");
        registry.register_from_str::<TimeOfDay>("HH:mm[:ss[.SSS]] time");
        registry.register::<bool>(|raw| match raw.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConvertError::new(raw, "boolean")),
        });

        registry
            .entries
            .retain(|_, entry| !patterns.iter().any(|p| p.is_match(entry.type_path)));
        registry
    }

    /// Register a converter for `T`, replacing any previous one.
    /// The converter's errors name the expected shape.
    pub fn register<T: 'static>(&mut self, f: impl Fn(&str) -> Result<T, ConvertError> + 'static) {
        let func: ConvertFn<T> = Rc::new(f);
        self.entries.insert(
            TypeId::of::<T>(),
            Entry {
                type_path: type_name::<T>(),
                func: Box::new(func),
            },
        );
    }

    fn register_from_str<T: FromStr + 'static>(&mut self, describes: &'static str) {
        self.register::<T>(move |raw| {
            T::from_str(raw).map_err(|_| ConvertError::new(raw, describes))
        });
    }

    /// Remove the converter for `T`, if any.
    pub fn deregister<T: 'static>(&mut self) {
        self.entries.remove(&TypeId::of::<T>());
    }

    /// Whether a converter for `T` is registered.
    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Convert `raw` using the registered converter for `T`.
    pub fn convert<T: 'static>(&self, raw: &str) -> Option<Result<T, ConvertError>> {
        self.lookup::<T>().map(|f| f(raw))
    }

    pub(crate) fn lookup<T: 'static>(&self) -> Option<ConvertFn<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.func.downcast_ref::<ConvertFn<T>>())
            .cloned()
    }
}

fn exclusion_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let Ok(raw) = std::env::var(CONVERTER_EXCLUDES_VAR) else {
            return Vec::default();
        };

        raw.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// A wall-clock time of day, parsed from `HH:mm`, `HH:mm:ss` or
/// `HH:mm:ss.SSS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
    second: u8,
    millisecond: u16,
}

impl TimeOfDay {
    /// Hours since midnight (0-23).
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Minutes past the hour (0-59).
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Seconds past the minute (0-59).
    pub fn second(&self) -> u8 {
        self.second
    }

    /// Milliseconds past the second (0-999).
    pub fn millisecond(&self) -> u16 {
        self.millisecond
    }
}

impl FromStr for TimeOfDay {
    type Err = ConvertError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let fail = || ConvertError::new(text, "HH:mm[:ss[.SSS]] time");
        let field = |token: &str, limit: u64| -> Result<u64, ConvertError> {
            if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
                return Err(fail());
            }

            let value: u64 = token.parse().map_err(|_| fail())?;

            if value > limit {
                return Err(fail());
            }

            Ok(value)
        };

        let mut parts = text.split(':');
        let hour = field(parts.next().ok_or_else(fail)?, 23)?;
        let minute = field(parts.next().ok_or_else(fail)?, 59)?;
        let (second, millisecond) = match parts.next() {
            None => (0, 0),
            Some(rest) => match rest.split_once('.') {
                None => (field(rest, 59)?, 0),
                Some((second, millis)) => {
                    if millis.is_empty() || millis.len() > 3 {
                        return Err(fail());
                    }

                    (field(second, 59)?, field(millis, 999)?)
                }
            },
        };

        if parts.next().is_some() {
            return Err(fail());
        }

        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
            second: second as u8,
            millisecond: millisecond as u16,
        })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;

        if self.millisecond > 0 {
            write!(f, ".{:03}", self.millisecond)?;
        }

        Ok(())
    }
}
