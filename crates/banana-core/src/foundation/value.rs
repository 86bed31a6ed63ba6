//! Config value tags and the typed conversion registry.
//!
//! Raw config values arrive as YAML ([`Value`]). Before a value is assigned
//! to a configurable property it is normalised into the shape the property's
//! type deserialises from:
//!
//! - scalars go through a converter looked up by the tag's registry key
//!   (`"bool"`, `"int"`, `"uint"`, `"float"`, `"string"`, or a custom name)
//! - enums are matched by variant name, case-insensitively, or by index
//! - lists and maps are converted element by element
//!
//! Custom types plug in with [`ConversionRegistry::register`]:
//!
//! ```rust,ignore
//! let mut registry = ConversionRegistry::new();
//! registry.register("Duration", |raw| match raw {
//!     Value::String(s) => parse_duration(s),
//!     other => Ok(other.clone()),
//! });
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

pub use serde_yaml::Value;
use serde_yaml::{Mapping, Number};

use crate::error::{ConvertError, ConvertResult};

// ============================================================================
// TypeTag
// ============================================================================

/// Declared type of a configurable property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    /// `bool`
    Bool,
    /// Signed integers.
    Int,
    /// Unsigned integers.
    UInt,
    /// `f32` / `f64`.
    Float,
    /// `String`.
    Str,
    /// Unit-only enum matched by variant name.
    Enum {
        /// Enum type name.
        name: &'static str,
        /// Serialised variant names.
        variants: &'static [&'static str],
    },
    /// `Vec<T>`.
    List(Box<TypeTag>),
    /// `HashMap<K, V>` / `BTreeMap<K, V>`.
    Map(Box<TypeTag>, Box<TypeTag>),
    /// `Option<T>`.
    Optional(Box<TypeTag>),
    /// Any other type; converted only if a converter is registered under its name.
    Named(&'static str),
}

impl TypeTag {
    /// Key used to look the tag up in a [`ConversionRegistry`].
    ///
    /// Structural tags (enum, list, map, optional) have no key.
    pub fn registry_key(&self) -> Option<&'static str> {
        match self {
            Self::Bool => Some("bool"),
            Self::Int => Some("int"),
            Self::UInt => Some("uint"),
            Self::Float => Some("float"),
            Self::Str => Some("string"),
            Self::Named(name) => Some(*name),
            Self::Enum { .. } | Self::List(_) | Self::Map(..) | Self::Optional(_) => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum { name, .. } => f.write_str(name),
            Self::List(inner) => write!(f, "list<{inner}>"),
            Self::Map(k, v) => write!(f, "map<{k}, {v}>"),
            Self::Optional(inner) => write!(f, "optional<{inner}>"),
            other => f.write_str(other.registry_key().unwrap_or("?")),
        }
    }
}

// ============================================================================
// ConfigType
// ============================================================================

/// Types that can back a configurable property.
///
/// Implemented here for primitives and std collections; unit enums get it
/// from `#[derive(ConfigEnum)]`.
pub trait ConfigType {
    /// The tag conversions are driven by.
    fn type_tag() -> TypeTag;
}

macro_rules! impl_config_type {
    ($tag:expr => $($ty:ty),+) => {
        $(
            impl ConfigType for $ty {
                fn type_tag() -> TypeTag {
                    $tag
                }
            }
        )+
    };
}

impl_config_type!(TypeTag::Bool => bool);
impl_config_type!(TypeTag::Int => i8, i16, i32, i64, isize);
impl_config_type!(TypeTag::UInt => u8, u16, u32, u64, usize);
impl_config_type!(TypeTag::Float => f32, f64);
impl_config_type!(TypeTag::Str => String);

impl<T: ConfigType> ConfigType for Vec<T> {
    fn type_tag() -> TypeTag {
        TypeTag::List(Box::new(T::type_tag()))
    }
}

impl<T: ConfigType> ConfigType for Option<T> {
    fn type_tag() -> TypeTag {
        TypeTag::Optional(Box::new(T::type_tag()))
    }
}

impl<K: ConfigType, V: ConfigType, S> ConfigType for HashMap<K, V, S> {
    fn type_tag() -> TypeTag {
        TypeTag::Map(Box::new(K::type_tag()), Box::new(V::type_tag()))
    }
}

impl<K: ConfigType, V: ConfigType> ConfigType for BTreeMap<K, V> {
    fn type_tag() -> TypeTag {
        TypeTag::Map(Box::new(K::type_tag()), Box::new(V::type_tag()))
    }
}

// ============================================================================
// ConversionRegistry
// ============================================================================

/// A scalar conversion function.
pub type ConvertFn = Arc<dyn Fn(&Value) -> ConvertResult<Value> + Send + Sync>;

/// Mapping from type tag to conversion function.
#[derive(Clone)]
pub struct ConversionRegistry {
    converters: HashMap<&'static str, ConvertFn>,
}

impl Default for ConversionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.converters.keys().collect();
        keys.sort();
        f.debug_struct("ConversionRegistry")
            .field("converters", &keys)
            .finish()
    }
}

impl ConversionRegistry {
    /// Creates a registry with the built-in scalar converters.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry
            .register("bool", convert_bool)
            .register("int", convert_int)
            .register("uint", convert_uint)
            .register("float", convert_float)
            .register("string", convert_string);
        registry
    }

    /// Creates a registry without any converter.
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Registers (or replaces) the converter for `key`.
    pub fn register<F>(&mut self, key: &'static str, convert: F) -> &mut Self
    where
        F: Fn(&Value) -> ConvertResult<Value> + Send + Sync + 'static,
    {
        self.converters.insert(key, Arc::new(convert));
        self
    }

    /// Returns `true` if every scalar reachable from `tag` has a converter.
    pub fn supports(&self, tag: &TypeTag) -> bool {
        match tag {
            TypeTag::Enum { .. } => true,
            TypeTag::List(inner) | TypeTag::Optional(inner) => self.supports(inner),
            TypeTag::Map(k, v) => self.supports(k) && self.supports(v),
            scalar => scalar
                .registry_key()
                .is_some_and(|key| self.converters.contains_key(key)),
        }
    }

    /// Converts `raw` into the shape `tag` deserialises from.
    pub fn convert(&self, tag: &TypeTag, raw: &Value) -> ConvertResult<Value> {
        match tag {
            TypeTag::Enum { name, variants } => convert_enum(*name, *variants, raw),
            TypeTag::Optional(inner) => match raw {
                Value::Null => Ok(Value::Null),
                other => self.convert(inner, other),
            },
            TypeTag::List(inner) => match raw {
                Value::Null => Ok(Value::Sequence(Vec::new())),
                Value::Sequence(items) => items
                    .iter()
                    .map(|item| self.convert(inner, item))
                    .collect::<ConvertResult<Vec<_>>>()
                    .map(Value::Sequence),
                other => Err(ConvertError::mismatch(tag, kind_of(other))),
            },
            TypeTag::Map(key_tag, value_tag) => match raw {
                Value::Null => Ok(Value::Mapping(Mapping::new())),
                Value::Mapping(entries) => {
                    let mut out = Mapping::with_capacity(entries.len());
                    for (k, v) in entries {
                        out.insert(self.convert(key_tag, k)?, self.convert(value_tag, v)?);
                    }
                    Ok(Value::Mapping(out))
                }
                other => Err(ConvertError::mismatch(tag, kind_of(other))),
            },
            scalar => {
                let key = scalar
                    .registry_key()
                    .ok_or_else(|| ConvertError::Unsupported(scalar.to_string()))?;
                let convert = self
                    .converters
                    .get(key)
                    .ok_or_else(|| ConvertError::Unsupported(key.to_string()))?;
                convert(raw)
            }
        }
    }
}

/// Name of a value's YAML kind, for error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}

// ─── Built-in converters ──────────────────────────────────────────────────────

fn convert_bool(raw: &Value) -> ConvertResult<Value> {
    let parsed = match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed
        .map(Value::Bool)
        .ok_or_else(|| ConvertError::mismatch(TypeTag::Bool, kind_of(raw)))
}

fn convert_int(raw: &Value) -> ConvertResult<Value> {
    let parsed = match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .map(|i| Value::Number(Number::from(i)))
        .ok_or_else(|| ConvertError::mismatch(TypeTag::Int, kind_of(raw)))
}

fn convert_uint(raw: &Value) -> ConvertResult<Value> {
    let parsed = match raw {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .map(|u| Value::Number(Number::from(u)))
        .ok_or_else(|| ConvertError::mismatch(TypeTag::UInt, kind_of(raw)))
}

fn convert_float(raw: &Value) -> ConvertResult<Value> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .map(|f| Value::Number(Number::from(f)))
        .ok_or_else(|| ConvertError::mismatch(TypeTag::Float, kind_of(raw)))
}

fn convert_string(raw: &Value) -> ConvertResult<Value> {
    match raw {
        Value::String(s) => Ok(Value::String(s.clone())),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(ConvertError::mismatch(TypeTag::Str, kind_of(other))),
    }
}

fn convert_enum(
    name: &'static str,
    variants: &'static [&'static str],
    raw: &Value,
) -> ConvertResult<Value> {
    let found = match raw {
        Value::String(s) => {
            let wanted = s.trim();
            variants
                .iter()
                .find(|v| v.eq_ignore_ascii_case(wanted))
                .copied()
        }
        Value::Number(n) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| variants.get(i))
            .copied(),
        other => {
            return Err(ConvertError::mismatch(name, kind_of(other)));
        }
    };
    found
        .map(|v| Value::String(v.to_string()))
        .ok_or_else(|| ConvertError::UnknownVariant {
            name,
            value: match raw {
                Value::String(s) => s.clone(),
                other => format!("{other:?}"),
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn scalars_accept_string_forms() {
        let registry = ConversionRegistry::new();
        assert_eq!(
            registry.convert(&TypeTag::Int, &yaml("\"42\"")).unwrap(),
            yaml("42")
        );
        assert_eq!(
            registry.convert(&TypeTag::Bool, &yaml("yes")).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            registry.convert(&TypeTag::Str, &yaml("12")).unwrap(),
            Value::String("12".into())
        );
        assert!(registry.convert(&TypeTag::UInt, &yaml("-3")).is_err());
    }

    #[test]
    fn enums_match_by_name_or_index() {
        let registry = ConversionRegistry::new();
        let tag = TypeTag::Enum {
            name: "Mode",
            variants: &["Easy", "Hard"],
        };
        assert_eq!(
            registry.convert(&tag, &yaml("hard")).unwrap(),
            Value::String("Hard".into())
        );
        assert_eq!(
            registry.convert(&tag, &yaml("0")).unwrap(),
            Value::String("Easy".into())
        );
        assert!(matches!(
            registry.convert(&tag, &yaml("Insane")),
            Err(ConvertError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn collections_convert_elementwise() {
        let registry = ConversionRegistry::new();
        let list = Vec::<u8>::type_tag();
        assert_eq!(
            registry.convert(&list, &yaml("[1, \"2\"]")).unwrap(),
            yaml("[1, 2]")
        );

        let map = HashMap::<String, i32>::type_tag();
        assert_eq!(
            registry.convert(&map, &yaml("{a: \"1\"}")).unwrap(),
            yaml("{a: 1}")
        );
        assert!(registry.convert(&list, &yaml("{a: 1}")).is_err());
    }

    #[test]
    fn unknown_named_types_are_unsupported_until_registered() {
        let mut registry = ConversionRegistry::new();
        let tag = TypeTag::Named("Seconds");
        assert!(!registry.supports(&tag));
        assert!(matches!(
            registry.convert(&tag, &yaml("5")),
            Err(ConvertError::Unsupported(_))
        ));

        registry.register("Seconds", |raw| Ok(raw.clone()));
        assert!(registry.supports(&tag));
        assert_eq!(registry.convert(&tag, &yaml("5")).unwrap(), yaml("5"));
    }
}
