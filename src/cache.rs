//! Per-surface state cache
//!
//! Maps a logical coordinate to the value last handed to the transport. A
//! missing entry means "unset", so the first write to any coordinate is
//! always transmitted.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Values mirrored onto a surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceValue {
    Text(String),
    ColorIndex(i32),
    Numeric(i64),
    Rgb(u8, u8, u8),
    Bool(bool),
    Float(f64),
    /// Compared element-wise
    List(Vec<SurfaceValue>),
}

impl SurfaceValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SurfaceValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of numeric-like values
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            SurfaceValue::ColorIndex(c) => Some(c as i64),
            SurfaceValue::Numeric(n) => Some(n),
            SurfaceValue::Bool(b) => Some(b as i64),
            _ => None,
        }
    }
}

impl fmt::Display for SurfaceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceValue::Text(s) => write!(f, "{}", s),
            SurfaceValue::ColorIndex(c) => write!(f, "color:{}", c),
            SurfaceValue::Numeric(n) => write!(f, "{}", n),
            SurfaceValue::Rgb(r, g, b) => write!(f, "rgb({},{},{})", r, g, b),
            SurfaceValue::Bool(b) => write!(f, "{}", b),
            SurfaceValue::Float(v) => write!(f, "{}", v),
            SurfaceValue::List(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for SurfaceValue {
    fn from(s: &str) -> Self {
        SurfaceValue::Text(s.to_string())
    }
}

impl From<String> for SurfaceValue {
    fn from(s: String) -> Self {
        SurfaceValue::Text(s)
    }
}

impl From<bool> for SurfaceValue {
    fn from(b: bool) -> Self {
        SurfaceValue::Bool(b)
    }
}

impl From<i64> for SurfaceValue {
    fn from(n: i64) -> Self {
        SurfaceValue::Numeric(n)
    }
}

impl From<f64> for SurfaceValue {
    fn from(v: f64) -> Self {
        SurfaceValue::Float(v)
    }
}

/// Last transmitted value per coordinate
#[derive(Debug)]
pub struct StateCache<K> {
    entries: HashMap<K, SurfaceValue>,
}

impl<K> StateCache<K>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache sized for a surface with `capacity` coordinates
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// True if `value` is exactly what was last transmitted for `key`
    pub fn is_current(&self, key: &K, value: &SurfaceValue) -> bool {
        self.entries.get(key).is_some_and(|cached| cached == value)
    }

    /// Record `value` as transmitted for `key`
    pub fn record(&mut self, key: K, value: SurfaceValue) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<&SurfaceValue> {
        self.entries.get(key)
    }

    /// Forget every entry so the next write to each coordinate is sent
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &SurfaceValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K> Default for StateCache<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
