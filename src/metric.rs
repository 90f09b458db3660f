//! A single measured quantity and its performance-data representation

use std::fmt;

/// A measured number
///
/// Integers are kept as integers so that byte counts render without a
/// decimal point in the performance data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Value {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Int(v) => v as f64,
            Value::UInt(v) => v as f64,
            Value::Float(v) => v,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! value_from {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Value {
                    Value::$variant(v as $target)
                }
            }
        )*
    };
}

value_from!(Int as i64: i8, i16, i32, i64);
value_from!(UInt as u64: u8, u16, u32, u64, usize);
value_from!(Float as f64: f32, f64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    EmptyName,
    /// The name contains a character that would corrupt the perfdata line
    InvalidCharacter { name: String, ch: char },
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetricError::EmptyName => f.write_str("metric name is empty"),
            MetricError::InvalidCharacter { name, ch } => {
                write!(f, "metric name {:?} contains invalid character {:?}", name, ch)
            }
        }
    }
}

impl std::error::Error for MetricError {}

fn is_forbidden(c: char) -> bool {
    c == '=' || c == ';' || c == '\'' || c.is_whitespace()
}

/// Make an arbitrary string usable as a metric name
///
/// Useful for names derived from collected data such as mount points.
pub fn sanitize_label(raw: &str) -> String {
    let clean: String = raw
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    if clean.is_empty() {
        "_".to_owned()
    } else {
        clean
    }
}

/// One measurement, as reported in the performance data
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: Value,
    /// Appended verbatim after the value, e.g. `%`, `B`, `s`
    pub unit: Option<String>,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
    pub min: Option<Value>,
    pub max: Option<Value>,
}

impl Metric {
    pub fn new<N: Into<String>, V: Into<Value>>(name: N, value: V) -> Metric {
        Metric {
            name: name.into(),
            value: value.into(),
            unit: None,
            warning: None,
            critical: None,
            min: None,
            max: None,
        }
    }

    pub fn unit<U: Into<String>>(mut self, unit: U) -> Metric {
        self.unit = Some(unit.into());
        self
    }

    pub fn min<V: Into<Value>>(mut self, min: V) -> Metric {
        self.min = Some(min.into());
        self
    }

    pub fn max<V: Into<Value>>(mut self, max: V) -> Metric {
        self.max = Some(max.into());
        self
    }

    /// A percentage rounded to two decimals, bounded 0..100 for graphing
    pub fn percent<N: Into<String>>(name: N, value: f64) -> Metric {
        let rounded = (value * 100.0).round() / 100.0;
        Metric::new(name, rounded).unit("%").min(0).max(100)
    }

    /// Check that the name can be serialized into the performance data
    pub fn validate(&self) -> Result<(), MetricError> {
        if self.name.is_empty() {
            return Err(MetricError::EmptyName);
        }
        match self.name.chars().find(|c| is_forbidden(*c)) {
            Some(ch) => Err(MetricError::InvalidCharacter {
                name: self.name.clone(),
                ch,
            }),
            None => Ok(()),
        }
    }
}

fn opt<T: fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// `name=value[unit];warn;crit;min;max`, unset fields left blank
impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}={}{};{};{};{};{}",
            self.name,
            self.value,
            self.unit.as_ref().map(String::as_str).unwrap_or(""),
            opt(&self.warning),
            opt(&self.critical),
            opt(&self.min),
            opt(&self.max)
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bare_metric_leaves_fields_blank() {
        let m = Metric::new("used", 658_210_816u64).unit("Bytes");
        assert_eq!(m.to_string(), "used=658210816Bytes;;;;");
    }

    #[test]
    fn full_metric() {
        let mut m = Metric::percent("root", 81.5);
        m.warning = Some(80.0);
        m.critical = Some(90.0);
        assert_eq!(m.to_string(), "root=81.5%;80;90;0;100");
    }

    #[test]
    fn value_kinds() {
        assert_eq!(Value::from(-3i32).to_string(), "-3");
        assert_eq!(Value::from(7usize).to_string(), "7");
        assert_eq!(Value::from(2.0f64).to_string(), "2");
        assert_eq!(Value::from(0.25f64).to_string(), "0.25");
        assert_eq!(Value::from(u64::max_value()).as_f64(), u64::max_value() as f64);
    }

    #[test]
    fn validate_rejects_perfdata_breakers() {
        assert_eq!(Metric::new("", 1).validate(), Err(MetricError::EmptyName));
        for bad in &["a=b", "a;b", "a b", "a\tb", "it's"] {
            assert!(Metric::new(*bad, 1).validate().is_err(), "{} should fail", bad);
        }
        assert!(Metric::new("/var/log", 1).validate().is_ok());
    }

    #[test]
    fn sanitize_replaces_bad_chars() {
        assert_eq!(sanitize_label("/mnt/my disk"), "/mnt/my_disk");
        assert_eq!(sanitize_label("a=b;c"), "a_b_c");
        assert_eq!(sanitize_label(""), "_");
        assert!(Metric::new(sanitize_label("x y=z"), 1).validate().is_ok());
    }
}
