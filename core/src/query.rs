//! Query-string encoding for request paths.
//!
//! # Design
//! Values are serialized with `application/x-www-form-urlencoded` rules, the
//! same encoding browsers apply to `URLSearchParams`. A list value becomes a
//! single comma-joined token under one key instead of repeated `key=value`
//! pairs, so `ids=[1, 2]` encodes as `ids=1%2C2`.

use std::fmt;

use url::form_urlencoded;

/// A single query value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i128),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(n) if n.is_nan() => f.write_str("NaN"),
            Scalar::Float(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            // -0 prints as 0
            Scalar::Float(n) if *n == 0.0 => f.write_str("0"),
            Scalar::Float(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A query parameter value: one scalar or a list of scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl QueryValue {
    fn render(&self) -> String {
        match self {
            QueryValue::Scalar(s) => s.to_string(),
            QueryValue::List(items) => items
                .iter()
                .map(Scalar::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(<$conv>::from(value))
                }
            }

            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    QueryValue::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

scalar_from! {
    String => Str as String,
    &str => Str as String,
    i8 => Int as i128,
    i16 => Int as i128,
    i32 => Int as i128,
    i64 => Int as i128,
    i128 => Int as i128,
    u8 => Int as i128,
    u16 => Int as i128,
    u32 => Int as i128,
    u64 => Int as i128,
    f32 => Float as f64,
    f64 => Float as f64,
    bool => Bool as bool,
}

// `i128: From<usize>` is not provided; pointer-sized integers always fit.
impl From<usize> for Scalar {
    fn from(value: usize) -> Self {
        Scalar::Int(value as i128)
    }
}

impl From<usize> for QueryValue {
    fn from(value: usize) -> Self {
        QueryValue::Scalar(Scalar::from(value))
    }
}

impl From<isize> for Scalar {
    fn from(value: isize) -> Self {
        Scalar::Int(value as i128)
    }
}

impl From<isize> for QueryValue {
    fn from(value: isize) -> Self {
        QueryValue::Scalar(Scalar::from(value))
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        QueryValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Scalar>, const N: usize> From<[T; N]> for QueryValue {
    fn from(values: [T; N]) -> Self {
        QueryValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Encode `params` as a query string with a leading `?`.
///
/// Entries whose value is `None` are skipped. Returns an empty string when
/// nothing is left to encode.
pub fn query_string<I, K>(params: I) -> String
where
    I: IntoIterator<Item = (K, Option<QueryValue>)>,
    K: AsRef<str>,
{
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        if let Some(value) = value {
            serializer.append_pair(key.as_ref(), &value.render());
        }
    }
    let encoded = serializer.finish();
    if encoded.is_empty() {
        String::new()
    } else {
        format!("?{encoded}")
    }
}
