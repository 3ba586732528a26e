//! Per-request parameter resolution.
//!
//! Path captures and query-string pairs are merged into one [`ParameterSet`].
//! Every key is stored twice: `name` holds the first value and `name[]` holds
//! all values in the order they arrived, so `?tag=a&tag=b` answers both
//! "the tag" (`a`) and "every tag" (`[a, b]`).

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::handlers::HandlerError;
use crate::protocol::PathParams;

/// Suffix marking the list form of a key.
pub const LIST_SUFFIX: &str = "[]";

/// A stored parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

/// Merged path and query parameters for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    values: HashMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge path captures with a raw (undecoded) query string.
    ///
    /// Query values are form-decoded, blank values are dropped, and a query
    /// key overrides a path capture with the same name.
    pub fn resolve(path_params: &PathParams, query_string: &str) -> Self {
        let mut merged: HashMap<String, Vec<String>> = path_params
            .iter()
            .map(|(k, v)| (k.clone(), vec![v.clone()]))
            .collect();

        let mut query: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query_string.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            query.entry(key.into_owned()).or_default().push(value.into_owned());
        }
        merged.extend(query);

        let mut set = Self::new();
        for (key, values) in merged {
            set.insert_all(key, values);
        }
        set
    }

    /// Store `values` under both the scalar and the list key.
    pub fn insert_all(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        if let Some(first) = values.first() {
            self.values.insert(key.clone(), ParamValue::Scalar(first.clone()));
        }
        self.values.insert(format!("{key}{LIST_SUFFIX}"), ParamValue::List(values));
    }

    /// Builder-style single value insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_all(key, vec![value.into()]);
        self
    }

    /// Scalar access. A list key yields its first element.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            ParamValue::Scalar(value) => Some(value),
            ParamValue::List(values) => values.first().map(String::as_str),
        }
    }

    /// Every value for `key`. Accepts either `tag` or `tag[]`.
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        let list_key;
        let key = if key.ends_with(LIST_SUFFIX) {
            key
        } else {
            list_key = format!("{key}{LIST_SUFFIX}");
            &list_key
        };
        match self.values.get(key)? {
            ParamValue::List(values) => Some(values),
            ParamValue::Scalar(value) => Some(std::slice::from_ref(value)),
        }
    }

    pub fn raw(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of stored keys, counting both forms.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Scalar value or a `MissingParameter` error.
    pub fn require(&self, key: &str) -> Result<&str, HandlerError> {
        self.get(key)
            .ok_or_else(|| HandlerError::MissingParameter(key.to_string()))
    }

    /// Parse the scalar value, reporting absence or bad input as a handler error.
    pub fn parse<T>(&self, key: &str) -> Result<T, HandlerError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.require(key)?;
        raw.parse().map_err(|e: T::Err| HandlerError::InvalidParameter {
            name: key.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
    }
}
