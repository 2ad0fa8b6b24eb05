//! Build parameters and their form encoding.
//!
//! Parameters are kept sorted by name so the encoded body is the same on
//! every run. Names and values are percent-encoded: a value containing
//! `&` or `=` survives the trip to the server intact.

use std::collections::BTreeMap;

use serde::Serialize;

/// Name → value parameters for `buildWithParameters`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BuildParameters(BTreeMap<String, String>);

/// A `KEY=VALUE` argument without a key or `=`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid parameter '{0}': expected KEY=VALUE")]
pub struct InvalidAssignment(pub String);

impl BuildParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, replacing any previous value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode as an `application/x-www-form-urlencoded` body.
    pub fn encode_form(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string(&self.0)
    }

    /// Parse a form body back into parameters.
    pub fn decode_form(body: &str) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)?;
        Ok(pairs.into_iter().collect())
    }

    /// Split a `KEY=VALUE` argument on its first `=`.
    pub fn parse_assignment(arg: &str) -> Result<(String, String), InvalidAssignment> {
        match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(InvalidAssignment(arg.to_string())),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for BuildParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl std::fmt::Display for BuildParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}
