//! Form-encoded request bodies and their validation errors.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Ordered `(key, value)` pairs of an `application/x-www-form-urlencoded` body.
///
/// Keys may repeat (`contributors=1&contributors=2`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData(Vec<(String, String)>);

impl FormData {
    #[must_use]
    pub const fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// First value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// Checkbox semantics: present, and not `false`, `off` or `0`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "off" | "0"))
    }

    /// Trimmed, non-blank value of `key`.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty()).map(ToOwned::to_owned)
    }

    /// Required text of at most `max_len` characters. Records an error and returns `None` otherwise.
    pub fn required_text(&self, key: &str, max_len: usize, errors: &mut FormErrors) -> Option<String> {
        match self.text(key) {
            None => {
                errors.add(key, "This field is required.");
                None
            },
            Some(value) if value.chars().count() > max_len => {
                errors.add(key, format!("Ensure this value has at most {max_len} characters."));
                None
            },
            Some(value) => Some(value),
        }
    }

    /// Submitted values as a JSON object. Repeated keys become arrays.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (key, value) in &self.0 {
            let value = Value::String(value.clone());
            match map.get_mut(key) {
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => *existing = Value::Array(vec![existing.take(), value]),
                None => {
                    map.insert(key.clone(), value);
                },
            }
        }
        map
    }

    /// Optional positive integer. Blank means `None`; anything else unparsable is an error.
    pub fn positive_int(&self, key: &str, errors: &mut FormErrors) -> Option<i64> {
        let raw = self.text(key)?;
        match raw.parse::<u32>() {
            Ok(n) if n > 0 => Some(i64::from(n)),
            _ => {
                errors.add(key, "Enter a positive whole number.");
                None
            },
        }
    }
}

impl From<Vec<(String, String)>> for FormData {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Field name to validation messages, rendered into the page context as `form.errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

/// What a form page shows: the bound values and any validation errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormView {
    pub data: Value,
    pub errors: FormErrors,
}

impl FormView {
    /// A form bound to an existing record or its defaults.
    #[must_use]
    pub fn bound(values: &impl Serialize) -> Self {
        Self { data: serde_json::to_value(values).unwrap_or_default(), errors: FormErrors::default() }
    }

    /// A rejected submission, echoed back with its errors.
    #[must_use]
    pub fn invalid(submitted: &FormData, errors: FormErrors) -> Self {
        Self { data: Value::Object(submitted.to_map()), errors }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(feature = "server")]
mod extract {
    use super::FormData;
    use crate::server::ApiError;
    use axum::extract::{Form, FromRequest, Request};

    impl<S: Send + Sync> FromRequest<S> for FormData {
        type Rejection = ApiError;

        async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::Rejected {
                    message: rejection.body_text().into(),
                    status: rejection.status().as_u16(),
                    context: None,
                })?;
            Ok(Self(pairs))
        }
    }
}
