//! Lenient form and query field access.
//!
//! Fields are read the way browsers submit them: a missing or non-urlencoded
//! body yields no fields, and the first value wins when a key repeats. Handlers
//! decide what an absent field means, so extraction itself never rejects.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
};

const URLENCODED: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    pub fn parse(input: &[u8]) -> Self {
        let mut fields = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(input) {
            fields
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self(fields)
    }

    pub fn from_query(query: Option<&str>) -> Self {
        query.map(|q| Self::parse(q.as_bytes())).unwrap_or_default()
    }

    pub fn take(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Field value, or an empty string when absent.
    pub fn take_or_empty(&mut self, key: &str) -> String {
        self.take(key).unwrap_or_default()
    }
}

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_urlencoded = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim_start().starts_with(URLENCODED));
        if !is_urlencoded {
            return Ok(Self::default());
        }

        match Bytes::from_request(req, state).await {
            Ok(body) => Ok(Self::parse(&body)),
            Err(e) => {
                tracing::debug!(error = %e, "Unreadable form body, treating as empty");
                Ok(Self::default())
            }
        }
    }
}
