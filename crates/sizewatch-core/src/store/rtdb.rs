//! Realtime Database REST backend.
//!
//! Every path maps to `{base}/{path}.json`:
//!
//! - write: `PUT` with the JSON value as body (replaces the subtree)
//! - read: `GET`, where a `null` body means absent
//! - list: `GET ?shallow=true`, which returns `{key: true, ...}`
//!
//! Authentication uses the `auth` query parameter.
//!
//! Database keys may not contain `.`, `$`, `#`, `[`, `]`, `/` or ASCII
//! control characters, yet branch names (`release/1.x`) and artifact names
//! (`main.js`) routinely do. Path segments and object keys are therefore
//! escaped on the way in and unescaped on the way out: every such byte, plus
//! `~`, `?` and `%`, becomes `~XX` with `XX` its uppercase hex code. The
//! stored key `main~2Ejs` reads back as `main.js`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use super::naming::segments;
use super::TreeStore;
use crate::error::{SizeError, SizeResult};
use crate::http::{Auth, HttpBackend};

/// Tree store backed by a Realtime Database instance.
#[derive(Debug, Clone)]
pub struct RealtimeDbStore {
    http: HttpBackend,
}

impl RealtimeDbStore {
    pub fn new(base_url: &str, token: Option<String>, timeout_secs: u64) -> SizeResult<Self> {
        let auth = match token {
            Some(token) if !token.is_empty() => Auth::Query("auth", token),
            _ => Auth::None,
        };
        Ok(Self {
            http: HttpBackend::new("realtime-db", base_url, auth, timeout_secs)?,
        })
    }

    fn node_url(&self, path: &str) -> String {
        let escaped: Vec<String> = segments(path).into_iter().map(escape_key).collect();
        self.http.url(&format!("{}.json", escaped.join("/")))
    }

    fn store_error(&self, err: SizeError) -> SizeError {
        match err {
            SizeError::Upstream {
                status, message, ..
            } => SizeError::store(match status {
                Some(code) => format!("{} returned HTTP {}: {}", self.http.service(), code, message),
                None => format!("{} unreachable: {}", self.http.service(), message),
            }),
            other => other,
        }
    }
}

#[async_trait]
impl TreeStore for RealtimeDbStore {
    async fn write(&self, path: &str, value: Value) -> SizeResult<()> {
        let request = self
            .http
            .request(Method::PUT, &self.node_url(path))
            .json(&map_keys(value, &escape_key));
        self.http
            .send(request)
            .await
            .map_err(|e| self.store_error(e))?;
        debug!(path, "wrote realtime-db node");
        Ok(())
    }

    async fn read(&self, path: &str) -> SizeResult<Option<Value>> {
        let request = self.http.request(Method::GET, &self.node_url(path));
        let response = self
            .http
            .send_optional(request)
            .await
            .map_err(|e| self.store_error(e))?;
        let Some(response) = response else {
            return Ok(None);
        };
        let value: Value = self
            .http
            .json(response)
            .await
            .map_err(|e| self.store_error(e))?;
        Ok(if value.is_null() {
            None
        } else {
            Some(map_keys(value, &unescape_key))
        })
    }

    async fn list_children(&self, path: &str) -> SizeResult<BTreeSet<String>> {
        let request = self
            .http
            .request(Method::GET, &self.node_url(path))
            .query(&[("shallow", "true")]);
        let response = self
            .http
            .send_optional(request)
            .await
            .map_err(|e| self.store_error(e))?;
        let Some(response) = response else {
            return Ok(BTreeSet::new());
        };
        let value: Value = self
            .http
            .json(response)
            .await
            .map_err(|e| self.store_error(e))?;
        Ok(value
            .as_object()
            .map(|map| map.keys().map(|key| unescape_key(key)).collect())
            .unwrap_or_default())
    }
}

const ESCAPE: char = '~';

fn needs_escape(c: char) -> bool {
    matches!(c, '~' | '.' | '$' | '#' | '[' | ']' | '/' | '?' | '%') || c.is_ascii_control()
}

/// Escape a key so the database accepts it and it survives the request URL.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if needs_escape(c) {
            out.push_str(&format!("{}{:02X}", ESCAPE, c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverse [`escape_key`]. A `~` not followed by two hex digits is kept as is.
fn unescape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut rest = key;
    while let Some(pos) = rest.find(ESCAPE) {
        out.push_str(&rest[..pos]);
        let decoded = rest
            .get(pos + 1..pos + 3)
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .filter(u8::is_ascii);
        match decoded {
            Some(byte) => {
                out.push(char::from(byte));
                rest = &rest[pos + 3..];
            }
            None => {
                out.push(ESCAPE);
                rest = &rest[pos + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Rewrite every object key in `value`, recursively.
fn map_keys(value: Value, f: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| (f(key.as_str()), map_keys(child, f)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| map_keys(v, f)).collect()),
        other => other,
    }
}
