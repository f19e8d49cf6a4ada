// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeMap;

/// A key-value bag attached to a request, such as user or session identifiers.
///
/// Put it in the request extensions; the keys configured with
/// [`AccessLogBuilder::context_keys`](crate::AccessLogBuilder::context_keys) are appended to
/// each logged line.
///
/// # Examples
///
/// ```
/// use apilog::RequestContext;
///
/// let request = http::Request::builder()
///     .uri("/orders")
///     .extension(RequestContext::new().with("user_id", 42))
///     .body(())
///     .unwrap();
///
/// let context = request.extensions().get::<RequestContext>().unwrap();
/// assert_eq!(context.get("user_id"), Some("42"));
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    kvs: BTreeMap<String, String>,
}

impl RequestContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, stringified with its [`ToString`] implementation.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.kvs.insert(key.into(), value.to_string());
    }

    /// Inserts a value and returns the context.
    #[must_use]
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.insert(key, value);
        self
    }

    /// Returns the value of `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.kvs.get(key).map(String::as_str)
    }

    /// Removes `key` from the context.
    pub fn remove(&mut self, key: &str) {
        self.kvs.remove(key);
    }
}
