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

/// One formatted access log entry, queued for the writer.
///
/// The route key decides which file the payload lands in; the payload is appended verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    route_key: String,
    payload: Vec<u8>,
}

impl LogRecord {
    /// Creates a record for the request path `route_key`.
    ///
    /// A single leading `/` is dropped from the key.
    pub fn new(route_key: impl AsRef<str>, payload: impl Into<Vec<u8>>) -> Self {
        let route_key = route_key.as_ref();
        let route_key = route_key.strip_prefix('/').unwrap_or(route_key);
        Self {
            route_key: route_key.to_string(),
            payload: payload.into(),
        }
    }

    /// The request path, without its leading `/`.
    pub fn route_key(&self) -> &str {
        &self.route_key
    }

    /// The bytes appended to the destination file.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
