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

use std::path::PathBuf;

/// The default root directory for log and archive files.
pub const DEFAULT_LOG_DIR: &str = "apilog";
/// The default number of days an archive is kept.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;
/// The default number of records the queue holds before producers block.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
/// The default body length at or above which bodies are left out of a record.
pub const DEFAULT_MAX_BODY_LEN: usize = 10 << 10;

/// Options of an access log pipeline.
///
/// All fields are optional; zero or empty values fall back to the defaults when the pipeline is
/// built. With the `serde` feature, a [`Config`] can be deserialized from any serde format and
/// missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Root for all log and archive files.
    pub log_dir: PathBuf,
    /// Whether request and response bodies are logged.
    pub capture_bodies: bool,
    /// Age in days after which archives are deleted.
    pub retention_days: u32,
    /// Capacity of the queue between request handlers and the writer.
    pub queue_capacity: usize,
    /// Bodies at or above this length are omitted.
    pub max_body_len: usize,
    /// Path prefixes logged into their own subfolder instead of the shared file.
    pub separate_prefixes: Vec<String>,
    /// Request context keys appended to each line.
    pub context_keys: Vec<String>,
    /// Request header keys appended to each line.
    pub header_keys: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            capture_bodies: false,
            retention_days: DEFAULT_RETENTION_DAYS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_body_len: DEFAULT_MAX_BODY_LEN,
            separate_prefixes: vec![],
            context_keys: vec![],
            header_keys: vec![],
        }
    }
}

impl Config {
    /// Replaces zero or empty values with their defaults.
    ///
    /// Separate-folder prefixes lose their leading `/` since they are matched against the request
    /// path without it; prefixes left empty are dropped, they would match every request.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.log_dir.as_os_str().is_empty() {
            self.log_dir = PathBuf::from(DEFAULT_LOG_DIR);
        }
        if self.retention_days == 0 {
            self.retention_days = DEFAULT_RETENTION_DAYS;
        }
        if self.queue_capacity == 0 {
            self.queue_capacity = DEFAULT_QUEUE_CAPACITY;
        }
        if self.max_body_len == 0 {
            self.max_body_len = DEFAULT_MAX_BODY_LEN;
        }
        self.separate_prefixes = self
            .separate_prefixes
            .into_iter()
            .map(|prefix| prefix.trim_start_matches('/').to_string())
            .filter(|prefix| !prefix.is_empty())
            .collect();
        self
    }
}
