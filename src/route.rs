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

use std::path::Path;
use std::path::PathBuf;

const ACCESS_LOG: &str = "access.log";

/// Resolves the file a record is appended to.
#[derive(Debug, Clone)]
pub(crate) struct Router {
    log_dir: PathBuf,
    prefixes: Vec<String>,
}

impl Router {
    pub(crate) fn new(log_dir: impl Into<PathBuf>, prefixes: Vec<String>) -> Self {
        Self {
            log_dir: log_dir.into(),
            prefixes,
        }
    }

    pub(crate) fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Keys starting with one of the separate-folder prefixes go to
    /// `<dir>/<key>/access.log`, the rest share `<dir>/access.log`.
    ///
    /// Empty, `.` and `..` segments of the key are dropped, so no key resolves outside the log
    /// directory.
    pub(crate) fn resolve(&self, route_key: &str) -> PathBuf {
        let separate = self
            .prefixes
            .iter()
            .any(|prefix| route_key.starts_with(prefix.as_str()));

        let mut path = self.log_dir.clone();
        if separate {
            route_key
                .split(['/', '\\'])
                .filter(|segment| !matches!(*segment, "" | "." | ".."))
                .for_each(|segment| path.push(segment));
        }
        path.push(ACCESS_LOG);
        path
    }
}
