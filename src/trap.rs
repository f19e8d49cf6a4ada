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

//! Diagnostic sink for failures that cannot be returned to a caller.

use std::fmt;

/// A sink for errors raised on the writer thread.
///
/// Errors reaching a trap are never surfaced to HTTP clients. The writer reports its terminating
/// error here before the pipeline closes.
pub trait Trap: fmt::Debug + Send + Sync + 'static {
    /// Handles an error.
    fn trap(&self, err: &anyhow::Error);
}

/// A trap that forwards errors to the [`log`] facade at error level.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct DefaultTrap {}

impl Trap for DefaultTrap {
    fn trap(&self, err: &anyhow::Error) {
        log::error!("access log writer failed: {err:#}");
    }
}

impl<T: Trap> From<T> for Box<dyn Trap> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}
