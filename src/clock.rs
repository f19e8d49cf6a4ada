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

use std::sync::Arc;
use std::sync::Mutex;

use jiff::Span;
use jiff::Zoned;
use jiff::civil::Date;

/// The source of time for record timestamps and rotation days.
///
/// The calendar day used for rotation is the civil date of [`Clock::now`], so the system clock
/// rotates at local midnight.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    /// The system clock in the system time zone.
    #[default]
    System,
    /// A settable clock shared by all its clones. Useful for testing rotation.
    Manual(ManualClock),
}

impl Clock {
    /// Returns the current zoned time.
    pub fn now(&self) -> Zoned {
        match self {
            Clock::System => Zoned::now(),
            Clock::Manual(clock) => clock.now(),
        }
    }

    /// Returns the current calendar day.
    pub fn today(&self) -> Date {
        self.now().date()
    }
}

impl From<ManualClock> for Clock {
    fn from(clock: ManualClock) -> Self {
        Clock::Manual(clock)
    }
}

/// The time could be reset.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Zoned>>,
}

impl ManualClock {
    /// Creates a new [`ManualClock`] starting at `now`.
    pub fn new(now: Zoned) -> ManualClock {
        ManualClock {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Returns the time this clock currently reads.
    pub fn now(&self) -> Zoned {
        self.now
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Sets the time of this clock and all its clones.
    pub fn set(&self, now: Zoned) {
        *self
            .now
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
    }

    /// Moves this clock forward by `span`.
    ///
    /// Spans that overflow the supported range leave the clock unchanged.
    pub fn advance(&self, span: Span) {
        let mut now = self
            .now
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Ok(next) = now.checked_add(span) {
            *now = next;
        }
    }
}
