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

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::Config;
use crate::LogRecord;
use crate::clock::Clock;
use crate::filter::Skipper;
use crate::layout::LineLayout;
use crate::queue::Queue;
use crate::queue::WorkerGuard;
use crate::rolling::RollingWriter;
use crate::route::Router;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// A handle to a running access log pipeline.
///
/// Cloning is cheap; clones feed the same queue and writer. Created with
/// [`AccessLog::builder`].
#[derive(Clone, Debug)]
pub struct AccessLog {
    pub(crate) inner: Arc<Inner>,
}

#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) queue: Queue,
    pub(crate) layout: LineLayout,
    pub(crate) capture_bodies: bool,
    pub(crate) skipper: Option<Skipper>,
    pub(crate) clock: Clock,
}

impl AccessLog {
    /// Creates a new [`AccessLogBuilder`] with default options.
    #[must_use]
    pub fn builder() -> AccessLogBuilder {
        AccessLogBuilder::new()
    }

    /// Whether the writer has stopped, after a shutdown or a fatal I/O error.
    ///
    /// A closed pipeline stays closed; requests then pass through unlogged.
    pub fn is_closed(&self) -> bool {
        self.inner.queue.is_closed()
    }

    /// Queues a record for the writer.
    ///
    /// Blocks while the queue is full. Returns `false`, submitting nothing, once the pipeline is
    /// closed.
    pub fn submit(&self, record: LogRecord) -> bool {
        self.inner.queue.send(record)
    }
}

/// A builder for configuring an [`AccessLog`].
#[must_use = "call `build` to start the access log"]
#[derive(Debug)]
pub struct AccessLogBuilder {
    config: Config,
    skipper: Option<Skipper>,
    clock: Clock,
    trap: Box<dyn Trap>,
    thread_name: String,
}

impl Default for AccessLogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessLogBuilder {
    /// Creates a new [`AccessLogBuilder`] with default options.
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    /// Creates a new [`AccessLogBuilder`] starting from `config`.
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            skipper: None,
            clock: Clock::System,
            trap: Box::new(DefaultTrap::default()),
            thread_name: "apilog-writer".to_string(),
        }
    }

    /// Sets the root directory of log and archive files. Defaults to `apilog`.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    /// Enables logging of request and response bodies.
    pub fn capture_bodies(mut self, capture: bool) -> Self {
        self.config.capture_bodies = capture;
        self
    }

    /// Sets how many days archives are kept. Defaults to 7.
    pub fn retention_days(mut self, days: u32) -> Self {
        self.config.retention_days = days;
        self
    }

    /// Sets how many records may wait for the writer before producers block. Defaults to 1024.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Sets the body length at or above which bodies are omitted. Defaults to 10 KiB.
    pub fn max_body_len(mut self, len: usize) -> Self {
        self.config.max_body_len = len;
        self
    }

    /// Sets the path prefixes logged into their own subfolders.
    pub fn separate_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.separate_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the [`RequestContext`](crate::RequestContext) keys appended to each line.
    pub fn context_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.context_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the request header keys appended to each line.
    pub fn header_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.header_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the predicate for requests that are not logged.
    pub fn skipper(mut self, skipper: Skipper) -> Self {
        self.skipper = Some(skipper);
        self
    }

    /// Sets the clock for timestamps and rotation.
    pub fn clock(mut self, clock: impl Into<Clock>) -> Self {
        self.clock = clock.into();
        self
    }

    /// Sets the sink for writer errors. Defaults to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Overrides the writer thread's name. Defaults to `apilog-writer`.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Creates the log directory and starts the writer thread.
    ///
    /// The writer runs until the returned [`WorkerGuard`] is dropped.
    pub fn build(self) -> anyhow::Result<(AccessLog, WorkerGuard)> {
        let Self {
            config,
            skipper,
            clock,
            trap,
            thread_name,
        } = self;
        let Config {
            log_dir,
            capture_bodies,
            retention_days,
            queue_capacity,
            max_body_len,
            separate_prefixes,
            context_keys,
            header_keys,
        } = config.normalized();

        fs::create_dir_all(&log_dir)
            .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

        let router = Router::new(log_dir, separate_prefixes);
        let writer = RollingWriter::new(router, clock.clone(), retention_days);
        let (queue, guard) = Queue::spawn(writer, queue_capacity, thread_name, trap);

        let inner = Inner {
            queue,
            layout: LineLayout::new(context_keys, header_keys, max_body_len),
            capture_bodies,
            skipper,
            clock,
        };
        let access_log = AccessLog {
            inner: Arc::new(inner),
        };
        Ok((access_log, guard))
    }
}
