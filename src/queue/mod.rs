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

//! The bounded hand-off between request handlers and the single writer thread.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use crossbeam_channel::bounded;

use crate::LogRecord;
use crate::rolling::RollingWriter;
use crate::trap::Trap;

mod worker;

use self::worker::Worker;

#[derive(Debug)]
pub(crate) enum Message {
    Record(LogRecord),
    Shutdown,
}

/// The producer side of the queue. Clones share the channel and the closed flag.
#[derive(Clone, Debug)]
pub(crate) struct Queue {
    sender: Sender<Message>,
    closed: Arc<AtomicBool>,
}

impl Queue {
    /// Spawns the writer thread and returns the queue feeding it.
    pub(crate) fn spawn(
        writer: RollingWriter,
        capacity: usize,
        thread_name: String,
        trap: Box<dyn Trap>,
    ) -> (Queue, WorkerGuard) {
        let (sender, receiver) = bounded(capacity);
        let closed = Arc::new(AtomicBool::new(false));

        let worker = Worker::new(writer, receiver, closed.clone(), trap);
        let handle = worker.make_thread(thread_name);

        let queue = Queue {
            sender: sender.clone(),
            closed,
        };
        (queue, WorkerGuard::new(handle, sender))
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Blocks while the queue is full. Returns `false` if the writer is gone.
    pub(crate) fn send(&self, record: LogRecord) -> bool {
        if self.is_closed() {
            return false;
        }
        self.sender.send(Message::Record(record)).is_ok()
    }
}

/// Stops the writer thread when dropped.
///
/// Dropping the guard queues a shutdown behind every record already submitted and waits for the
/// writer to write and flush them. Keep it alive as long as requests are served.
#[must_use = "dropping the guard shuts the access log down"]
#[derive(Debug)]
pub struct WorkerGuard {
    handle: Option<JoinHandle<()>>,
    sender: Sender<Message>,
}

impl WorkerGuard {
    fn new(handle: JoinHandle<()>, sender: Sender<Message>) -> Self {
        WorkerGuard {
            handle: Some(handle),
            sender,
        }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        // A send error means the writer already stopped on its own.
        let _ = self.sender.send(Message::Shutdown);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("access log writer thread panicked");
            }
        }
    }
}
