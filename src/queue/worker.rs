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
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use crossbeam_channel::RecvError;
use crossbeam_channel::TryRecvError;

use super::Message;
use crate::rolling::RollingWriter;
use crate::trap::Trap;

pub(crate) struct Worker {
    writer: RollingWriter,
    receiver: Receiver<Message>,
    closed: Arc<AtomicBool>,
    trap: Box<dyn Trap>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum WorkerState {
    Empty,
    Disconnected,
    Continue,
    Shutdown,
}

impl Worker {
    pub(crate) fn new(
        writer: RollingWriter,
        receiver: Receiver<Message>,
        closed: Arc<AtomicBool>,
        trap: Box<dyn Trap>,
    ) -> Worker {
        Self {
            writer,
            receiver,
            closed,
            trap,
        }
    }

    fn recv(&mut self) -> anyhow::Result<WorkerState> {
        match self.receiver.recv() {
            Ok(Message::Record(record)) => {
                self.writer.write(&record)?;
                Ok(WorkerState::Continue)
            }
            Ok(Message::Shutdown) => Ok(WorkerState::Shutdown),
            Err(RecvError) => Ok(WorkerState::Disconnected),
        }
    }

    fn try_recv(&mut self) -> anyhow::Result<WorkerState> {
        match self.receiver.try_recv() {
            Ok(Message::Record(record)) => {
                self.writer.write(&record)?;
                Ok(WorkerState::Continue)
            }
            Ok(Message::Shutdown) => Ok(WorkerState::Shutdown),
            Err(TryRecvError::Empty) => Ok(WorkerState::Empty),
            Err(TryRecvError::Disconnected) => Ok(WorkerState::Disconnected),
        }
    }

    /// Drains the queue until it is empty, then flushes the open files.
    pub(crate) fn work(&mut self) -> anyhow::Result<WorkerState> {
        let mut worker_state = self.recv()?;

        while worker_state == WorkerState::Continue {
            worker_state = self.try_recv()?;
        }

        self.writer.flush()?;
        Ok(worker_state)
    }

    /// Runs the worker until shutdown or the first error.
    ///
    /// The closed flag is raised before the receiver is dropped, so producers observe a closed
    /// pipeline before their sends start to fail.
    pub(crate) fn make_thread(mut self, name: String) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name(name)
            .spawn(move || {
                loop {
                    match self.work() {
                        Ok(WorkerState::Continue) | Ok(WorkerState::Empty) => {}
                        Ok(WorkerState::Shutdown) | Ok(WorkerState::Disconnected) => break,
                        Err(err) => {
                            self.closed.store(true, Ordering::Release);
                            self.trap.trap(&err);
                            break;
                        }
                    }
                }
                self.closed.store(true, Ordering::Release);
                if let Err(err) = self.writer.flush() {
                    self.trap.trap(&err);
                }
            })
            .expect("failed to spawn the access log writer thread")
    }
}
