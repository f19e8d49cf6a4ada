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

//! Apilog records every request a server handles into plain, append-only access log files.
//!
//! # Overview
//!
//! Request handlers hand formatted records to a bounded queue; a single writer thread appends
//! them to `access.log` files, compresses each file into `access.log-<YYYY_MM_DD>.gz` when the
//! day changes, and deletes archives older than the retention window. When the queue is full,
//! handlers block until the writer catches up. If the writer fails, the pipeline closes and
//! requests are served unlogged.
//!
//! Each record is one tab separated line, optionally followed by the request and response
//! bodies:
//!
//! ```text
//! 2024-08-10T12:00:00+08:00	200	POST	/api/users	user_id:42	curl/8.0
//! r: {"name":"foo"}
//! w: {"id":1}
//! ```
//!
//! # Examples
//!
//! ```
//! use std::io::Write;
//!
//! use apilog::AccessLog;
//! use apilog::Body;
//! use apilog::BufferedResponse;
//! use apilog::Handler;
//! use apilog::ResponseWriter;
//! use apilog::handler_fn;
//! use http::Request;
//! use http::StatusCode;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let (access_log, guard) = AccessLog::builder()
//!     .log_dir(dir.path())
//!     .capture_bodies(true)
//!     .header_keys(["X-Request-Id"])
//!     .build()
//!     .unwrap();
//!
//! let handler = access_log.wrap(handler_fn(
//!     |w: &mut dyn ResponseWriter, _: &mut Request<Body>| {
//!         w.write_status(StatusCode::CREATED);
//!         w.write_all(br#"{"id":1}"#).unwrap();
//!     },
//! ));
//!
//! let mut request = Request::builder()
//!     .method("POST")
//!     .uri("/api/users")
//!     .header("X-Request-Id", "abc")
//!     .body(Box::new(&br#"{"name":"foo"}"#[..]) as Body)
//!     .unwrap();
//! let mut response = BufferedResponse::new();
//! handler.serve(&mut response, &mut request);
//! assert_eq!(response.status(), StatusCode::CREATED);
//!
//! // flushes pending records and stops the writer
//! drop(guard);
//!
//! let log = std::fs::read_to_string(dir.path().join("access.log")).unwrap();
//! assert!(log.contains("\t201\tPOST\t/api/users\tX-Request-Id:abc\t"));
//! assert!(log.contains("r: {\"name\":\"foo\"}\nw: {\"id\":1}\n"));
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod access_log;
mod clock;
mod config;
mod context;
mod filter;
mod interceptor;
mod layout;
mod queue;
mod record;
mod rolling;
mod route;
pub mod trap;

pub use self::access_log::AccessLog;
pub use self::access_log::AccessLogBuilder;
pub use self::clock::Clock;
pub use self::clock::ManualClock;
pub use self::config::Config;
pub use self::config::DEFAULT_LOG_DIR;
pub use self::config::DEFAULT_MAX_BODY_LEN;
pub use self::config::DEFAULT_QUEUE_CAPACITY;
pub use self::config::DEFAULT_RETENTION_DAYS;
pub use self::context::RequestContext;
pub use self::filter::Skipper;
pub use self::interceptor::Body;
pub use self::interceptor::BufferedResponse;
pub use self::interceptor::Handler;
pub use self::interceptor::HandlerFn;
pub use self::interceptor::Logged;
pub use self::interceptor::ResponseWriter;
pub use self::interceptor::handler_fn;
pub use self::queue::WorkerGuard;
pub use self::record::LogRecord;
pub use self::trap::Trap;
