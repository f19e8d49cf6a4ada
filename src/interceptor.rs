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

//! The interception point between a request dispatcher and the access log.

use std::io;
use std::io::Read;
use std::io::Write;

use bytes::Buf;
use bytes::Bytes;
use http::HeaderMap;
use http::Request;
use http::Response;
use http::StatusCode;

use crate::AccessLog;
use crate::LogRecord;
use crate::context::RequestContext;
use crate::filter::capture_request_body;
use crate::filter::capture_response_body;
use crate::layout::Exchange;

/// A readable request body stream.
pub type Body = Box<dyn Read + Send>;

/// The sink a handler writes its response to.
pub trait ResponseWriter: Write {
    /// The response headers; changes after the first body write may be ignored by the sink.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sets the response status. Only the first call takes effect.
    fn write_status(&mut self, status: StatusCode);
}

/// Serves one request.
pub trait Handler: Send + Sync {
    /// Writes the response for `req` to `w`.
    fn serve(&self, w: &mut dyn ResponseWriter, req: &mut Request<Body>);
}

/// A [`Handler`] made from a closure. Created with [`handler_fn`].
#[derive(Debug, Clone, Copy)]
pub struct HandlerFn<F> {
    f: F,
}

/// Creates a [`Handler`] from a closure.
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request<Body>) + Send + Sync,
{
    HandlerFn { f }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request<Body>) + Send + Sync,
{
    fn serve(&self, w: &mut dyn ResponseWriter, req: &mut Request<Body>) {
        (self.f)(w, req)
    }
}

/// A [`Handler`] whose requests are logged. Created with [`AccessLog::wrap`].
#[derive(Debug, Clone)]
pub struct Logged<H> {
    access_log: AccessLog,
    next: H,
}

impl<H: Handler> Handler for Logged<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &mut Request<Body>) {
        self.access_log
            .handle(w, req, |w, req| self.next.serve(w, req));
    }
}

impl AccessLog {
    /// Wraps `next` so every request it serves is logged.
    pub fn wrap<H: Handler>(&self, next: H) -> Logged<H> {
        Logged {
            access_log: self.clone(),
            next,
        }
    }

    /// Runs `next` for the request and logs the exchange.
    ///
    /// Nothing is logged when the pipeline is closed or the skipper matches the request. With
    /// body capture enabled, the request body is read up front and handed to `next` as an
    /// identical in-memory stream, and writes to the response are mirrored until they reach the
    /// maximum body length. The response seen by the client is unchanged.
    pub fn handle<F>(&self, w: &mut dyn ResponseWriter, req: &mut Request<Body>, next: F)
    where
        F: FnOnce(&mut dyn ResponseWriter, &mut Request<Body>),
    {
        let inner = &self.inner;
        let skip = inner
            .skipper
            .as_ref()
            .is_some_and(|skipper| skipper.skip(req));
        if skip || self.is_closed() {
            next(w, req);
            return;
        }

        let max_body_len = inner.layout.max_body_len();
        let mut request_body = None;
        let mut mirror = None;
        if inner.capture_bodies {
            if capture_request_body(req.headers()) {
                request_body = Some(rewind_body(req));
            }
            if capture_response_body(req.uri().path()) {
                mirror = Some(Mirror::new(max_body_len));
            }
        }

        let mut capture = CaptureWriter::new(w, mirror);
        next(&mut capture, req);
        let (status, response_body) = capture.finish();

        let time = inner.clock.now();
        let request_uri = req.uri().to_string();
        let payload = inner.layout.format(&Exchange {
            time: &time,
            status,
            method: req.method(),
            request_uri: &request_uri,
            headers: req.headers(),
            context: req.extensions().get::<RequestContext>(),
            request_body: request_body.as_deref(),
            response_body: response_body.as_deref(),
        });

        self.submit(LogRecord::new(req.uri().path(), payload));
    }
}

/// Reads the whole request body and puts an identical stream back in its place.
///
/// A read error keeps what was read so far, for both the log and the handler.
fn rewind_body(req: &mut Request<Body>) -> Bytes {
    let mut buf = vec![];
    if let Err(err) = req.body_mut().read_to_end(&mut buf) {
        log::debug!("failed to read request body of {}: {err}", req.uri());
    }

    let bytes = Bytes::from(buf);
    *req.body_mut() = Box::new(bytes.clone().reader());
    bytes
}

/// A copy of the response body, given up once it reaches the limit.
#[derive(Debug)]
struct Mirror {
    buf: Vec<u8>,
    limit: usize,
    overflowed: bool,
}

impl Mirror {
    fn new(limit: usize) -> Self {
        Self {
            buf: vec![],
            limit,
            overflowed: false,
        }
    }

    fn record(&mut self, data: &[u8]) {
        if self.overflowed {
            return;
        }
        if self.buf.len() + data.len() >= self.limit {
            self.overflowed = true;
            self.buf = vec![];
        } else {
            self.buf.extend_from_slice(data);
        }
    }

    fn into_body(self) -> Option<Vec<u8>> {
        (!self.overflowed).then_some(self.buf)
    }
}

/// Forwards to the client's sink, remembering the status and mirroring the body.
struct CaptureWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: Option<StatusCode>,
    mirror: Option<Mirror>,
}

impl<'a> CaptureWriter<'a> {
    fn new(inner: &'a mut dyn ResponseWriter, mirror: Option<Mirror>) -> Self {
        Self {
            inner,
            status: None,
            mirror,
        }
    }

    fn finish(self) -> (StatusCode, Option<Vec<u8>>) {
        let status = self.status.unwrap_or(StatusCode::OK);
        (status, self.mirror.and_then(Mirror::into_body))
    }
}

impl Write for CaptureWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.record(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ResponseWriter for CaptureWriter<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
        self.inner.write_status(status);
    }
}

/// An in-memory [`ResponseWriter`], convertible into an [`http::Response`].
///
/// Writing body bytes before a status implies `200 OK`.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl BufferedResponse {
    /// Creates an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// The response status, `200 OK` if none was written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The body written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts into an [`http::Response`].
    pub fn into_response(self) -> Response<Vec<u8>> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl Write for BufferedResponse {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseWriter for BufferedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
    }
}
