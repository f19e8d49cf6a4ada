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

use std::fmt::Debug;

use http::HeaderMap;
use http::Request;
use http::header::CONTENT_TYPE;
use mime_guess::mime;

use crate::interceptor::Body;

/// A per-request predicate; requests it returns `true` for are not logged.
pub struct Skipper {
    f: Box<dyn Fn(&Request<Body>) -> bool + Send + Sync + 'static>,
}

impl Debug for Skipper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Skipper {{ ... }}")
    }
}

impl Skipper {
    /// Creates a new [`Skipper`] from a predicate.
    pub fn new(skip: impl Fn(&Request<Body>) -> bool + Send + Sync + 'static) -> Self {
        Skipper { f: Box::new(skip) }
    }

    pub(crate) fn skip(&self, request: &Request<Body>) -> bool {
        (self.f)(request)
    }
}

/// Whether the request body is captured, judged by the request's Content-Type.
///
/// Textual payloads are captured. So are requests that declare no content type at all.
pub(crate) fn capture_request_body(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return true;
    };
    let Ok(value) = value.to_str() else {
        return false;
    };
    let essence = value.split(';').next().unwrap_or_default().trim();
    if essence.is_empty() {
        return true;
    }

    let essence = essence.to_ascii_lowercase();
    essence.starts_with("text/")
        || essence == "application/json"
        || essence == "application/x-www-form-urlencoded"
}

/// Whether the response body is captured, judged by the content type inferred from the
/// extension of the request path.
///
/// Paths without an extension are captured; extensions with an unknown or binary content type
/// are not.
pub(crate) fn capture_response_body(path: &str) -> bool {
    let filename = path.rsplit('/').next().unwrap_or_default();
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return true;
    };

    // any textual candidate counts; some extensions list a binary type first
    mime_guess::from_ext(ext)
        .iter()
        .any(|m| m.type_() == mime::TEXT || m.essence_str() == "application/json")
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_request_body_capture_by_content_type() {
        assert!(capture_request_body(&HeaderMap::new()));
        assert!(capture_request_body(&headers("application/json")));
        assert!(capture_request_body(&headers("application/json; charset=utf-8")));
        assert!(capture_request_body(&headers("text/plain")));
        assert!(capture_request_body(&headers("Text/HTML;charset=utf-8")));
        assert!(capture_request_body(&headers(
            "application/x-www-form-urlencoded"
        )));

        assert!(!capture_request_body(&headers("image/png")));
        assert!(!capture_request_body(&headers("multipart/form-data; boundary=x")));
        assert!(!capture_request_body(&headers("application/octet-stream")));
    }

    #[test]
    fn test_response_body_capture_by_extension() {
        assert!(capture_response_body("/api/users"));
        assert!(capture_response_body("/"));
        assert!(capture_response_body("/static/index.html"));
        assert!(capture_response_body("/static/readme.txt"));
        assert!(capture_response_body("/data/users.json"));
        assert!(capture_response_body("/export/report.csv"));
        assert!(capture_response_body("/static/style.css"));

        assert!(!capture_response_body("/static/logo.png"));
        assert!(!capture_response_body("/download/archive.zip"));
        assert!(!capture_response_body("/files/blob.unknownext"));
    }

    #[test]
    fn test_skipper() {
        let skipper = Skipper::new(|req| req.uri().path() == "/health");
        let health = Request::builder()
            .uri("/health")
            .body(Box::new(std::io::empty()) as Body)
            .unwrap();
        let orders = Request::builder()
            .uri("/orders")
            .body(Box::new(std::io::empty()) as Body)
            .unwrap();
        assert!(skipper.skip(&health));
        assert!(!skipper.skip(&orders));
    }
}
