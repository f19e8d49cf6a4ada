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

use http::HeaderMap;
use http::Method;
use http::StatusCode;
use http::header::USER_AGENT;
use jiff::Zoned;

use crate::context::RequestContext;

/// The parts of a finished exchange that make up one record.
#[derive(Debug)]
pub(crate) struct Exchange<'a> {
    pub(crate) time: &'a Zoned,
    pub(crate) status: StatusCode,
    pub(crate) method: &'a Method,
    pub(crate) request_uri: &'a str,
    pub(crate) headers: &'a HeaderMap,
    pub(crate) context: Option<&'a RequestContext>,
    pub(crate) request_body: Option<&'a [u8]>,
    pub(crate) response_body: Option<&'a [u8]>,
}

/// Formats records as tab separated lines, optionally followed by body lines.
///
/// ```text
/// 2024-08-10T12:00:00+08:00	200	POST	/api/users?x=1	user_id:42	curl/8.0
/// r: {"name":"foo"}
/// w: {"id":1}
/// ```
#[derive(Debug, Clone, Default)]
pub(crate) struct LineLayout {
    context_keys: Vec<String>,
    header_keys: Vec<String>,
    max_body_len: usize,
}

impl LineLayout {
    pub(crate) fn new(
        context_keys: Vec<String>,
        header_keys: Vec<String>,
        max_body_len: usize,
    ) -> Self {
        Self {
            context_keys,
            header_keys,
            max_body_len,
        }
    }

    pub(crate) fn max_body_len(&self) -> usize {
        self.max_body_len
    }

    pub(crate) fn format(&self, exchange: &Exchange) -> Vec<u8> {
        let mut line = format!(
            "{}\t{}\t{}\t{}",
            exchange.time.strftime("%Y-%m-%dT%H:%M:%S%:z"),
            exchange.status.as_u16(),
            exchange.method,
            exchange.request_uri,
        );

        if let Some(context) = exchange.context {
            for key in &self.context_keys {
                match context.get(key) {
                    Some(value) if !value.is_empty() => push_kv(&mut line, key, value),
                    _ => {}
                }
            }
        }
        for key in &self.header_keys {
            let value = exchange
                .headers
                .get(key.as_str())
                .and_then(|value| value.to_str().ok());
            match value {
                Some(value) if !value.is_empty() => push_kv(&mut line, key, value),
                _ => {}
            }
        }

        let user_agent = exchange
            .headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        line.push('\t');
        line.push_str(user_agent);
        line.push('\n');

        let mut bytes = line.into_bytes();
        self.push_body(&mut bytes, "r: ", exchange.request_body);
        self.push_body(&mut bytes, "w: ", exchange.response_body);
        bytes
    }

    fn push_body(&self, bytes: &mut Vec<u8>, tag: &str, body: Option<&[u8]>) {
        if let Some(body) = body {
            if body.len() < self.max_body_len {
                bytes.extend_from_slice(tag.as_bytes());
                bytes.extend_from_slice(body);
                bytes.push(b'\n');
            }
        }
    }
}

fn push_kv(line: &mut String, key: &str, value: &str) {
    line.push('\t');
    line.push_str(key);
    line.push(':');
    line.push_str(value);
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use http::HeaderValue;

    use super::*;

    fn time() -> Zoned {
        Zoned::from_str("2024-08-10T12:30:05+08:00[+08:00]").unwrap()
    }

    #[test]
    fn test_format_minimal_line() {
        let time = time();
        let headers = HeaderMap::new();
        let exchange = Exchange {
            time: &time,
            status: StatusCode::NOT_FOUND,
            method: &Method::GET,
            request_uri: "/missing?q=1",
            headers: &headers,
            context: None,
            request_body: None,
            response_body: None,
        };

        let bytes = LineLayout::new(vec![], vec![], 10).format(&exchange);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "2024-08-10T12:30:05+08:00\t404\tGET\t/missing?q=1\t\n"
        );
    }

    #[test]
    fn test_format_keys_and_bodies() {
        let time = time();
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8.0"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        headers.insert("x-empty", HeaderValue::from_static(""));
        headers.insert("x-binary", HeaderValue::from_bytes(b"\xff\xfe").unwrap());
        let context = RequestContext::new().with("user_id", 42).with("blank", "");

        let exchange = Exchange {
            time: &time,
            status: StatusCode::OK,
            method: &Method::POST,
            request_uri: "/api/users",
            headers: &headers,
            context: Some(&context),
            request_body: Some(br#"{"name":"foo"}"#),
            response_body: Some(b"0123456789"),
        };

        let layout = LineLayout::new(
            vec!["user_id".to_string(), "blank".to_string(), "missing".to_string()],
            vec![
                "X-Request-Id".to_string(),
                "x-empty".to_string(),
                "x-binary".to_string(),
            ],
            16,
        );
        let bytes = layout.format(&exchange);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            concat!(
                "2024-08-10T12:30:05+08:00\t200\tPOST\t/api/users\tuser_id:42\tX-Request-Id:abc\tcurl/8.0\n",
                "r: {\"name\":\"foo\"}\n",
                "w: 0123456789\n",
            )
        );
    }

    #[test]
    fn test_format_omits_oversized_bodies() {
        let time = time();
        let headers = HeaderMap::new();
        let exchange = Exchange {
            time: &time,
            status: StatusCode::OK,
            method: &Method::PUT,
            request_uri: "/upload",
            headers: &headers,
            context: None,
            request_body: Some(b"0123456789"),
            response_body: Some(b""),
        };

        let bytes = LineLayout::new(vec![], vec![], 10).format(&exchange);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "2024-08-10T12:30:05+08:00\t200\tPUT\t/upload\t\nw: \n"
        );
    }
}
