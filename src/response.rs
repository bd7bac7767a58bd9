use crate::param::*;

use bytes::Bytes;
use chrono::prelude::*;
use log::warn;

/// 处理函数写入的响应对象，最终由传输层序列化为 HTTP/1.1 报文。
#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    headers: Vec<(String, String)>,
    date: DateTime<Utc>,
    server_name: String,
    content: Option<Bytes>,
    ended: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            headers: vec![],
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
            content: None,
            ended: false,
        }
    }

    /// 设置状态码，原因短语取自 `STATUS_CODES`
    pub fn status(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&info) => info.to_string(),
            None => {
                warn!("未登记的状态码：{}", code);
                "Unknown".to_string()
            }
        };
        self
    }

    /// 设置响应头；同名字段（大小写不敏感）会被覆盖
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
        self
    }

    /// 写入响应体并结束响应
    pub fn send(&mut self, body: impl Into<Bytes>) {
        if self.header("content-type").is_none() {
            self.set_header("Content-Type", "text/plain;charset=utf-8");
        }
        self.content = Some(body.into());
        self.ended = true;
    }

    /// 以 JSON 格式写入响应体并结束响应
    pub fn json(&mut self, value: &serde_json::Value) {
        self.set_header("Content-Type", "application/json");
        self.send(value.to_string());
    }

    /// 不带响应体地结束响应
    pub fn end(&mut self) {
        self.content = None;
        self.ended = true;
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let version: &str = match self.version {
            HttpVersion::V1_1 => "HTTP/1.1",
        };
        let content: &[u8] = match &self.content {
            Some(c) => c,
            None => b"",
        };
        let status_code: &str = &self.status_code.to_string();
        let information: &str = &self.information;
        let content_length: &str = &content.len().to_string();
        let date: &str = &format_date(&self.date);
        let server: &str = &self.server_name;

        let mut header = [
            version,
            " ",
            status_code,
            " ",
            information,
            CRLF,
            "Content-Length: ",
            content_length,
            CRLF,
            "Date: ",
            date,
            CRLF,
            "Server: ",
            server,
            CRLF,
        ]
        .concat();
        for (name, value) in &self.headers {
            header.push_str(&[name.as_str(), ": ", value.as_str(), CRLF].concat());
        }
        header.push_str(CRLF);

        [header.as_bytes(), content].concat()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_new() {
        let response = Response::new();

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.information(), "OK");
        assert!(!response.is_ended());
        assert!(response.content().is_none());
    }

    #[test]
    fn test_response_as_bytes_basic() {
        let response = Response::new();
        let bytes = response.as_bytes();
        let response_str = String::from_utf8_lossy(&bytes);

        assert!(response_str.starts_with("HTTP/1.1 200 OK"));
        assert!(response_str.contains("Content-Length: 0"));
        assert!(response_str.contains("Server: shaneyale-webrouter"));
        assert!(response_str.contains("Date: "));
        assert!(response_str.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_response_send() {
        let mut response = Response::new();
        response.send("Hello");

        let bytes = response.as_bytes();
        let response_str = String::from_utf8_lossy(&bytes);

        assert!(response.is_ended());
        assert!(response_str.contains("Content-Type: text/plain;charset=utf-8"));
        assert!(response_str.contains("Content-Length: 5"));
        assert!(response_str.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn test_response_json() {
        let mut response = Response::new();
        response.status(201).json(&json!({ "id": "42" }));

        assert_eq!(response.status_code(), 201);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.content(), Some(&Bytes::from(r#"{"id":"42"}"#)));
    }

    #[test]
    fn test_response_end_has_empty_body() {
        let mut response = Response::new();
        response.status(404).end();

        let bytes = response.as_bytes();
        let response_str = String::from_utf8_lossy(&bytes);

        assert!(response.is_ended());
        assert!(response_str.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response_str.contains("Content-Length: 0"));
        assert!(response_str.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_response_status_code_various() {
        for (code, expected_info) in [
            (200, "OK"),
            (201, "Created"),
            (204, "No Content"),
            (301, "Moved Permanently"),
            (400, "Bad Request"),
            (401, "Unauthorized"),
            (403, "Forbidden"),
            (404, "Not Found"),
            (500, "Internal Server Error"),
        ] {
            let mut response = Response::new();
            response.status(code);
            assert_eq!(response.status_code(), code);
            assert_eq!(response.information(), expected_info);
        }
    }

    #[test]
    fn test_response_unknown_status_code() {
        let mut response = Response::new();
        response.status(599);
        assert_eq!(response.status_code(), 599);
        assert_eq!(response.information(), "Unknown");
    }

    #[test]
    fn test_set_header_overwrites_case_insensitively() {
        let mut response = Response::new();
        response.set_header("X-Trace", "a").set_header("x-trace", "b");

        let bytes = response.as_bytes();
        let response_str = String::from_utf8_lossy(&bytes);

        assert_eq!(response.header("X-TRACE"), Some("b"));
        assert_eq!(response_str.matches("X-Trace: ").count(), 1);
    }
}
