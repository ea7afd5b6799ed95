// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 负责将从 TCP 流中读取的请求头（请求行 + 标头，不含请求体）解析为强类型的 `Request` 结构体：
//! 1. 请求行（Request-Line）的解析（方法、目标、版本）。
//! 2. 标头（Headers）的提取，字段名大小写不敏感。
//! 3. 请求体的分帧信息（`Content-Length` / `Transfer-Encoding: chunked`）与连接保持策略。
//!
//! 请求体本身由 [`connection`](crate::connection) 模块读取。

use std::net::SocketAddr;

use crate::{exception::Exception, param::*, path::url_path};

/// 表示一个 HTTP 请求的元数据。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法
    method: HttpRequestMethod,
    /// 原始请求目标（含查询字符串），404 响应会原样回显
    target: String,
    /// 解码后的路径部分
    path: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 全部标头，保持接收顺序
    headers: Vec<(String, String)>,
    /// 请求体长度
    content_length: Option<u64>,
    /// 请求体是否使用分块传输编码
    chunked: bool,
    /// 处理完本请求后是否保持连接
    keep_alive: bool,
    /// 客户端地址
    peer: Option<SocketAddr>,
}

impl Request {
    /// 从请求头字节构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：确保请求头是合法的 UTF-8 字符串。
    /// 2. 解析请求行：提取方法、目标和协议版本。
    /// 3. 逐行解析标头，并据此确定请求体分帧方式与连接保持策略。
    ///
    /// # 参数
    /// * `buffer` - 请求头的原始字节，可以包含也可以不包含结尾的空行。
    pub fn try_from(buffer: &[u8]) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string,
            Err(_) => return Err(Exception::RequestIsNotUtf8),
        };

        let mut lines = request_string.split(CRLF);
        let request_line = lines.next().unwrap_or_default();

        // 请求行 (e.g., "PUT /dav/a.txt HTTP/1.1")
        let parts: Vec<&str> = request_line.split(' ').filter(|p| !p.is_empty()).collect();
        if parts.len() != 3 {
            return Err(Exception::MalformedRequest);
        }

        let method: HttpRequestMethod = parts[0]
            .parse()
            .map_err(|_| Exception::UnSupportedRequestMethod)?;

        let version = match parts[2].to_uppercase().as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            _ => return Err(Exception::UnsupportedHttpVersion),
        };

        let target = parts[1].to_string();
        let path = url_path(&target)?;

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        let mut request = Self {
            method,
            target,
            path,
            version,
            headers,
            content_length: None,
            chunked: false,
            keep_alive: version == HttpVersion::V1_1,
            peer: None,
        };
        request.apply_framing()?;
        Ok(request)
    }

    /// 直接构造请求，主要用于测试与内部调用。
    pub fn new(method: HttpRequestMethod, target: &str) -> Result<Self, Exception> {
        Ok(Self {
            method,
            target: target.to_string(),
            path: url_path(target)?,
            version: HttpVersion::V1_1,
            headers: Vec::new(),
            content_length: None,
            chunked: false,
            keep_alive: true,
            peer: None,
        })
    }

    /// 追加一个标头并重新计算分帧信息
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, Exception> {
        self.headers.push((name.to_string(), value.to_string()));
        self.apply_framing()?;
        Ok(self)
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    fn apply_framing(&mut self) -> Result<(), Exception> {
        self.content_length = match self.header("content-length") {
            Some(v) => Some(v.parse::<u64>().map_err(|_| Exception::MalformedRequest)?),
            None => None,
        };
        self.chunked = self
            .header("transfer-encoding")
            .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
        if let Some(connection) = self.header("connection") {
            let connection = connection.to_ascii_lowercase();
            if connection.contains("close") {
                self.keep_alive = false;
            } else if connection.contains("keep-alive") {
                self.keep_alive = true;
            }
        }
        Ok(())
    }
}

// --- Getter 访问器实现 ---

impl Request {
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 原始请求目标（含查询参数）
    pub fn target(&self) -> &str {
        &self.target
    }

    /// 解码后的 URL 路径
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// 大小写不敏感的标头查询，同名标头取第一个
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or("")
    }

    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 验证常规 GET 请求的解析，包括 Path 和 Headers
    #[test]
    fn test_parse_get_request() {
        let request_str =
            "GET /dav/a.txt HTTP/1.1\r\nHost: localhost:7878\r\nUser-Agent: Test-Browser\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes()).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Get);
        assert_eq!(request.path(), "/dav/a.txt");
        assert_eq!(request.user_agent(), "Test-Browser");
        assert_eq!(request.header("host"), Some("localhost:7878"));
        assert!(request.keep_alive());
        assert_eq!(request.content_length(), None);
    }

    /// 验证 PUT 请求的 Content-Length
    #[test]
    fn test_parse_put_request() {
        let request_str = "PUT /a.txt HTTP/1.1\r\nContent-Length: 10\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes()).unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Put);
        assert_eq!(request.content_length(), Some(10));
        assert!(!request.is_chunked());
    }

    #[test]
    fn test_parse_chunked_request() {
        let request_str = "PUT /a.txt HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes()).unwrap();
        assert!(request.is_chunked());
    }

    #[test]
    fn test_invalid_content_length() {
        let request_str = "PUT /a.txt HTTP/1.1\r\nContent-Length: ten\r\n\r\n";
        let result = Request::try_from(request_str.as_bytes());
        assert_eq!(result.unwrap_err(), Exception::MalformedRequest);
    }

    /// WebDAV 方法可以被识别，是否处理由路由决定
    #[test]
    fn test_parse_webdav_method() {
        let request_str = "PROPFIND /dav/ HTTP/1.1\r\nDepth: 1\r\n\r\n";
        let request = Request::try_from(request_str.as_bytes()).unwrap();
        assert_eq!(request.method(), HttpRequestMethod::Propfind);
    }

    #[test]
    fn test_unknown_method() {
        let request_str = "BREW /pot HTTP/1.1\r\n\r\n";
        let result = Request::try_from(request_str.as_bytes());
        assert_eq!(result.unwrap_err(), Exception::UnSupportedRequestMethod);
    }

    /// 确保不支持的版本（如 HTTP/2.0）被正确拒绝
    #[test]
    fn test_unsupported_http_version() {
        let request_str = "GET / HTTP/2.0\r\nHost: localhost:7878\r\n\r\n";
        let result = Request::try_from(request_str.as_bytes());
        assert_eq!(result.unwrap_err(), Exception::UnsupportedHttpVersion);
    }

    #[test]
    fn test_http_1_0_closes_by_default() {
        let request = Request::try_from(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(!request.keep_alive());
        let request =
            Request::try_from(b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n").unwrap();
        assert!(request.keep_alive());
    }

    #[test]
    fn test_connection_close() {
        let request = Request::try_from(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!request.keep_alive());
    }

    /// 验证 UTF-8 编码检查
    #[test]
    fn test_invalid_utf8() {
        let buffer = vec![0xFF, 0xFE, 0xFD];
        let result = Request::try_from(&buffer);
        assert_eq!(result.unwrap_err(), Exception::RequestIsNotUtf8);
    }

    #[test]
    fn test_malformed_request_line() {
        let result = Request::try_from(b"GET\r\n\r\n");
        assert_eq!(result.unwrap_err(), Exception::MalformedRequest);
    }

    /// 确保带查询参数的目标能完整保留，路径部分被解码
    #[test]
    fn test_target_with_query_string() {
        let request =
            Request::try_from(b"GET /my%20file.txt?id=123 HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(request.target(), "/my%20file.txt?id=123");
        assert_eq!(request.path(), "/my file.txt");
    }

    #[test]
    fn test_invalid_percent_encoding() {
        let result = Request::try_from(b"GET /%FF%FE HTTP/1.1\r\n\r\n");
        assert_eq!(result.unwrap_err(), Exception::InvalidPath);
    }

    /// 验证请求方法的小写兼容性处理
    #[test]
    fn test_lowercase_method() {
        let request = Request::try_from(b"get / HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(request.method(), HttpRequestMethod::Get);
    }

    #[test]
    fn test_builder() {
        let request = Request::new(HttpRequestMethod::Get, "/x")
            .unwrap()
            .with_header("If-Modified-Since", "Sun, 06 Nov 1994 08:49:37 GMT")
            .unwrap();
        assert_eq!(request.header("if-modified-since"), Some("Sun, 06 Nov 1994 08:49:37 GMT"));
    }
}
