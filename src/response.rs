// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应模块
//!
//! `Response` 只描述响应本身：状态行、标头和响应体。
//! 状态与标头由各处理器计算，序列化与发送由 [`Response::write_to`] 完成。
//! 大文件以 [`Body::Stream`] 的形式持有打开的句柄，发送完最后一块后才释放。

use std::fmt;
use std::io::{self, Read};

use bytes::Bytes;
use chrono::prelude::*;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{param::*, util::format_http_date};

/// 响应体
pub enum Body {
    Empty,
    Bytes(Bytes),
    /// 流式响应体，持有后端句柄
    Stream(Box<dyn Read + Send>),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Body::Stream(_) => f.write_str("Stream"),
        }
    }
}

#[derive(Debug)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    headers: Vec<(String, String)>,
    content_length: Option<u64>,
    date: DateTime<Utc>,
    server_name: String,
    body: Body,
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
            headers: Vec::new(),
            content_length: Some(0),
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
            body: Body::Empty,
        }
    }

    /// 只有状态码、没有响应体的响应。
    ///
    /// 1xx、204 与 304 不带 `Content-Length`，其余状态码带 `Content-Length: 0`，
    /// 以便在保持连接时客户端能正确分帧。
    pub fn from_status_code(code: u16) -> Self {
        let mut response = Self::new();
        response.set_code(code);
        response
    }

    /// 纯文本响应，`Content-Length` 取自内容长度
    pub fn from_text(code: u16, text: impl Into<String>) -> Self {
        let mut response = Self::from_status_code(code);
        response.set_header("Content-Type", "text/plain; charset=utf-8");
        response.set_body(Body::Bytes(Bytes::from(text.into())), None);
        response
    }

    pub fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = status_text(code).to_string();
        if !has_entity(code) {
            self.content_length = None;
        } else if self.content_length.is_none() {
            self.content_length = Some(0);
        }
        self
    }

    /// 设置标头，同名标头（大小写不敏感）被替换
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
        self
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self
    }

    /// 设置响应体。`length` 为 `None` 时从内存响应体推算长度；
    /// 流式响应体必须显式给出长度。
    pub fn set_body(&mut self, body: Body, length: Option<u64>) -> &mut Self {
        let length = match (&body, length) {
            (_, Some(length)) => length,
            (Body::Bytes(bytes), None) => bytes.len() as u64,
            _ => 0,
        };
        if has_entity(self.status_code) {
            self.content_length = Some(length);
        }
        self.body = body;
        self
    }

    /// 序列化状态行与标头（含结尾空行）
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}{}",
            self.version, self.status_code, self.information, CRLF
        );
        for (name, value) in &self.headers {
            head.push_str(&[name.as_str(), ": ", value.as_str(), CRLF].concat());
        }
        if let Some(length) = self.content_length {
            head.push_str(&["Content-Length: ", &length.to_string(), CRLF].concat());
        }
        head.push_str(&["Date: ", &format_http_date(&self.date), CRLF].concat());
        head.push_str(&["Server: ", &self.server_name, CRLF].concat());
        head.push_str(CRLF);
        head.into_bytes()
    }

    /// 把响应写入连接。
    ///
    /// `head_only` 为真时只发送标头（HEAD 请求）。流式响应体以 `chunk_size`
    /// 为单位在阻塞线程池中读取，避免阻塞 reactor。
    pub async fn write_to<W>(self, writer: &mut W, head_only: bool, chunk_size: usize) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.head_bytes()).await?;
        let mut sent = 0u64;
        if head_only {
            writer.flush().await?;
            return Ok(sent);
        }
        match self.body {
            Body::Empty => {}
            Body::Bytes(bytes) => {
                writer.write_all(&bytes).await?;
                sent = bytes.len() as u64;
            }
            Body::Stream(mut reader) => {
                let chunk_size = chunk_size.max(1);
                loop {
                    let (returned, buffer, result) = tokio::task::spawn_blocking(move || {
                        let mut buffer = vec![0u8; chunk_size];
                        let result = reader.read(&mut buffer);
                        (reader, buffer, result)
                    })
                    .await
                    .map_err(io::Error::other)?;
                    reader = returned;
                    match result? {
                        0 => break,
                        n => {
                            writer.write_all(&buffer[..n]).await?;
                            sent += n as u64;
                        }
                    }
                }
            }
        }
        writer.flush().await?;
        Ok(sent)
    }

    /// 读出完整的响应体（会消耗流式响应体），测试与进程内调用使用
    pub fn into_body_bytes(self) -> io::Result<Bytes> {
        match self.body {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(bytes) => Ok(bytes),
            Body::Stream(mut reader) => {
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer)?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.body, Body::Stream(_))
    }
}

fn has_entity(code: u16) -> bool {
    !(code < 200 || code == 204 || code == 304)
}
