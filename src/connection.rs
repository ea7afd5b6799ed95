// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接处理
//!
//! 负责单个 TCP 流的生命周期：读取请求头、按 `Content-Length` 或分块编码转发请求体、
//! 调用 [`DavServer`] 并发送响应。同一连接上的请求按顺序处理（keep-alive）。
//!
//! 存储操作是阻塞 I/O，因此 [`DavServer::handle`] 运行在 `spawn_blocking` 线程中，
//! 请求体通过有界通道一块一块地交给它。客户端提前断开时，处理器读到的是
//! `UnexpectedEof` 错误，PUT 因此返回 409，已写入的部分保留在磁盘上。

use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    dav_debug, dav_error, dav_info, dav_warn,
    exception::Exception,
    param::HttpRequestMethod,
    request::Request,
    response::Response,
    server::DavServer,
};

// 请求体通道的容量（块数）
const BODY_CHANNEL_DEPTH: usize = 4;

/// 请求体的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyEnd {
    Complete,
    /// 客户端在请求体结束前断开
    Truncated,
    /// 分块编码格式错误
    Malformed,
}

/// 处理器一侧的请求体，从通道中取出连接层转发过来的数据块。
struct ChannelBody {
    rx: mpsc::Receiver<io::Result<Bytes>>,
    current: Bytes,
}

impl Read for ChannelBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.current.is_empty() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => self.current = chunk,
                Some(Err(e)) => return Err(e),
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len());
        let chunk = self.current.split_to(n);
        buf[..n].copy_from_slice(&chunk);
        Ok(n)
    }
}

/// 连接层一侧：处理器不再读取时（例如返回了 403）继续读完请求体并丢弃，保证分帧正确
struct BodySender {
    tx: Option<mpsc::Sender<io::Result<Bytes>>>,
}

impl BodySender {
    async fn deliver(&mut self, item: io::Result<Bytes>) {
        if let Some(tx) = &self.tx {
            if tx.send(item).await.is_err() {
                self.tx = None;
            }
        }
    }
}

/// 为每个连接分配请求 ID 并驱动请求循环。
#[derive(Clone)]
pub struct ConnectionHandler {
    server: Arc<DavServer>,
    chunk_size: usize,
    max_header_size: usize,
    next_id: Arc<AtomicU64>,
}

impl ConnectionHandler {
    pub fn new(server: Arc<DavServer>, chunk_size: usize, max_header_size: usize) -> Self {
        Self {
            server,
            chunk_size: chunk_size.max(1),
            max_header_size: max_header_size.max(1),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(server: Arc<DavServer>, config: &Config) -> Self {
        Self::new(server, config.chunk_size(), config.max_header_size())
    }

    pub fn server(&self) -> &Arc<DavServer> {
        &self.server
    }

    fn next_id(&self) -> u128 {
        self.next_id.fetch_add(1, Ordering::Relaxed) as u128
    }

    /// 处理一个连接直到对端关闭、出错或请求要求关闭连接。
    pub async fn handle<S>(&self, stream: S, peer: Option<SocketAddr>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let log = self.server.log().clone();
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        loop {
            let head = match read_head(&mut reader, self.max_header_size).await {
                Ok(Some(head)) => head,
                Ok(None) => break,
                Err(Exception::HeaderTooLarge) => {
                    dav_warn!(log, "请求头超过{}字节，返回400", self.max_header_size);
                    let _ = write_error(&mut writer, 400).await;
                    break;
                }
                Err(e) => {
                    dav_debug!(log, "读取请求头失败: {}", e);
                    break;
                }
            };

            let id = self.next_id();
            let start_time = Instant::now();
            let mut request = match Request::try_from(&head) {
                Ok(request) => request,
                Err(e) => {
                    dav_warn!(log, "[ID{}]解析HTTP请求失败: {}，返回{}", id, e, e.status_code());
                    let _ = write_error(&mut writer, e.status_code()).await;
                    break;
                }
            };
            if let Some(peer) = peer {
                request = request.with_peer(peer);
            }
            let head_only = request.method() == HttpRequestMethod::Head;
            let mut keep_alive = request.keep_alive();

            // 处理器在阻塞线程中运行，请求体边读边转发
            let (tx, rx) = mpsc::channel(BODY_CHANNEL_DEPTH);
            let server = Arc::clone(&self.server);
            let task_request = request.clone();
            let task = tokio::task::spawn_blocking(move || {
                let mut body = ChannelBody {
                    rx,
                    current: Bytes::new(),
                };
                server.handle(&task_request, &mut body, id)
            });

            let mut sender = BodySender { tx: Some(tx) };
            let body_end = feed_body(&mut reader, &request, &mut sender, self.chunk_size, self.max_header_size).await;
            drop(sender);

            let mut response = match task.await {
                Ok(response) => response,
                Err(e) => {
                    dav_error!(log, "[ID{}]请求处理线程异常退出: {}", id, e);
                    keep_alive = false;
                    Response::from_status_code(500)
                }
            };
            match body_end {
                BodyEnd::Complete => {}
                BodyEnd::Truncated => {
                    dav_warn!(log, "[ID{}]客户端在请求体结束前断开", id);
                    keep_alive = false;
                }
                BodyEnd::Malformed => {
                    dav_warn!(log, "[ID{}]分块编码格式错误，返回400", id);
                    keep_alive = false;
                    response = Response::from_status_code(400);
                }
            }
            if !keep_alive {
                response.set_header("Connection", "close");
            }

            dav_debug!(
                log,
                "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
                id,
                start_time.elapsed().as_millis()
            );
            dav_info!(
                log,
                "[ID{}] {}, {}, {}, {}, {}, {}",
                id,
                request.version(),
                request.path(),
                request.method(),
                response.status_code(),
                response.information(),
                request.user_agent(),
            );

            let declared = response.content_length();
            match response.write_to(&mut writer, head_only, self.chunk_size).await {
                Ok(sent) if !head_only && declared.is_some_and(|length| length != sent) => {
                    // 响应体与 Content-Length 不一致，后续响应无法正确分帧
                    dav_error!(
                        log,
                        "[ID{}]响应体只发送了{}字节，声明为{}字节，关闭连接",
                        id,
                        sent,
                        declared.unwrap_or_default()
                    );
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    dav_debug!(log, "[ID{}]发送响应失败: {}", id, e);
                    break;
                }
            }
            if !keep_alive {
                break;
            }
        }
        let _ = writer.shutdown().await;
    }
}

async fn write_error<W: AsyncWrite + Unpin>(writer: &mut W, code: u16) -> io::Result<u64> {
    let mut response = Response::from_status_code(code);
    response.set_header("Connection", "close");
    response.write_to(writer, false, 1).await
}

/// 读取一行（含结尾的 `\n`），最多 `limit` 字节。
///
/// 对端关闭时返回 `Ok(None)`；超过长度限制返回 [`Exception::HeaderTooLarge`]；
/// 一行读到一半就关闭返回 [`Exception::MalformedRequest`]。
async fn read_line<R>(reader: &mut R, limit: usize, line: &mut Vec<u8>) -> Result<Option<usize>, Exception>
where
    R: AsyncBufRead + Unpin,
{
    let n = match (&mut *reader).take(limit as u64).read_until(b'\n', line).await {
        Ok(n) => n,
        Err(_) => return Err(Exception::MalformedRequest),
    };
    if n == 0 {
        return Ok(None);
    }
    if !line.ends_with(b"\n") {
        if n >= limit {
            return Err(Exception::HeaderTooLarge);
        }
        return Err(Exception::MalformedRequest);
    }
    Ok(Some(n))
}

/// 读取请求头（请求行与标头，直到空行）。请求行之前的空行被忽略。
async fn read_head<R>(reader: &mut R, limit: usize) -> Result<Option<Vec<u8>>, Exception>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = Vec::new();
    loop {
        let remaining = limit.saturating_sub(head.len());
        if remaining == 0 {
            return Err(Exception::HeaderTooLarge);
        }
        let start = head.len();
        match read_line(reader, remaining, &mut head).await? {
            None if head.is_empty() => return Ok(None),
            None => return Err(Exception::MalformedRequest),
            Some(_) => {}
        }
        let line = &head[start..];
        if line == b"\r\n" || line == b"\n" {
            if start == 0 {
                head.clear();
                continue;
            }
            return Ok(Some(head));
        }
    }
}

/// 精确读取 `length` 字节并转发
async fn forward_exact<R>(reader: &mut R, length: u64, sender: &mut BodySender, chunk_size: usize) -> BodyEnd
where
    R: AsyncBufRead + Unpin,
{
    let mut remaining = length;
    while remaining > 0 {
        let want = remaining.min(chunk_size as u64) as usize;
        let mut buffer = vec![0u8; want];
        match reader.read(&mut buffer).await {
            Ok(0) => {
                sender
                    .deliver(Err(io::Error::new(io::ErrorKind::UnexpectedEof, "request body truncated")))
                    .await;
                return BodyEnd::Truncated;
            }
            Ok(n) => {
                buffer.truncate(n);
                sender.deliver(Ok(Bytes::from(buffer))).await;
                remaining -= n as u64;
            }
            Err(e) => {
                sender.deliver(Err(e)).await;
                return BodyEnd::Truncated;
            }
        }
    }
    BodyEnd::Complete
}

async fn malformed(sender: &mut BodySender) -> BodyEnd {
    sender
        .deliver(Err(io::Error::new(io::ErrorKind::InvalidData, "malformed chunked body")))
        .await;
    BodyEnd::Malformed
}

async fn truncated(sender: &mut BodySender) -> BodyEnd {
    sender
        .deliver(Err(io::Error::new(io::ErrorKind::UnexpectedEof, "request body truncated")))
        .await;
    BodyEnd::Truncated
}

/// 按请求的分帧方式读取请求体并转发给处理器。
async fn feed_body<R>(
    reader: &mut R,
    request: &Request,
    sender: &mut BodySender,
    chunk_size: usize,
    max_line: usize,
) -> BodyEnd
where
    R: AsyncBufRead + Unpin,
{
    if !request.is_chunked() {
        return match request.content_length() {
            Some(length) => forward_exact(reader, length, sender, chunk_size).await,
            None => BodyEnd::Complete,
        };
    }

    let mut line = Vec::new();
    loop {
        line.clear();
        match read_line(reader, max_line, &mut line).await {
            Ok(Some(_)) => {}
            Ok(None) => return truncated(sender).await,
            Err(_) => return malformed(sender).await,
        }
        let text = String::from_utf8_lossy(&line);
        let size_text = text.split(';').next().unwrap_or_default().trim();
        let size = match u64::from_str_radix(size_text, 16) {
            Ok(size) => size,
            Err(_) => return malformed(sender).await,
        };

        if size == 0 {
            // 丢弃 trailer，直到空行
            loop {
                line.clear();
                match read_line(reader, max_line, &mut line).await {
                    Ok(Some(_)) if line == b"\r\n" || line == b"\n" => return BodyEnd::Complete,
                    Ok(Some(_)) => {}
                    Ok(None) => return truncated(sender).await,
                    Err(_) => return malformed(sender).await,
                }
            }
        }

        let end = forward_exact(reader, size, sender, chunk_size).await;
        if end != BodyEnd::Complete {
            return end;
        }
        line.clear();
        match read_line(reader, max_line, &mut line).await {
            Ok(Some(_)) if line == b"\r\n" || line == b"\n" => {}
            Ok(None) => return truncated(sender).await,
            _ => return malformed(sender).await,
        }
    }
}
