// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 内容协商
//!
//! 把一个已打开的资源变成 GET/HEAD 响应：MIME 类型、`Last-Modified`、
//! 条件请求（`If-Modified-Since` / `If-Unmodified-Since`）与单段 `Range`。
//!
//! 所有标头都由元数据计算，而不是由内容流计算。HEAD 请求传入 [`EmptyFile`](crate::fs::EmptyFile)
//! 时得到的状态码与标头和 GET 完全一致。

use std::io::{Read, Seek, SeekFrom};
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{
    dav_debug, dav_error,
    fs::Metadata,
    logging::DavLog,
    param::{mime_for, HttpRequestMethod},
    request::Request,
    response::{Body, Response},
    server::ServerConfig,
    util::{format_http_date, parse_http_date},
};

/// 一段字节区间，`length` 不为零
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub length: u64,
}

impl ByteRange {
    fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.start + self.length - 1, size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    /// 语法错误
    Invalid,
    /// 所有区间都落在资源之外
    NoOverlap,
}

/// 解析 `Range` 标头。
///
/// 只支持 `bytes` 单位；落在资源之外的区间被丢弃，全部丢弃时返回 [`RangeError::NoOverlap`]。
/// 结束位置超出资源时截断到最后一个字节。
pub fn parse_range(header: &str, size: u64) -> Result<Vec<ByteRange>, RangeError> {
    let byte_ranges = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or(RangeError::Invalid)?;

    let mut ranges = Vec::new();
    let mut no_overlap = false;
    for part in byte_ranges.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (start, end) = part.split_once('-').ok_or(RangeError::Invalid)?;
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            // 后缀区间：最后 n 个字节
            let suffix: u64 = end.parse().map_err(|_| RangeError::Invalid)?;
            if suffix == 0 || size == 0 {
                no_overlap = true;
                continue;
            }
            let suffix = suffix.min(size);
            ranges.push(ByteRange {
                start: size - suffix,
                length: suffix,
            });
            continue;
        }

        let first: u64 = start.parse().map_err(|_| RangeError::Invalid)?;
        let last = if end.is_empty() {
            None
        } else {
            Some(end.parse::<u64>().map_err(|_| RangeError::Invalid)?)
        };
        if let Some(last) = last {
            if first > last {
                return Err(RangeError::Invalid);
            }
        }
        if first >= size {
            no_overlap = true;
            continue;
        }
        let last = last.map_or(size - 1, |last| last.min(size - 1));
        ranges.push(ByteRange {
            start: first,
            length: last - first + 1,
        });
    }

    if ranges.is_empty() && no_overlap {
        return Err(RangeError::NoOverlap);
    }
    Ok(ranges)
}

fn unix_seconds(time: SystemTime) -> Option<i64> {
    if time == SystemTime::UNIX_EPOCH {
        return None;
    }
    Some(DateTime::<Utc>::from(time).timestamp())
}

/// `If-Range` 只接受与修改时间完全相同的日期，实体标签一律视为不匹配
fn if_range_allows(request: &Request, modified: Option<i64>) -> bool {
    let Some(value) = request.header("if-range") else {
        return true;
    };
    match (parse_http_date(value), modified) {
        (Some(date), Some(modified)) => date.timestamp() == modified,
        _ => false,
    }
}

/// 根据请求与资源元数据生成 GET/HEAD 响应。
///
/// # 参数
/// * `name` - 逻辑路径，用于推断 MIME 类型。
/// * `metadata` - 资源元数据，决定 `Content-Length` 与 `Last-Modified`。
/// * `content` - 内容流。小于流式阈值时读入内存后立即释放，否则随响应一起返回。
pub fn serve_content<C>(
    request: &Request,
    id: u128,
    name: &str,
    metadata: &Metadata,
    mut content: C,
    config: &ServerConfig,
    log: &DavLog,
) -> Response
where
    C: Read + Seek + Send + 'static,
{
    let size = metadata.len();
    let modified = unix_seconds(metadata.modified());
    let last_modified = modified.map(|_| format_http_date(&DateTime::<Utc>::from(metadata.modified())));

    // If-Unmodified-Since
    if let (Some(modified), Some(date)) = (
        modified,
        request.header("if-unmodified-since").and_then(parse_http_date),
    ) {
        if modified > date.timestamp() {
            dav_debug!(log, "[ID{}]{}在{}之后被修改过，返回412", id, name, date);
            return Response::from_status_code(412);
        }
    }

    // If-Modified-Since
    if let (Some(modified), Some(date)) = (
        modified,
        request.header("if-modified-since").and_then(parse_http_date),
    ) {
        if modified <= date.timestamp() {
            dav_debug!(log, "[ID{}]{}未被修改，返回304", id, name);
            let mut response = Response::from_status_code(304);
            if let Some(last_modified) = &last_modified {
                response.set_header("Last-Modified", last_modified.as_str());
            }
            return response;
        }
    }

    let mut response = Response::new();
    response.set_header("Content-Type", mime_for(name));
    if let Some(last_modified) = &last_modified {
        response.set_header("Last-Modified", last_modified.as_str());
    }
    if config.enable_range_requests() {
        response.set_header("Accept-Ranges", "bytes");
    }

    let mut range = ByteRange {
        start: 0,
        length: size,
    };
    let range_header = request
        .header("range")
        .filter(|_| config.enable_range_requests() && if_range_allows(request, modified));
    if let Some(header) = range_header {
        match parse_range(header, size) {
            Ok(ranges) if ranges.len() == 1 => {
                range = ranges[0];
                dav_debug!(log, "[ID{}]Range请求: {}", id, range.content_range(size));
                response.set_code(206);
                response.set_header("Content-Range", range.content_range(size));
            }
            Ok(ranges) => {
                dav_debug!(log, "[ID{}]忽略包含{}个区间的Range请求", id, ranges.len());
            }
            Err(e) => {
                dav_debug!(log, "[ID{}]无法满足的Range请求{}: {:?}", id, header, e);
                let mut response = Response::from_status_code(416);
                response.set_header("Content-Range", format!("bytes */{}", size));
                return response;
            }
        }
    }

    if request.method() == HttpRequestMethod::Head {
        response.set_body(Body::Empty, Some(range.length));
        return response;
    }

    if range.start > 0 {
        if let Err(e) = content.seek(SeekFrom::Start(range.start)) {
            dav_error!(log, "[ID{}]无法定位到{}的位置{}: {}", id, name, range.start, e);
            return Response::from_status_code(500);
        }
    }

    if range.length > config.streaming_threshold() {
        dav_debug!(log, "[ID{}]{}字节超过流式阈值，使用流式传输", id, range.length);
        response.set_body(Body::Stream(Box::new(content.take(range.length))), Some(range.length));
        return response;
    }

    let mut buffer = Vec::with_capacity(range.length as usize);
    if let Err(e) = content.take(range.length).read_to_end(&mut buffer) {
        dav_error!(log, "[ID{}]读取{}失败: {}", id, name, e);
        return Response::from_status_code(500);
    }
    if (buffer.len() as u64) < range.length {
        dav_error!(
            log,
            "[ID{}]{}只读到{}字节，少于元数据中的{}字节",
            id,
            name,
            buffer.len(),
            range.length
        );
        return Response::from_status_code(500);
    }
    response.set_body(Body::Bytes(Bytes::from(buffer)), Some(range.length));
    response
}
