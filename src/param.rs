// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了 `davserver` 遵循的 HTTP / WebDAV 协议相关常量和数据结构，包括：
//! - 状态码及其原因短语（含 RFC 4918 的扩展状态码）。
//! - 文件后缀名到 MIME 类型的映射表。
//! - HTTP 方法与版本的强类型枚举。

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "davserver";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 无法识别后缀名时使用的 MIME 类型
pub const DEFAULT_MIME: &str = "application/octet-stream";

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110](https://www.rfc-editor.org/rfc/rfc9110.html) 与
    /// [RFC 4918 §11](http://www.webdav.org/specs/rfc4918.html#status.code.extensions.to.http11)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        // 1xx
        map.insert(100, "Continue");

        // 2xx
        map.insert(200, "OK");
        map.insert(201, "Created");
        map.insert(202, "Accepted");
        map.insert(204, "No Content");
        map.insert(206, "Partial Content");
        map.insert(207, "Multi-Status");

        // 3xx
        map.insert(301, "Moved Permanently");
        map.insert(302, "Moved Temporarily");
        map.insert(304, "Not Modified");

        // 4xx
        map.insert(400, "Bad Request");
        map.insert(401, "Unauthorized");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(409, "Conflict");
        map.insert(412, "Precondition Failed");
        map.insert(413, "Content Too Large");
        map.insert(416, "Range Not Satisfiable");
        map.insert(423, "Locked");
        map.insert(424, "Failed Dependency");

        // 5xx
        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(505, "HTTP Version Not Supported");
        map.insert(507, "Insufficient Storage");
        map
    };
}

lazy_static! {
    /// 文件后缀名到 MIME 类型（Media Type）的映射表。
    ///
    /// 用于设置 GET/HEAD 响应中的 `Content-Type` 字段。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("avif", "image/avif");
        map.insert("bin", "application/octet-stream");
        map.insert("bmp", "image/bmp");
        map.insert("css", "text/css; charset=utf-8");
        map.insert("csv", "text/csv");
        map.insert("doc", "application/msword");
        map.insert(
            "docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        );
        map.insert("epub", "application/epub+zip");
        map.insert("gif", "image/gif");
        map.insert("gz", "application/gzip");
        map.insert("htm", "text/html; charset=utf-8");
        map.insert("html", "text/html; charset=utf-8");
        map.insert("ico", "image/x-icon");
        map.insert("ics", "text/calendar");
        map.insert("iso", "application/x-iso9660-image");
        map.insert("jpeg", "image/jpeg");
        map.insert("jpg", "image/jpeg");
        map.insert("js", "text/javascript; charset=utf-8");
        map.insert("json", "application/json");
        map.insert("md", "text/markdown; charset=utf-8");
        map.insert("mjs", "text/javascript; charset=utf-8");
        map.insert("mkv", "video/x-matroska");
        map.insert("mp3", "audio/mpeg");
        map.insert("mp4", "video/mp4");
        map.insert("odt", "application/vnd.oasis.opendocument.text");
        map.insert("ogg", "audio/ogg");
        map.insert("otf", "font/otf");
        map.insert("pdf", "application/pdf");
        map.insert("png", "image/png");
        map.insert("rar", "application/x-rar-compressed");
        map.insert("svg", "image/svg+xml");
        map.insert("tar", "application/x-tar");
        map.insert("tif", "image/tiff");
        map.insert("tiff", "image/tiff");
        map.insert("toml", "application/toml");
        map.insert("ttf", "font/ttf");
        map.insert("txt", "text/plain; charset=utf-8");
        map.insert("wasm", "application/wasm");
        map.insert("wav", "audio/wav");
        map.insert("webm", "video/webm");
        map.insert("webp", "image/webp");
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        map.insert("xhtml", "application/xhtml+xml");
        map.insert("xls", "application/vnd.ms-excel");
        map.insert(
            "xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        );
        map.insert("xml", "text/xml; charset=utf-8");
        map.insert("yaml", "application/yaml");
        map.insert("yml", "application/yaml");
        map.insert("zip", "application/zip");
        map.insert("7z", "application/x-7z-compressed");
        map
    };
}

/// 根据逻辑路径的后缀名推断 MIME 类型，大小写不敏感
pub fn mime_for(name: &str) -> &'static str {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    let extension = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return DEFAULT_MIME,
    };
    MIME_TYPES.get(extension.as_str()).copied().unwrap_or(DEFAULT_MIME)
}

/// 根据状态码查询原因短语，未知状态码返回空字符串
pub fn status_text(code: u16) -> &'static str {
    STATUS_CODES.get(&code).copied().unwrap_or("")
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpVersion {
    /// HTTP/1.0 版本，默认不保持连接
    V1_0,
    /// HTTP/1.1 版本
    V1_1,
}

/// 服务器能够识别的 HTTP 方法。
///
/// 能识别不代表能处理：只有 GET/HEAD/PUT/DELETE 会被路由到处理器，
/// 其余方法（包括 WebDAV 的集合与锁操作）一律返回 400。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpRequestMethod {
    Get,
    Head,
    Put,
    Delete,
    Options,
    Post,
    Patch,
    Trace,
    // WebDAV RFC 4918
    Propfind,
    Proppatch,
    Mkcol,
    Copy,
    Move,
    Lock,
    Unlock,
}

impl FromStr for HttpRequestMethod {
    type Err = ();

    /// 方法名大小写不敏感
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            "POST" => Ok(Self::Post),
            "PATCH" => Ok(Self::Patch),
            "TRACE" => Ok(Self::Trace),
            "PROPFIND" => Ok(Self::Propfind),
            "PROPPATCH" => Ok(Self::Proppatch),
            "MKCOL" => Ok(Self::Mkcol),
            "COPY" => Ok(Self::Copy),
            "MOVE" => Ok(Self::Move),
            "LOCK" => Ok(Self::Lock),
            "UNLOCK" => Ok(Self::Unlock),
            _ => Err(()),
        }
    }
}

impl fmt::Display for HttpVersion {
    /// 将枚举格式化为 HTTP 报文中的版本字符串
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "HTTP/1.0"),
            HttpVersion::V1_1 => write!(f, "HTTP/1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            HttpRequestMethod::Get => "GET",
            HttpRequestMethod::Head => "HEAD",
            HttpRequestMethod::Put => "PUT",
            HttpRequestMethod::Delete => "DELETE",
            HttpRequestMethod::Options => "OPTIONS",
            HttpRequestMethod::Post => "POST",
            HttpRequestMethod::Patch => "PATCH",
            HttpRequestMethod::Trace => "TRACE",
            HttpRequestMethod::Propfind => "PROPFIND",
            HttpRequestMethod::Proppatch => "PROPPATCH",
            HttpRequestMethod::Mkcol => "MKCOL",
            HttpRequestMethod::Copy => "COPY",
            HttpRequestMethod::Move => "MOVE",
            HttpRequestMethod::Lock => "LOCK",
            HttpRequestMethod::Unlock => "UNLOCK",
        };
        f.write_str(name)
    }
}
