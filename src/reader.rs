// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! GET 与 HEAD 的处理器。

use bytes::Bytes;

use crate::{
    dav_debug, dav_error, dav_warn,
    fs::{DavFile, EmptyFile},
    logging::DavLog,
    request::Request,
    response::{Body, Response},
    serve::serve_content,
    server::ServerConfig,
    util::{json_listing, HtmlBuilder},
};

/// 404 响应：回显请求 URI
pub fn not_found(request: &Request) -> Response {
    let mut response = Response::from_text(404, format!("{}\n", request.target()));
    response.set_header("X-Content-Type-Options", "nosniff");
    response
}

/// 读取 `path` 指向的资源。
///
/// `serve_content` 为假时（HEAD）内容协商逻辑照常执行，但内容流换成 [`EmptyFile`]，
/// 状态码与标头和 GET 相同，响应体为空。句柄在每条返回路径上都只释放一次。
pub fn read(
    request: &Request,
    id: u128,
    path: &str,
    serve: bool,
    config: &ServerConfig,
    log: &DavLog,
) -> Response {
    let file = match config.fs().open(path) {
        Ok(file) => file,
        Err(e) => {
            dav_debug!(log, "[ID{}]无法打开{}: {}，返回404", id, path, e);
            return not_found(request);
        }
    };
    let metadata = match file.stat() {
        Ok(metadata) => metadata,
        Err(e) => {
            dav_warn!(log, "[ID{}]无法获取{}的元数据: {}，返回404", id, path, e);
            drop(file);
            return not_found(request);
        }
    };

    if metadata.is_dir() {
        return list_dir(request, id, path, file, serve, config, log);
    }

    if serve {
        serve_content(request, id, path, &metadata, file, config, log)
    } else {
        let response = serve_content(request, id, path, &metadata, EmptyFile, config, log);
        drop(file);
        response
    }
}

fn list_dir(
    request: &Request,
    id: u128,
    path: &str,
    mut dir: Box<dyn DavFile>,
    serve: bool,
    config: &ServerConfig,
    log: &DavLog,
) -> Response {
    if !config.listings() {
        dav_debug!(log, "[ID{}]{}是目录且未开启目录列表，返回403", id, path);
        return Response::from_status_code(403);
    }

    let mut entries = match dir.read_dir(None) {
        Ok(entries) => entries,
        Err(e) => {
            dav_error!(log, "[ID{}]无法读取目录{}: {}", id, path, e);
            return Response::from_status_code(500);
        }
    };
    drop(dir);

    let is_json = request
        .accept()
        .is_some_and(|a| a.contains("application/json"));
    let (content_type, content) = if is_json {
        match serde_json::to_vec(&json_listing(&mut entries)) {
            Ok(content) => ("application/json", content),
            Err(e) => {
                dav_error!(log, "[ID{}]无法序列化目录{}: {}", id, path, e);
                return Response::from_status_code(500);
            }
        }
    } else {
        let html = HtmlBuilder::from_dir(request.path(), &mut entries).build();
        ("text/html; charset=utf-8", html.into_bytes())
    };
    dav_debug!(log, "[ID{}]目录{}包含{}项", id, path, entries.len());

    let mut response = Response::new();
    response.set_header("Content-Type", content_type);
    let length = content.len() as u64;
    if serve {
        response.set_body(Body::Bytes(Bytes::from(content)), Some(length));
    } else {
        response.set_body(Body::Empty, Some(length));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, MemoryFs};
    use crate::param::HttpRequestMethod;
    use std::io::Write;
    use std::sync::Arc;

    fn setup(listings: bool) -> (MemoryFs, ServerConfig) {
        let fs = MemoryFs::new();
        fs.mkdir("docs/sub").unwrap();
        fs.create("docs/a.txt").unwrap().write_all(b"alpha").unwrap();
        let config = ServerConfig::new(Arc::new(fs.clone())).with_listings(listings);
        (fs, config)
    }

    fn get(target: &str) -> Request {
        Request::new(HttpRequestMethod::Get, target).unwrap()
    }

    #[test]
    fn test_read_file_releases_handle() {
        let (fs, config) = setup(false);
        let response = read(&get("/docs/a.txt"), 0, "docs/a.txt", true, &config, &DavLog::discard());
        assert_eq!(response.status_code(), 200);
        assert_eq!(fs.open_handles(), 0);
        assert_eq!(response.into_body_bytes().unwrap(), Bytes::from("alpha"));
    }

    #[test]
    fn test_head_has_no_body() {
        let (fs, config) = setup(false);
        let response = read(&get("/docs/a.txt"), 0, "docs/a.txt", false, &config, &DavLog::discard());
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.content_length(), Some(5));
        assert_eq!(fs.open_handles(), 0);
        assert!(response.into_body_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_directory_without_listings_is_forbidden() {
        let (fs, config) = setup(false);
        let response = read(&get("/docs"), 0, "docs", true, &config, &DavLog::discard());
        assert_eq!(response.status_code(), 403);
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn test_html_listing() {
        let (fs, config) = setup(true);
        let response = read(&get("/docs/"), 0, "docs", true, &config, &DavLog::discard());
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.header("Content-Type"), Some("text/html; charset=utf-8"));
        assert_eq!(fs.open_handles(), 0);
        let body = String::from_utf8(response.into_body_bytes().unwrap().to_vec()).unwrap();
        assert!(body.contains(r#"<a href="/docs/sub/">sub/</a>"#));
        assert!(body.contains(r#"<a href="/docs/a.txt">a.txt</a>"#));
        assert!(body.find("sub/").unwrap() < body.find("a.txt").unwrap());
    }

    #[test]
    fn test_html_listing_without_trailing_slash() {
        let (_fs, config) = setup(true);
        let response = read(&get("/docs"), 0, "docs", true, &config, &DavLog::discard());
        assert_eq!(response.status_code(), 200);
        let body = String::from_utf8(response.into_body_bytes().unwrap().to_vec()).unwrap();
        assert!(body.contains(r#"<a href="/docs/a.txt">a.txt</a>"#));
        assert!(body.contains(r#"<a href="/docs/sub/">sub/</a>"#));
    }

    #[test]
    fn test_json_listing_and_head() {
        let (_fs, config) = setup(true);
        let request = get("/docs").with_header("Accept", "application/json").unwrap();

        let response = read(&request, 0, "docs", true, &config, &DavLog::discard());
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        let length = response.content_length();
        let body = response.into_body_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value[0]["name"], "sub");
        assert_eq!(value[1]["name"], "a.txt");

        let head = read(&request, 0, "docs", false, &config, &DavLog::discard());
        assert_eq!(head.content_length(), length);
        assert!(head.into_body_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_missing_is_not_found() {
        let (_fs, config) = setup(false);
        let response = read(&get("/nope"), 0, "nope", true, &config, &DavLog::discard());
        assert_eq!(response.status_code(), 404);
    }
}
