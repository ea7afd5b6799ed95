// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求路由
//!
//! [`DavServer`] 是请求处理的核心：它把已解析的请求按方法分发给读取、写入与删除处理器，
//! 并把处理结果统一转换为 [`Response`]。核心本身不持有锁，也不保留跨请求的状态。

use std::io::Read;
use std::sync::Arc;

use crate::{
    config::Config,
    dav_info, dav_warn, deleter,
    exception::Outcome,
    fs::{FileSystem, LocalDir},
    logging::DavLog,
    param::HttpRequestMethod,
    path::resolve,
    reader,
    request::Request,
    response::Response,
    writer,
};

/// 请求处理器的运行参数与存储后端。
#[derive(Clone)]
pub struct ServerConfig {
    prefix: String,
    read_only: bool,
    listings: bool,
    streaming_threshold: u64,
    enable_range_requests: bool,
    fs: Arc<dyn FileSystem>,
}

impl ServerConfig {
    /// 以默认参数包装一个存储后端：前缀 `/`、可写、不列目录
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            prefix: "/".to_string(),
            read_only: false,
            listings: false,
            streaming_threshold: 10485760,
            enable_range_requests: true,
            fs,
        }
    }

    /// 由配置文件构建，后端为 `www_root` 下的 [`LocalDir`]
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(LocalDir::new(config.www_root())))
            .with_prefix(config.prefix())
            .with_read_only(config.read_only())
            .with_listings(config.listings())
            .with_streaming_threshold(config.streaming_threshold())
            .with_range_requests(config.enable_range_requests())
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_listings(mut self, listings: bool) -> Self {
        self.listings = listings;
        self
    }

    pub fn with_streaming_threshold(mut self, threshold: u64) -> Self {
        self.streaming_threshold = threshold;
        self
    }

    pub fn with_range_requests(mut self, enabled: bool) -> Self {
        self.enable_range_requests = enabled;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn listings(&self) -> bool {
        self.listings
    }

    pub fn streaming_threshold(&self) -> u64 {
        self.streaming_threshold
    }

    pub fn enable_range_requests(&self) -> bool {
        self.enable_range_requests
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }
}

/// 资源在后端中的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    Missing,
    File,
    Directory,
}

/// 打开、查询并立即释放句柄。无法获取元数据时按普通资源处理。
pub(crate) fn probe(fs: &dyn FileSystem, path: &str) -> Probe {
    match fs.open(path) {
        Err(_) => Probe::Missing,
        Ok(file) => match file.stat() {
            Ok(meta) if meta.is_dir() => Probe::Directory,
            _ => Probe::File,
        },
    }
}

pub struct DavServer {
    config: ServerConfig,
    log: DavLog,
}

impl DavServer {
    pub fn new(config: ServerConfig, log: DavLog) -> Self {
        Self { config, log }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn log(&self) -> &DavLog {
        &self.log
    }

    /// 处理一个请求。
    ///
    /// GET/HEAD/PUT/DELETE 分别交给对应的处理器，其余方法一律返回 400，
    /// 不读取请求体，也不访问存储后端。
    pub fn handle(&self, request: &Request, body: &mut dyn Read, id: u128) -> Response {
        let peer = request
            .peer()
            .map_or_else(|| "-".to_string(), |peer| peer.to_string());
        dav_info!(
            self.log,
            "[ID{}]{} {} {}",
            id,
            peer,
            request.method(),
            request.target()
        );

        let path = resolve(request.path(), self.config.prefix());
        let response = match request.method() {
            HttpRequestMethod::Get => reader::read(request, id, &path, true, &self.config, &self.log),
            HttpRequestMethod::Head => reader::read(request, id, &path, false, &self.config, &self.log),
            HttpRequestMethod::Put => {
                Self::from_outcome(writer::write(id, &path, body, &self.config, &self.log))
            }
            HttpRequestMethod::Delete => {
                Self::from_outcome(deleter::delete(id, &path, &self.config, &self.log))
            }
            method => {
                dav_warn!(self.log, "[ID{}]不支持的请求方法{}，返回400", id, method);
                Response::from_status_code(400)
            }
        };

        dav_info!(
            self.log,
            "[ID{}]{} {} {}, {}",
            id,
            request.method(),
            request.target(),
            response.status_code(),
            response.information()
        );
        response
    }

    fn from_outcome(outcome: Outcome) -> Response {
        match outcome {
            Ok(code) => Response::from_status_code(code),
            Err(e) => Response::from_status_code(e.status_code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{MemoryFs, MockFileSystem};
    use crate::logging::MemoryLog;
    use std::io::{self, Cursor};

    fn server_with(fs: MockFileSystem, read_only: bool) -> DavServer {
        let config = ServerConfig::new(Arc::new(fs)).with_read_only(read_only);
        DavServer::new(config, DavLog::discard())
    }

    fn request(method: HttpRequestMethod, target: &str) -> Request {
        Request::new(method, target).unwrap()
    }

    fn untouched() -> MockFileSystem {
        let mut fs = MockFileSystem::new();
        fs.expect_open().never();
        fs.expect_create().never();
        fs.expect_mkdir().never();
        fs.expect_remove().never();
        fs
    }

    #[test]
    fn test_unsupported_methods_touch_nothing() {
        let server = server_with(untouched(), false);
        for method in [
            HttpRequestMethod::Options,
            HttpRequestMethod::Post,
            HttpRequestMethod::Propfind,
            HttpRequestMethod::Mkcol,
            HttpRequestMethod::Copy,
            HttpRequestMethod::Move,
            HttpRequestMethod::Lock,
        ] {
            let mut body = Cursor::new(b"ignored".to_vec());
            let response = server.handle(&request(method, "/a.txt"), &mut body, 0);
            assert_eq!(response.status_code(), 400);
            assert_eq!(body.position(), 0);
        }
    }

    #[test]
    fn test_read_only_put_touches_nothing() {
        let server = server_with(untouched(), true);
        let mut body = Cursor::new(b"data".to_vec());
        let response = server.handle(&request(HttpRequestMethod::Put, "/a.txt"), &mut body, 0);
        assert_eq!(response.status_code(), 403);
    }

    #[test]
    fn test_read_only_delete_touches_nothing() {
        let server = server_with(untouched(), true);
        let response = server.handle(&request(HttpRequestMethod::Delete, "/a.txt"), &mut io::empty(), 0);
        assert_eq!(response.status_code(), 403);
    }

    #[test]
    fn test_get_missing_echoes_uri() {
        let mut fs = MockFileSystem::new();
        fs.expect_open()
            .withf(|name: &str| name == "missing.txt")
            .times(1)
            .returning(|_| Err(io::Error::from(io::ErrorKind::NotFound)));
        let server = server_with(fs, false);

        let response = server.handle(
            &request(HttpRequestMethod::Get, "/missing.txt?x=1"),
            &mut io::empty(),
            0,
        );
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.header("X-Content-Type-Options"), Some("nosniff"));
        assert_eq!(
            response.into_body_bytes().unwrap(),
            bytes::Bytes::from("/missing.txt?x=1\n")
        );
    }

    #[test]
    fn test_put_create_failure_is_conflict() {
        let mut fs = MockFileSystem::new();
        fs.expect_open()
            .returning(|_| Err(io::Error::from(io::ErrorKind::NotFound)));
        fs.expect_mkdir().never();
        fs.expect_create()
            .times(1)
            .returning(|_| Err(io::Error::from(io::ErrorKind::PermissionDenied)));
        let server = server_with(fs, false);

        let response = server.handle(
            &request(HttpRequestMethod::Put, "/new.txt"),
            &mut Cursor::new(b"x".to_vec()),
            0,
        );
        assert_eq!(response.status_code(), 409);
    }

    #[test]
    fn test_delete_remove_failure_is_internal_error() {
        let backing = MemoryFs::new();
        backing.create("f.txt").unwrap();
        let mut fs = MockFileSystem::new();
        let opener = backing.clone();
        fs.expect_open().returning(move |name| opener.open(name));
        fs.expect_remove()
            .withf(|name: &str| name == "f.txt")
            .times(1)
            .returning(|_| Err(io::Error::other("disk on fire")));
        let server = server_with(fs, false);

        let response = server.handle(&request(HttpRequestMethod::Delete, "/f.txt"), &mut io::empty(), 0);
        assert_eq!(response.status_code(), 500);
    }

    #[test]
    fn test_prefix_is_stripped() {
        let fs = MemoryFs::new();
        fs.create("a.txt").unwrap();
        let config = ServerConfig::new(Arc::new(fs)).with_prefix("/dav");
        let server = DavServer::new(config, DavLog::discard());

        let response = server.handle(&request(HttpRequestMethod::Get, "/dav/a.txt"), &mut io::empty(), 0);
        assert_eq!(response.status_code(), 200);
    }

    #[test]
    fn test_requests_are_logged() {
        let memory = Arc::new(MemoryLog::new());
        let config = ServerConfig::new(Arc::new(MemoryFs::new()));
        let server = DavServer::new(config, DavLog::new(memory.clone()));

        server.handle(&request(HttpRequestMethod::Propfind, "/x"), &mut io::empty(), 42);
        assert!(memory.contains("[ID42]- PROPFIND /x"));
        assert!(memory.contains("[ID42]不支持的请求方法PROPFIND"));
    }

    #[test]
    fn test_probe() {
        let fs = MemoryFs::new();
        fs.mkdir("d").unwrap();
        fs.create("d/f").unwrap();
        assert_eq!(probe(&fs, "d"), Probe::Directory);
        assert_eq!(probe(&fs, "d/f"), Probe::File);
        assert_eq!(probe(&fs, "nope"), Probe::Missing);
        assert_eq!(fs.open_handles(), 0);
    }
}
