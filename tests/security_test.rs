// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 安全回归测试
//!
//! 路径遍历、空字节注入等攻击向量不能让请求越出后端根目录。

use std::io::Cursor;
use std::path::Component;
use std::sync::Arc;

use davserver::path::{clean, resolve};
use davserver::{DavLog, DavServer, HttpRequestMethod, LocalDir, Request, ServerConfig};
use proptest::prelude::*;
use tempfile::TempDir;

fn put(server: &DavServer, target: &str, body: &[u8]) -> u16 {
    let request = Request::new(HttpRequestMethod::Put, target).unwrap();
    server.handle(&request, &mut Cursor::new(body.to_vec()), 0).status_code()
}

fn get(server: &DavServer, target: &str) -> u16 {
    let request = Request::new(HttpRequestMethod::Get, target).unwrap();
    server.handle(&request, &mut std::io::empty(), 0).status_code()
}

proptest! {
    /// 任意逻辑路径经过清理后都落在根目录之内
    #[test]
    fn sanitized_path_stays_under_root(name in "[a-z./\\\\]{0,40}") {
        let dir = LocalDir::new("/srv/dav");
        if let Ok(path) = dir.sanitize(&name) {
            prop_assert!(path.starts_with("/srv/dav"));
            prop_assert!(path.components().all(|c| c != Component::ParentDir));
        }
    }

    #[test]
    fn clean_is_rooted_and_idempotent(name in "[a-z./]{0,40}") {
        let cleaned = clean(&name);
        prop_assert!(cleaned.starts_with('/'));
        prop_assert!(!cleaned.split('/').any(|s| s == ".." || s == "."));
        prop_assert_eq!(clean(&cleaned), cleaned.clone());
    }

    #[test]
    fn resolve_never_keeps_outer_slashes(raw in "/[a-z/]{0,30}") {
        let resolved = resolve(&raw, "/");
        prop_assert!(resolved == "/" || (!resolved.starts_with('/') && !resolved.ends_with('/')));
    }
}

#[test]
fn test_traversal_put_lands_inside_root() {
    let outer = TempDir::new().unwrap();
    let root = outer.path().join("root");
    std::fs::create_dir(&root).unwrap();
    let server = DavServer::new(ServerConfig::new(Arc::new(LocalDir::new(&root))), DavLog::discard());

    for target in ["/../escape.txt", "/a/../../escape.txt", "/%2e%2e/%2e%2e/escape.txt"] {
        let status = put(&server, target, b"inside");
        assert!(status == 201 || status == 204);
    }
    assert!(!outer.path().join("escape.txt").exists());
    assert_eq!(std::fs::read(root.join("escape.txt")).unwrap(), b"inside");
}

#[test]
fn test_traversal_get_cannot_read_outside() {
    let outer = TempDir::new().unwrap();
    let root = outer.path().join("root");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(outer.path().join("secret.txt"), b"secret").unwrap();
    let server = DavServer::new(ServerConfig::new(Arc::new(LocalDir::new(&root))), DavLog::discard());

    assert_eq!(get(&server, "/../secret.txt"), 404);
    assert_eq!(get(&server, "/%2e%2e/secret.txt"), 404);
    assert_eq!(get(&server, "/a/b/../../../secret.txt"), 404);
}

#[test]
fn test_null_byte_is_rejected_by_backend() {
    let tmp = TempDir::new().unwrap();
    let server = DavServer::new(ServerConfig::new(Arc::new(LocalDir::new(tmp.path()))), DavLog::discard());

    assert_eq!(get(&server, "/a%00.txt"), 404);
    assert_eq!(put(&server, "/a%00.txt", b"x"), 409);
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}
