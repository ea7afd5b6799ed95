// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路径解析模块
//!
//! 负责把请求 URL 转换为逻辑路径（以 `/` 分隔、与宿主系统无关的资源名），
//! 以及逻辑路径的词法清理。这里的函数都是纯函数，不访问文件系统。

use percent_encoding::percent_decode_str;

use crate::exception::Exception;

/// 从请求目标中提取已解码的路径部分。
///
/// - 去掉查询串（`?…`）与片段（`#…`）；
/// - 绝对形式的目标（`http://host/p`）只保留 `/p`；
/// - 对百分号转义进行解码，解码后不是合法 UTF-8 时返回 [`Exception::InvalidPath`]。
pub fn url_path(target: &str) -> Result<String, Exception> {
    let mut raw = target;
    if let Some(end) = raw.find(['?', '#']) {
        raw = &raw[..end];
    }
    for scheme in ["http://", "https://"] {
        if let Some(rest) = raw.strip_prefix(scheme) {
            raw = match rest.find('/') {
                Some(slash) => &rest[slash..],
                None => "",
            };
            break;
        }
    }
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| Exception::InvalidPath)
}

/// 将 URL 路径转换为相对于 `prefix` 的逻辑路径。
///
/// - 空路径得到 `"/"`；
/// - 不以 `prefix` 开头的路径同样回退到 `"/"`，而不是报错；
/// - 否则去掉 `prefix`，再去掉首尾的 `/`。
pub fn resolve(raw: &str, prefix: &str) -> String {
    if raw.is_empty() {
        return "/".to_string();
    }
    match raw.strip_prefix(prefix) {
        Some(rest) => rest.trim_matches('/').to_string(),
        None => "/".to_string(),
    }
}

/// 对以 `/` 为根的逻辑路径进行词法清理。
///
/// 合并重复的 `/`，去掉 `.`，`..` 回退一级，位于根目录的 `..` 保持在根目录。
/// 返回值总以 `/` 开头，且除根目录外不以 `/` 结尾。
pub fn clean(name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}

/// 逻辑路径的父路径（已清理，去掉前导 `/`）。根目录及其直接子项返回空字符串。
pub fn parent(name: &str) -> String {
    let cleaned = clean(name);
    match cleaned.rsplit_once('/') {
        Some((dir, _)) => dir.trim_start_matches('/').to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_empty_is_root() {
        assert_eq!(resolve("", "/dav"), "/");
    }

    #[test]
    fn test_resolve_strips_prefix_and_slashes() {
        assert_eq!(resolve("/dav/a/b.txt", "/dav"), "a/b.txt");
        assert_eq!(resolve("/dav/dir/", "/dav/"), "dir");
        assert_eq!(resolve("/a/b", "/"), "a/b");
        assert_eq!(resolve("/dav", "/dav"), "");
    }

    #[test]
    fn test_resolve_prefix_mismatch_falls_back_to_root() {
        assert_eq!(resolve("/other/file", "/dav"), "/");
        assert_eq!(resolve("relative", "/"), "/");
    }

    #[test]
    fn test_resolve_prefix_is_plain_string_match() {
        assert_eq!(resolve("/davx/file", "/dav"), "x/file");
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean("/"), "/");
        assert_eq!(clean(""), "/");
        assert_eq!(clean("/a//b/./c/"), "/a/b/c");
        assert_eq!(clean("/a/b/../c"), "/a/c");
        assert_eq!(clean("/../../etc/passwd"), "/etc/passwd");
        assert_eq!(clean("/a/../../.."), "/");
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("a/b/c.txt"), "a/b");
        assert_eq!(parent("c.txt"), "");
        assert_eq!(parent("/"), "");
        assert_eq!(parent("a/../b/c"), "b");
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("/dav/a%20b.txt?x=1").unwrap(), "/dav/a b.txt");
        assert_eq!(url_path("http://example.com/dav/f#frag").unwrap(), "/dav/f");
        assert_eq!(url_path("http://example.com").unwrap(), "");
        assert_eq!(url_path("/%E4%BD%A0%E5%A5%BD").unwrap(), "/你好");
        assert_eq!(url_path("/bad%FF"), Err(Exception::InvalidPath));
    }

    #[test]
    fn test_url_path_keeps_null_byte_for_backend() {
        // 空字节由存储后端拒绝，解析阶段只负责解码
        assert_eq!(url_path("/a%00b").unwrap(), "/a\0b");
    }
}
