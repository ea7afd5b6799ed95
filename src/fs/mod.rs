// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 存储后端抽象
//!
//! 请求处理器只通过 [`FileSystem`] 与 [`DavFile`] 两个 trait 访问存储。
//! 文件名均为逻辑路径：以 `/` 分隔，与宿主操作系统的约定无关。
//!
//! 内置两种实现：
//! - [`LocalDir`]：限制在宿主机某个目录子树内的本地文件系统；
//! - [`MemoryFs`]：纯内存实现，测试用。
//!
//! 句柄的关闭即 `drop`，处理器负责在每条返回路径上释放它。

mod local;
mod memory;

pub use local::{LocalDir, LocalFile};
pub use memory::{MemoryFile, MemoryFs};

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::time::SystemTime;

/// 资源元数据，由 [`DavFile::stat`] 与 [`DavFile::read_dir`] 返回。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    name: String,
    is_dir: bool,
    len: u64,
    modified: SystemTime,
}

impl Metadata {
    pub fn new(name: impl Into<String>, is_dir: bool, len: u64, modified: SystemTime) -> Self {
        Self {
            name: name.into(),
            is_dir,
            len,
            modified,
        }
    }

    /// 资源的基本名（不含父路径）
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }
}

/// 由 [`FileSystem::open`] / [`FileSystem::create`] 返回的打开句柄。
pub trait DavFile: Read + Write + Seek + Send {
    fn stat(&self) -> io::Result<Metadata>;

    /// 读取目录项。`limit` 为 `None` 时返回剩余的全部条目，
    /// 否则最多返回 `limit` 条，连续调用会从上次的位置继续。
    fn read_dir(&mut self, limit: Option<usize>) -> io::Result<Vec<Metadata>>;
}

/// 一组具名资源的访问接口。
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem: Send + Sync {
    fn open(&self, name: &str) -> io::Result<Box<dyn DavFile>>;

    /// 截断已有资源或创建新资源，返回可写句柄
    fn create(&self, name: &str) -> io::Result<Box<dyn DavFile>>;

    /// 递归创建目录，目录已存在时视为成功
    fn mkdir(&self, name: &str) -> io::Result<()>;

    /// 删除文件或空目录
    fn remove(&self, name: &str) -> io::Result<()>;
}

/// 零长度、永远处于 EOF 的内容流。
///
/// HEAD 请求把它交给与 GET 相同的内容协商逻辑，
/// 这样状态码和标头的计算完全一致，只是不会产生响应体。
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyFile;

impl Read for EmptyFile {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

impl Seek for EmptyFile {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_always_eof() {
        let mut file = EmptyFile;
        let mut buf = [0u8; 16];
        assert_eq!(file.read(&mut buf).unwrap(), 0);
        assert_eq!(file.seek(SeekFrom::Start(42)).unwrap(), 0);
        assert_eq!(file.read(&mut buf).unwrap(), 0);
    }
}
