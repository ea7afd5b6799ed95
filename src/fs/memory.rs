// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 纯内存的文件系统后端。
//!
//! 行为与 [`LocalDir`](crate::fs::LocalDir) 保持一致（截断式创建、只能删除空目录），
//! 并统计当前未释放的句柄数量，供测试断言句柄在每条路径上都被释放。

use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::MAIN_SEPARATOR;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use crate::exception::Exception;
use crate::fs::{DavFile, FileSystem, Metadata};
use crate::path::clean;

#[derive(Clone)]
enum Node {
    Dir { modified: SystemTime },
    File { content: Arc<Mutex<FileContent>> },
}

struct FileContent {
    data: Vec<u8>,
    modified: SystemTime,
}

struct Shared {
    // 键为清理后的逻辑路径，根目录为 "/"
    tree: Mutex<BTreeMap<String, Node>>,
    open_handles: AtomicUsize,
}

/// 内存文件系统。克隆得到的是同一棵树的另一个引用。
#[derive(Clone)]
pub struct MemoryFs {
    shared: Arc<Shared>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn key_for(name: &str) -> Result<String, Exception> {
    if (MAIN_SEPARATOR != '/' && name.contains(MAIN_SEPARATOR)) || name.contains('\0') {
        return Err(Exception::InvalidPath);
    }
    Ok(clean(&format!("/{}", name)))
}

fn parent_key(key: &str) -> Option<String> {
    if key == "/" {
        return None;
    }
    match key.rsplit_once('/') {
        Some(("", _)) => Some("/".to_string()),
        Some((dir, _)) => Some(dir.to_string()),
        None => None,
    }
}

fn base_name(key: &str) -> String {
    match key.rsplit_once('/') {
        Some((_, base)) if !base.is_empty() => base.to_string(),
        _ => "/".to_string(),
    }
}

fn not_found(key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", key))
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut tree = BTreeMap::new();
        tree.insert(
            "/".to_string(),
            Node::Dir {
                modified: SystemTime::now(),
            },
        );
        Self {
            shared: Arc::new(Shared {
                tree: Mutex::new(tree),
                open_handles: AtomicUsize::new(0),
            }),
        }
    }

    /// 当前尚未释放的句柄数量
    pub fn open_handles(&self) -> usize {
        self.shared.open_handles.load(Ordering::SeqCst)
    }

    fn handle(&self, key: String, node: Node) -> Box<dyn DavFile> {
        self.shared.open_handles.fetch_add(1, Ordering::SeqCst);
        let kind = match node {
            Node::Dir { .. } => HandleKind::Dir { cursor: 0 },
            Node::File { content } => HandleKind::File { content, pos: 0 },
        };
        Box::new(MemoryFile {
            key,
            kind,
            shared: Arc::clone(&self.shared),
        })
    }
}

impl FileSystem for MemoryFs {
    fn open(&self, name: &str) -> io::Result<Box<dyn DavFile>> {
        let key = key_for(name)?;
        let node = lock(&self.shared.tree).get(&key).cloned();
        match node {
            Some(node) => Ok(self.handle(key, node)),
            None => Err(not_found(&key)),
        }
    }

    fn create(&self, name: &str) -> io::Result<Box<dyn DavFile>> {
        let key = key_for(name)?;
        let node = {
            let mut tree = lock(&self.shared.tree);
            match tree.get(&key) {
                Some(Node::Dir { .. }) => {
                    return Err(io::Error::other(format!("{} is a directory", key)));
                }
                Some(node @ Node::File { content }) => {
                    let mut content = lock(content);
                    content.data.clear();
                    content.modified = SystemTime::now();
                    node.clone()
                }
                None => {
                    let parent = parent_key(&key).ok_or_else(|| not_found(&key))?;
                    match tree.get(&parent) {
                        Some(Node::Dir { .. }) => {}
                        Some(Node::File { .. }) => {
                            return Err(io::Error::other(format!("{} is not a directory", parent)));
                        }
                        None => return Err(not_found(&parent)),
                    }
                    let node = Node::File {
                        content: Arc::new(Mutex::new(FileContent {
                            data: Vec::new(),
                            modified: SystemTime::now(),
                        })),
                    };
                    tree.insert(key.clone(), node.clone());
                    node
                }
            }
        };
        Ok(self.handle(key, node))
    }

    fn mkdir(&self, name: &str) -> io::Result<()> {
        let key = key_for(name)?;
        let mut tree = lock(&self.shared.tree);
        let mut current = String::new();
        for segment in key.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            match tree.get(&current) {
                Some(Node::Dir { .. }) => {}
                Some(Node::File { .. }) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} is a file", current),
                    ));
                }
                None => {
                    tree.insert(
                        current.clone(),
                        Node::Dir {
                            modified: SystemTime::now(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        let key = key_for(name)?;
        if key == "/" {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove the root",
            ));
        }
        let mut tree = lock(&self.shared.tree);
        match tree.get(&key) {
            None => Err(not_found(&key)),
            Some(Node::Dir { .. }) => {
                let child_prefix = format!("{}/", key);
                if tree.keys().any(|k| k.starts_with(&child_prefix)) {
                    return Err(io::Error::other(format!("{} is not empty", key)));
                }
                tree.remove(&key);
                Ok(())
            }
            Some(Node::File { .. }) => {
                tree.remove(&key);
                Ok(())
            }
        }
    }
}

enum HandleKind {
    Dir { cursor: usize },
    File { content: Arc<Mutex<FileContent>>, pos: u64 },
}

/// [`MemoryFs`] 返回的句柄，`drop` 时归还句柄计数。
pub struct MemoryFile {
    key: String,
    kind: HandleKind,
    shared: Arc<Shared>,
}

fn is_a_directory(key: &str) -> io::Error {
    io::Error::other(format!("{} is a directory", key))
}

impl MemoryFile {
    fn children(&self) -> Vec<Metadata> {
        let prefix = if self.key == "/" {
            "/".to_string()
        } else {
            format!("{}/", self.key)
        };
        let tree = lock(&self.shared.tree);
        tree.iter()
            .filter(|(k, _)| k.len() > prefix.len() && k.starts_with(&prefix))
            .filter(|(k, _)| !k[prefix.len()..].contains('/'))
            .map(|(k, node)| node_metadata(k, node))
            .collect()
    }
}

fn node_metadata(key: &str, node: &Node) -> Metadata {
    match node {
        Node::Dir { modified } => Metadata::new(base_name(key), true, 0, *modified),
        Node::File { content } => {
            let content = lock(content);
            Metadata::new(base_name(key), false, content.data.len() as u64, content.modified)
        }
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        self.shared.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DavFile for MemoryFile {
    fn stat(&self) -> io::Result<Metadata> {
        Ok(match &self.kind {
            HandleKind::Dir { .. } => {
                let tree = lock(&self.shared.tree);
                let modified = match tree.get(&self.key) {
                    Some(Node::Dir { modified }) => *modified,
                    _ => SystemTime::UNIX_EPOCH,
                };
                Metadata::new(base_name(&self.key), true, 0, modified)
            }
            HandleKind::File { content, .. } => {
                let content = lock(content);
                Metadata::new(
                    base_name(&self.key),
                    false,
                    content.data.len() as u64,
                    content.modified,
                )
            }
        })
    }

    fn read_dir(&mut self, limit: Option<usize>) -> io::Result<Vec<Metadata>> {
        let children = match self.kind {
            HandleKind::Dir { .. } => self.children(),
            HandleKind::File { .. } => {
                return Err(io::Error::other(format!("{} is not a directory", self.key)))
            }
        };
        let HandleKind::Dir { cursor } = &mut self.kind else {
            return Ok(Vec::new());
        };
        let start = (*cursor).min(children.len());
        let end = match limit {
            Some(n) => (start + n).min(children.len()),
            None => children.len(),
        };
        *cursor = end;
        Ok(children[start..end].to_vec())
    }
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let HandleKind::File { content, pos } = &mut self.kind else {
            return Err(is_a_directory(&self.key));
        };
        let content = lock(content);
        let start = (*pos as usize).min(content.data.len());
        let n = buf.len().min(content.data.len() - start);
        buf[..n].copy_from_slice(&content.data[start..start + n]);
        *pos += n as u64;
        Ok(n)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let HandleKind::File { content, pos } = &mut self.kind else {
            return Err(is_a_directory(&self.key));
        };
        let mut content = lock(content);
        let start = *pos as usize;
        let end = start + buf.len();
        if content.data.len() < end {
            content.data.resize(end, 0);
        }
        content.data[start..end].copy_from_slice(buf);
        content.modified = SystemTime::now();
        *pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let HandleKind::File { content, pos } = &mut self.kind else {
            return Err(is_a_directory(&self.key));
        };
        let len = lock(content).data.len() as i64;
        let next = match target {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => len + offset,
            SeekFrom::Current(offset) => *pos as i64 + offset,
        };
        if next < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative position",
            ));
        }
        *pos = next as u64;
        Ok(*pos)
    }
}
