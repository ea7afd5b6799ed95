// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 限制在宿主机目录子树内的本地文件系统后端。

use std::fs::{self, File, OpenOptions, ReadDir};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::time::SystemTime;

use crate::exception::Exception;
use crate::fs::{DavFile, FileSystem, Metadata};
use crate::path::clean;

/// 以 `root` 为根的本地文件系统。空的 `root` 视为当前目录 `.`。
#[derive(Debug, Clone)]
pub struct LocalDir {
    root: PathBuf,
}

impl LocalDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 把逻辑路径映射到宿主机路径。
    ///
    /// 含空字节或宿主系统分隔符（非 `/`）的名字返回 [`Exception::InvalidPath`]；
    /// 其余名字先在 `/` 下做词法清理再拼接到根目录上，结果不会越出根目录。
    pub fn sanitize(&self, name: &str) -> Result<PathBuf, Exception> {
        if (MAIN_SEPARATOR != '/' && name.contains(MAIN_SEPARATOR)) || name.contains('\0') {
            return Err(Exception::InvalidPath);
        }

        let root = if self.root.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.root.as_path()
        };

        let cleaned = clean(&format!("/{}", name));
        let mut full = root.to_path_buf();
        for segment in cleaned.split('/').filter(|s| !s.is_empty()) {
            full.push(segment);
        }
        Ok(full)
    }
}

impl FileSystem for LocalDir {
    fn open(&self, name: &str) -> io::Result<Box<dyn DavFile>> {
        let path = self.sanitize(name)?;
        let metadata = fs::metadata(&path)?;
        let inner = if metadata.is_dir() {
            Inner::Dir(None)
        } else {
            Inner::File(File::open(&path)?)
        };
        Ok(Box::new(LocalFile { path, inner }))
    }

    fn create(&self, name: &str) -> io::Result<Box<dyn DavFile>> {
        let path = self.sanitize(name)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Ok(Box::new(LocalFile {
            path,
            inner: Inner::File(file),
        }))
    }

    fn mkdir(&self, name: &str) -> io::Result<()> {
        let path = self.sanitize(name)?;
        fs::create_dir_all(path)
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        let path = self.sanitize(name)?;
        if fs::symlink_metadata(&path)?.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
    }
}

enum Inner {
    File(File),
    // 目录句柄不持有文件描述符，read_dir 时才打开迭代器
    Dir(Option<ReadDir>),
}

/// [`LocalDir`] 返回的句柄。
pub struct LocalFile {
    path: PathBuf,
    inner: Inner,
}

impl LocalFile {
    fn file_mut(&mut self) -> io::Result<&mut File> {
        match &mut self.inner {
            Inner::File(file) => Ok(file),
            Inner::Dir(_) => Err(io::Error::other(format!(
                "{} is a directory",
                self.path.display()
            ))),
        }
    }
}

fn to_metadata(name: String, meta: &fs::Metadata) -> Metadata {
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    Metadata::new(name, meta.is_dir(), meta.len(), modified)
}

impl DavFile for LocalFile {
    fn stat(&self) -> io::Result<Metadata> {
        let meta = match &self.inner {
            Inner::File(file) => file.metadata()?,
            Inner::Dir(_) => fs::metadata(&self.path)?,
        };
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());
        Ok(to_metadata(name, &meta))
    }

    fn read_dir(&mut self, limit: Option<usize>) -> io::Result<Vec<Metadata>> {
        let path = self.path.clone();
        let cursor = match &mut self.inner {
            Inner::Dir(cursor) => cursor,
            Inner::File(_) => {
                return Err(io::Error::other(format!("{} is not a directory", path.display())))
            }
        };
        if cursor.is_none() {
            *cursor = Some(fs::read_dir(&path)?);
        }
        let entries = match cursor.as_mut() {
            Some(entries) => entries,
            None => return Ok(Vec::new()),
        };

        let mut result = Vec::new();
        while limit.map_or(true, |n| result.len() < n) {
            let entry = match entries.next() {
                Some(entry) => entry?,
                None => break,
            };
            let meta = entry.metadata()?;
            result.push(to_metadata(entry.file_name().to_string_lossy().into_owned(), &meta));
        }
        Ok(result)
    }
}

impl Read for LocalFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file_mut()?.read(buf)
    }
}

impl Write for LocalFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file_mut()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file_mut()?.flush()
    }
}

impl Seek for LocalFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file_mut()?.seek(pos)
    }
}
