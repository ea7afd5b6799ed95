// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! PUT 处理器：截断或新建资源，再把请求体完整复制进去。
//!
//! 写入不是原子的，复制失败会留下被截断的资源。

use std::io::{self, Read, Write};

use crate::{
    dav_debug, dav_info, dav_warn,
    exception::{Exception, Outcome},
    logging::DavLog,
    path::parent,
    server::{probe, Probe, ServerConfig},
};

/// 写入成功时返回 201（新建）或 204（覆盖）。
pub fn write(id: u128, path: &str, body: &mut dyn Read, config: &ServerConfig, log: &DavLog) -> Outcome {
    if config.read_only() {
        dav_warn!(log, "[ID{}]只读模式下拒绝写入{}", id, path);
        return Err(Exception::Forbidden);
    }

    let fs = config.fs();
    let existed = match probe(fs, path) {
        Probe::Directory => {
            dav_warn!(log, "[ID{}]{}是目录，不能写入", id, path);
            return Err(Exception::NotAllowed);
        }
        Probe::File => true,
        Probe::Missing => false,
    };

    let parent = parent(path);
    if !parent.is_empty() {
        if let Err(e) = fs.mkdir(&parent) {
            dav_warn!(log, "[ID{}]无法创建父目录{}: {}", id, parent, e);
        }
    }

    let mut file = match fs.create(path) {
        Ok(file) => file,
        Err(e) => {
            dav_warn!(log, "[ID{}]无法创建{}: {}", id, path, e);
            return Err(Exception::Conflict);
        }
    };
    let copied = io::copy(body, &mut file).and_then(|n| file.flush().map(|_| n));
    drop(file);

    match copied {
        Ok(n) => {
            dav_info!(log, "[ID{}]写入{}共{}字节", id, path, n);
            Ok(if existed { 204 } else { 201 })
        }
        Err(e) => {
            dav_warn!(log, "[ID{}]写入{}时出错: {}", id, path, e);
            dav_debug!(log, "[ID{}]{}可能只写入了部分内容", id, path);
            Err(Exception::Conflict)
        }
    }
}
