// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! DELETE 处理器。目录删除被永久禁用：对目录的 DELETE 不做任何修改并返回 204。

use crate::{
    dav_info, dav_warn, dav_error,
    exception::{Exception, Outcome},
    logging::DavLog,
    server::{probe, Probe, ServerConfig},
};

pub fn delete(id: u128, path: &str, config: &ServerConfig, log: &DavLog) -> Outcome {
    if config.read_only() {
        dav_warn!(log, "[ID{}]只读模式下拒绝删除{}", id, path);
        return Err(Exception::Forbidden);
    }

    let fs = config.fs();
    match probe(fs, path) {
        Probe::Missing => Err(Exception::NotFound),
        Probe::Directory => {
            dav_info!(log, "[ID{}]{}是目录，忽略删除请求", id, path);
            Ok(204)
        }
        Probe::File => match fs.remove(path) {
            Ok(()) => {
                dav_info!(log, "[ID{}]已删除{}", id, path);
                Ok(204)
            }
            Err(e) => {
                dav_error!(log, "[ID{}]删除{}失败: {}", id, path, e);
                Err(Exception::InternalError)
            }
        },
    }
}
