// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 日志注入
//!
//! 请求处理核心不直接使用全局的 `log` 宏，而是通过构造时注入的 [`DavLog`] 输出日志。
//! 生产环境下由 log4rs 提供实现，测试时可以换成 [`MemoryLog`] 收集日志记录。

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::{Level, Log, Metadata, Record};
use log4rs::config::{load_config_file, Deserializers};

use crate::exception::Exception;

/// 所有核心日志使用的 target
pub const LOG_TARGET: &str = "davserver";

/// 注入到服务器中的日志收集器，克隆代价为一次引用计数。
#[derive(Clone)]
pub struct DavLog {
    inner: Arc<dyn Log>,
}

impl DavLog {
    pub fn new(inner: Arc<dyn Log>) -> Self {
        Self { inner }
    }

    /// 读取 log4rs 的 YAML 配置文件并构建独立的 log4rs 日志器。
    pub fn from_log4rs_file(path: impl AsRef<Path>) -> Result<Self, Exception> {
        let config = match load_config_file(path.as_ref(), Deserializers::default()) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("无法加载日志配置文件{}：{}", path.as_ref().display(), e);
                return Err(Exception::LoggerInitFailed);
            }
        };
        Ok(Self::new(Arc::new(log4rs::Logger::new(config))))
    }

    /// 丢弃所有日志
    pub fn discard() -> Self {
        Self::new(Arc::new(NopLog))
    }

    /// 输出一条日志。`location` 为调用处的模块路径、文件与行号，由 `dav_*!` 宏填入。
    pub fn write(&self, level: Level, location: (&'static str, &'static str, u32), args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(LOG_TARGET).build();
        if !self.inner.enabled(&metadata) {
            return;
        }
        let (module_path, file, line) = location;
        self.inner.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(module_path))
                .file_static(Some(file))
                .line(Some(line))
                .build(),
        );
    }
}

impl Log for DavLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        self.inner.log(record)
    }

    fn flush(&self) {
        self.inner.flush()
    }
}

impl fmt::Debug for DavLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DavLog").finish_non_exhaustive()
    }
}

struct NopLog;

impl Log for NopLog {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        false
    }

    fn log(&self, _: &Record<'_>) {}

    fn flush(&self) {}
}

/// 把日志记录保存在内存里，测试用。
#[derive(Default)]
pub struct MemoryLog {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收集的全部日志（级别与格式化后的消息）
    pub fn records(&self) -> Vec<(Level, String)> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|(_, msg)| msg.contains(needle))
    }
}

impl Log for MemoryLog {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let entry = (record.level(), record.args().to_string());
        match self.records.lock() {
            Ok(mut records) => records.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    fn flush(&self) {}
}

/// 通过注入的 [`DavLog`] 输出日志：`dav_log!(log, Level::Info, "...", args)`
#[macro_export]
macro_rules! dav_log {
    ($log:expr, $level:expr, $($arg:tt)+) => {
        $log.write(
            $level,
            (::std::module_path!(), ::std::file!(), ::std::line!()),
            format_args!($($arg)+),
        )
    };
}

#[macro_export]
macro_rules! dav_debug {
    ($log:expr, $($arg:tt)+) => { $crate::dav_log!($log, ::log::Level::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! dav_info {
    ($log:expr, $($arg:tt)+) => { $crate::dav_log!($log, ::log::Level::Info, $($arg)+) };
}

#[macro_export]
macro_rules! dav_warn {
    ($log:expr, $($arg:tt)+) => { $crate::dav_log!($log, ::log::Level::Warn, $($arg)+) };
}

#[macro_export]
macro_rules! dav_error {
    ($log:expr, $($arg:tt)+) => { $crate::dav_log!($log, ::log::Level::Error, $($arg)+) };
}
