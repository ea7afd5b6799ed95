// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了服务器在启动与请求处理生命周期中可能出现的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖协议解析错误、路径错误、存储后端操作结果以及配置错误。
//! - **语义映射**：每个请求相关的变体都通过 [`Exception::status_code`] 一对一映射到 HTTP 状态码，
//!   处理器内部捕获的后端错误不会继续向外传播。

use std::fmt;
use std::io;

/// 服务器处理过程中发生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 请求头无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求行中的方法名无法识别。
    UnSupportedRequestMethod,
    /// 客户端使用了不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
    /// 请求行或标头格式不正确（如 Content-Length 非数字、分块编码损坏）。
    MalformedRequest,
    /// 请求头超过了配置允许的最大长度。
    HeaderTooLarge,
    /// 逻辑路径包含空字节或宿主系统保留的分隔符。对应 `400 Bad Request`。
    InvalidPath,
    /// 资源不存在，或打开/读取元数据失败。对应 `404 Not Found`。
    NotFound,
    /// 服务器处于只读模式，或目录列表被禁用。对应 `403 Forbidden`。
    Forbidden,
    /// 方法不适用于目标资源（如对目录执行 PUT）。对应 `405 Method Not Allowed`。
    NotAllowed,
    /// 创建资源或写入请求体失败。对应 `409 Conflict`。
    Conflict,
    /// 删除资源失败等服务端错误。对应 `500 Internal Server Error`。
    InternalError,
    /// 配置文件无法读取。
    ConfigUnreadable,
    /// 配置文件内容无法解析。
    ConfigInvalid,
    /// 日志系统初始化失败。
    LoggerInitFailed,
}

use Exception::*;

impl Exception {
    /// 将请求相关的异常映射为 HTTP 状态码。
    ///
    /// 启动阶段的异常（配置、日志）不会出现在请求路径上，统一按 500 处理。
    pub fn status_code(&self) -> u16 {
        match self {
            RequestIsNotUtf8 | UnSupportedRequestMethod | UnsupportedHttpVersion
            | MalformedRequest | HeaderTooLarge | InvalidPath => 400,
            NotFound => 404,
            Forbidden => 403,
            NotAllowed => 405,
            Conflict => 409,
            InternalError | ConfigUnreadable | ConfigInvalid | LoggerInitFailed => 500,
        }
    }
}

impl fmt::Display for Exception {
    /// 根据错误类型写入人类可读的描述文本。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            MalformedRequest => write!(f, "Malformed request"),
            HeaderTooLarge => write!(f, "Request header too large"),
            InvalidPath => write!(f, "invalid character in file path"),
            NotFound => write!(f, "Resource not found (404)"),
            Forbidden => write!(f, "Forbidden (403)"),
            NotAllowed => write!(f, "Method not allowed on this resource (405)"),
            Conflict => write!(f, "Conflict (409)"),
            InternalError => write!(f, "Internal server error (500)"),
            ConfigUnreadable => write!(f, "Couldn't read the configuration file"),
            ConfigInvalid => write!(f, "Couldn't parse the configuration file"),
            LoggerInitFailed => write!(f, "Couldn't initialize the logger"),
        }
    }
}

impl std::error::Error for Exception {}

/// 存储后端以 `io::Error` 报告路径错误，`InvalidPath` 以 `InvalidInput` 的形式携带。
impl From<Exception> for io::Error {
    fn from(e: Exception) -> Self {
        let kind = match e {
            InvalidPath => io::ErrorKind::InvalidInput,
            NotFound => io::ErrorKind::NotFound,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

/// 请求处理器的结果：成功时给出状态码，失败时给出异常。
pub type Outcome = Result<u16, Exception>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(NotFound.status_code(), 404);
        assert_eq!(Forbidden.status_code(), 403);
        assert_eq!(NotAllowed.status_code(), 405);
        assert_eq!(Conflict.status_code(), 409);
        assert_eq!(InternalError.status_code(), 500);
        assert_eq!(InvalidPath.status_code(), 400);
        assert_eq!(UnSupportedRequestMethod.status_code(), 400);
    }

    #[test]
    fn test_invalid_path_into_io_error() {
        let err: io::Error = InvalidPath.into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        let inner = err.get_ref().and_then(|e| e.downcast_ref::<Exception>());
        assert_eq!(inner, Some(&InvalidPath));
    }
}
