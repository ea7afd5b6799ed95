// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod config;
pub mod connection;
pub mod deleter;
pub mod exception;
pub mod fs;
pub mod logging;
pub mod param;
pub mod path;
pub mod reader;
pub mod request;
pub mod response;
pub mod serve;
pub mod server;
pub mod util;
pub mod writer;

pub use config::Config;
pub use connection::ConnectionHandler;
pub use exception::{Exception, Outcome};
pub use fs::{DavFile, EmptyFile, FileSystem, LocalDir, MemoryFs, Metadata};
pub use logging::{DavLog, MemoryLog};
pub use param::{HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::{Body, Response};
pub use server::{DavServer, ServerConfig};
