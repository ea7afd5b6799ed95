// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

use crate::exception::Exception;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_www_root")]
    www_root: String,
    #[serde(default = "default_prefix")]
    prefix: String,
    #[serde(default)]
    read_only: bool,
    #[serde(default)]
    listings: bool,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_streaming_threshold")]
    streaming_threshold: u64,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_enable_range_requests")]
    enable_range_requests: bool,
    #[serde(default = "default_max_header_size")]
    max_header_size: usize,
}

fn default_www_root() -> String {
    ".".to_string()
}

fn default_prefix() -> String {
    "/".to_string()
}

fn default_port() -> u16 {
    7878
}

fn default_local() -> bool {
    true
}

fn default_streaming_threshold() -> u64 {
    10485760 // 10MB
}

fn default_chunk_size() -> usize {
    262144 // 256KB
}

fn default_enable_range_requests() -> bool {
    true
}

fn default_max_header_size() -> usize {
    16384 // 16KB
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            www_root: default_www_root(),
            prefix: default_prefix(),
            read_only: false,
            listings: false,
            port: default_port(),
            local: default_local(),
            worker_threads: 0,
            streaming_threshold: default_streaming_threshold(),
            chunk_size: default_chunk_size(),
            enable_range_requests: default_enable_range_requests(),
            max_header_size: default_max_header_size(),
        }
    }

    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => {
                error!("无法打开配置文件{}：{}", filename, e);
                return Err(Exception::ConfigUnreadable);
            }
        };
        let mut str_val = String::new();
        if let Err(e) = file.read_to_string(&mut str_val) {
            error!("读取配置文件{}时出错：{}", filename, e);
            return Err(Exception::ConfigUnreadable);
        }
        Self::from_str(&str_val)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Self, Exception> {
        let mut raw_config: Config = match toml::from_str(text) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象：{}", e);
                return Err(Exception::ConfigInvalid);
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.chunk_size == 0 {
            warn!("chunk_size被设置为0，该值将被改为默认的{}。", default_chunk_size());
            raw_config.chunk_size = default_chunk_size();
        }
        Ok(raw_config)
    }
}

impl Config {
    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn listings(&self) -> bool {
        self.listings
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn streaming_threshold(&self) -> u64 {
        self.streaming_threshold
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn enable_range_requests(&self) -> bool {
        self.enable_range_requests
    }

    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config = Config::from_str("www_root = \"/srv/dav\"\n").unwrap();
        assert_eq!(config.www_root(), "/srv/dav");
        assert_eq!(config.prefix(), "/");
        assert!(!config.read_only());
        assert!(!config.listings());
        assert_eq!(config.port(), 7878);
        assert!(config.worker_threads() > 0);
        assert!(config.enable_range_requests());
    }

    #[test]
    fn test_full_config() {
        let text = r#"
            www_root = "./www"
            prefix = "/dav"
            read_only = true
            listings = true
            port = 8080
            local = false
            worker_threads = 2
            streaming_threshold = 1024
            chunk_size = 0
            enable_range_requests = false
            max_header_size = 4096
        "#;
        let config = Config::from_str(text).unwrap();
        assert_eq!(config.prefix(), "/dav");
        assert!(config.read_only());
        assert!(config.listings());
        assert_eq!(config.port(), 8080);
        assert!(!config.local());
        assert_eq!(config.worker_threads(), 2);
        assert_eq!(config.streaming_threshold(), 1024);
        assert_eq!(config.chunk_size(), 262144);
        assert!(!config.enable_range_requests());
        assert_eq!(config.max_header_size(), 4096);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert_eq!(Config::from_str("port = \"not a number\""), Err(Exception::ConfigInvalid));
    }

    #[test]
    fn test_missing_file() {
        assert_eq!(
            Config::from_toml("/definitely/not/here.toml"),
            Err(Exception::ConfigUnreadable)
        );
    }
}
