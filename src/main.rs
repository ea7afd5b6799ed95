// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # davserver
//!
//! 基于 Tokio 运行时的 WebDAV 风格文件服务器，支持 GET/HEAD/PUT/DELETE。
//! - 配置文件为 TOML，路径由第一个命令行参数给出，默认 `config/development.toml`
//! - 日志由 log4rs 输出，配置文件为 `config/log4rs.yaml`
//! - 后台管理控制台（stop / status / help）

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    process,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use davserver::{Config, ConnectionHandler, DavLog, DavServer, ServerConfig};
use log::{debug, error, info, LevelFilter};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpListener,
    runtime::Builder,
    sync::Notify,
};

const DEFAULT_CONFIG: &str = "config/development.toml";
const LOG_CONFIG: &str = "config/log4rs.yaml";

fn main() {
    // 1. 日志：同一个 log4rs 日志器既注入请求处理核心，也安装为全局日志器
    let dav_log = match DavLog::from_log4rs_file(LOG_CONFIG) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("日志系统初始化失败：{}", e);
            process::exit(1);
        }
    };
    if let Err(e) = log::set_boxed_logger(Box::new(dav_log.clone())) {
        eprintln!("无法安装全局日志器：{}", e);
        process::exit(1);
    }
    log::set_max_level(LevelFilter::Trace);

    // 2. 配置
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = match Config::from_toml(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("无法载入配置文件{}：{}", config_path, e);
            process::exit(1);
        }
    };
    info!("配置文件{}已载入", config_path);
    info!("www root: {}, prefix: {}", config.www_root(), config.prefix());
    if config.read_only() {
        info!("服务器以只读模式运行");
    }

    // 3. 运行时
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建Tokio运行时：{}", e);
            process::exit(1);
        }
    };

    let server = Arc::new(DavServer::new(ServerConfig::from_config(&config), dav_log));
    let handler = ConnectionHandler::from_config(server, &config);

    if let Err(e) = runtime.block_on(serve(config, handler)) {
        error!("服务器异常退出：{}", e);
        process::exit(1);
    }
    info!("服务器已关闭");
}

async fn serve(config: Config, handler: ConnectionHandler) -> std::io::Result<()> {
    let port = config.port();
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    let socket = SocketAddrV4::new(address, port);
    let listener = match TcpListener::bind(socket).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定{}：{}", socket, e);
            return Err(e);
        }
    };
    info!("服务端在{}上监听Socket连接", socket);

    let shutdown = Arc::new(Notify::new());
    let active_connection = Arc::new(AtomicUsize::new(0));
    tokio::spawn(console(Arc::clone(&shutdown), Arc::clone(&active_connection)));

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("主循环接收到停机指令，正在退出...");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("收到Ctrl-C，正在退出...");
                break;
            }
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("接受连接失败：{}", e);
                        continue;
                    }
                };
                debug!("新的连接：{}", addr);
                let handler = handler.clone();
                let active_connection = Arc::clone(&active_connection);
                tokio::spawn(async move {
                    active_connection.fetch_add(1, Ordering::SeqCst);
                    handler.handle(stream, Some(addr)).await;
                    active_connection.fetch_sub(1, Ordering::SeqCst);
                });
            }
        }
    }
    Ok(())
}

/// 后台管理控制台，从标准输入读取运维指令
async fn console(shutdown: Arc<Notify>, active_connection: Arc<AtomicUsize>) {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    loop {
        input.clear();
        match reader.read_line(&mut input).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        match input.trim() {
            "stop" => {
                println!("停机指令已激活，服务器将停止接受新连接...");
                shutdown.notify_one();
                break;
            }
            "help" => {
                println!("== davserver Help ==");
                println!("stop   - 发出停机信号");
                println!("status - 查看当前服务器运行状态");
                println!("help   - 显示此帮助信息");
                println!("====================");
            }
            "status" => {
                println!("== davserver 状态 ===");
                println!("当前活跃连接数: {}", active_connection.load(Ordering::SeqCst));
                println!("====================");
            }
            "" => {}
            cmd => println!("无效的命令：{}", cmd),
        }
    }
}
