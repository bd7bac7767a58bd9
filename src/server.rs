// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 传输层
//!
//! 基于 Tokio 的极简 HTTP/1.1 服务端，负责把 TCP 流中的请求交给 [`Router::handle`]：
//! - 每个连接一个绿色线程，每个连接只处理一个请求（`Connection: close`）
//! - 报文解析失败时直接返回 `400 Bad Request`，不会进入路由器
//! - 处理函数中的 panic 只会终止所在连接的任务，不影响监听循环

use std::{
    future::Future,
    sync::{Arc, Mutex},
    time::Instant,
};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::{request::Request, response::Response, router::Router};

/// 持有只读路由表的服务端
pub struct Server {
    router: Arc<Router>,
    read_buffer_size: usize,
    /// 原子追踪当前并发连接数
    active_connection: Arc<Mutex<u32>>,
}

impl Server {
    pub fn new(router: Router, read_buffer_size: usize) -> Self {
        Self {
            router: Arc::new(router),
            read_buffer_size,
            active_connection: Arc::new(Mutex::new(0u32)),
        }
    }

    /// 当前活跃连接数的共享句柄，供管理控制台查询
    pub fn active_connection(&self) -> Arc<Mutex<u32>> {
        Arc::clone(&self.active_connection)
    }

    /// 主事件循环：持续接收新连接，直到 `shutdown` 完成
    pub async fn serve(&self, listener: TcpListener, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut id: u128 = 0;

        loop {
            let (mut stream, addr) = tokio::select! {
                _ = &mut shutdown => {
                    info!("主循环接收到停机指令，正在退出...");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok(connection) => connection,
                    Err(e) => {
                        error!("接受TCP连接失败：{}", e);
                        continue;
                    }
                },
            };
            debug!("[ID{}]新的连接：{}", id, addr);

            let router = Arc::clone(&self.router);
            let active_connection = Arc::clone(&self.active_connection);
            let read_buffer_size = self.read_buffer_size;

            tokio::spawn(async move {
                let _guard = ConnectionGuard::enter(active_connection);
                handle_connection(&mut stream, id, &router, read_buffer_size).await;
            });
            id += 1;
        }
    }
}

/// 连接计数：进入时加 1，任务结束（包括处理函数 panic）时减 1
struct ConnectionGuard {
    active_connection: Arc<Mutex<u32>>,
}

impl ConnectionGuard {
    fn enter(active_connection: Arc<Mutex<u32>>) -> Self {
        if let Ok(mut lock) = active_connection.lock() {
            *lock += 1;
        }
        Self { active_connection }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Ok(mut lock) = self.active_connection.lock() {
            *lock -= 1;
        }
    }
}

/// # 连接处理器
///
/// 读取并解析请求，交给路由器分发，再把响应写回客户端。
pub async fn handle_connection(
    stream: &mut TcpStream,
    id: u128,
    router: &Router,
    read_buffer_size: usize,
) {
    let mut buffer = vec![0; read_buffer_size];
    let mut n = 0;

    // 请求头可能分多个 TCP 分段到达，读到空行或缓冲区写满为止
    while n < buffer.len() {
        match stream.read(&mut buffer[n..]).await {
            Ok(0) => break, // 客户端主动关闭连接
            Ok(read) => {
                n += read;
                if has_header_end(&buffer[..n]) {
                    break;
                }
            }
            Err(e) => {
                error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
                return;
            }
        }
    }
    if n == 0 {
        return;
    }
    debug!("[ID{}]HTTP请求接收完毕，共{}字节", id, n);

    let start_time = Instant::now();
    let mut response = Response::new();
    response.set_header("Connection", "close");

    match Request::try_from(&buffer[..n], id) {
        Ok(mut request) => {
            router.handle(&mut request, &mut response);
            if !response.is_ended() {
                warn!(
                    "[ID{}]{} {:?} 的处理链没有结束响应",
                    id,
                    request.method_name(),
                    request.path()
                );
            }
            info!(
                "[ID{}] {}, {}, {}, {}, {}, {}",
                id,
                request.version(),
                request.path().unwrap_or_default(),
                request.method_name(),
                response.status_code(),
                response.information(),
                request.user_agent(),
            );
        }
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败: {}，返回400", id, e);
            response.status(400).send("Bad Request");
        }
    }

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    if let Err(e) = stream.write_all(&response.as_bytes()).await {
        error!("[ID{}]发送响应失败: {}", id, e);
        return;
    }
    if let Err(e) = stream.flush().await {
        error!("[ID{}]刷新TCPStream失败: {}", id, e);
    }
}

/// 缓冲区中是否已出现标头结束的空行
fn has_header_end(buffer: &[u8]) -> bool {
    buffer.windows(4).any(|w| w == b"\r\n\r\n")
}
