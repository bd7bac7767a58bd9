// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由器演示服务
//!
//! 在 Tokio 多线程运行时上启动一个基于 `webrouter` 的 HTTP 服务，演示：
//! - 具名参数与通配参数的路由
//! - 多个处理函数组成的处理链（日志、鉴权中间件）
//! - not-found 处理链
//! - 后台管理控制台（CLI 指令交互）

use std::net::{Ipv4Addr, SocketAddrV4};

use log::{error, info, warn};
use serde_json::json;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpListener,
    runtime::Builder,
    sync::oneshot,
};

use webrouter::{endpoint, handler_fn, BoxedHandler, Config, Exception, Router, Server};

/// 演示用的管理员令牌
const ADMIN_TOKEN: &str = "Bearer letmein";

fn main() {
    // 1. 初始化日志系统：通过外部 YAML 配置级别与输出目的地
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
    }

    // 2. 环境配置加载：配置文件缺失时使用默认配置
    let config = match Config::from_toml("config/development.toml") {
        Ok(c) => {
            info!("配置文件已载入");
            c
        }
        Err(e) => {
            warn!("{}，使用默认配置", e);
            Config::new()
        }
    };

    // 3. 路由表在启动时一次性建立，注册错误直接终止启动
    let router = match build_router() {
        Ok(r) => r,
        Err(e) => {
            error!("路由注册失败：{}", e);
            return;
        }
    };
    for route in router.routes() {
        info!("路由 {} {:?}", route.pattern(), route.methods());
    }

    // 4. 异步运行时定制：根据配置文件动态分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            error!("无法创建Tokio运行时：{}", e);
            return;
        }
    };

    runtime.block_on(run(config, router));
}

async fn run(config: Config, router: Router) {
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    let socket = SocketAddrV4::new(address, config.port());
    let listener = match TcpListener::bind(socket).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定地址：{}，错误：{}", socket, e);
            return;
        }
    };
    info!("服务端在{}上监听Socket连接", socket);

    let server = Server::new(router, config.read_buffer_size());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    // 启动交互式管理控制台任务，不阻塞监听循环
    let active_connection = server.active_connection();
    tokio::spawn(async move {
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
                    println!("停机指令已激活，服务器将停止接收新连接...");
                    let _ = shutdown_tx.send(());
                    break;
                }
                "help" => {
                    println!("== Webrouter Help ==");
                    println!("stop   - 发出停机信号");
                    println!("status - 查看当前服务器运行状态");
                    println!("help   - 显示此帮助信息");
                    println!("====================");
                }
                "status" => {
                    let active_count = active_connection.lock().map(|c| *c).unwrap_or_default();
                    println!("== Webrouter 状态 ===");
                    println!("当前活跃连接数: {}", active_count);
                    println!("====================");
                }
                cmd => println!("无效的命令：{}", cmd),
            }
        }
    });

    server
        .serve(listener, async {
            let _ = shutdown_rx.await;
        })
        .await;
}

fn build_router() -> Result<Router, Exception> {
    let mut router = Router::new();

    router.route("/")?.get([endpoint(|_req, res| {
        res.send("webrouter is running");
    })])?;

    router
        .route("/users/:id")?
        .get([access_log(), endpoint(|req, res| {
            res.json(&json!({ "id": req.param("id") }));
        })])?
        .delete([
            require_admin(),
            endpoint(|req, res| {
                info!("删除用户 {:?}", req.param("id"));
                res.status(204).end();
            }),
        ])?;

    router.route("/files/*")?.get([endpoint(|req, res| {
        res.json(&json!({ "path": req.param("0") }));
    })])?;

    router.route("/admin")?.get([
        access_log(),
        require_admin(),
        endpoint(|req, res| {
            let user = req.local("role").unwrap_or("unknown").to_string();
            res.json(&json!({ "role": user }));
        }),
    ])?;

    router.not_found([endpoint(|req, res| {
        res.status(404)
            .json(&json!({ "error": "not found", "path": req.path() }));
    })])?;

    Ok(router)
}

/// 记录请求后继续执行
fn access_log() -> BoxedHandler {
    handler_fn(|req, res, next| {
        info!("{} {:?} params={:?}", req.method_name(), req.path(), req.params());
        next.proceed(req, res);
    })
}

/// 校验管理员令牌，失败时直接返回 401 并终止处理链
fn require_admin() -> BoxedHandler {
    handler_fn(|req, res, next| {
        if req.header("authorization") == Some(ADMIN_TOKEN) {
            req.set_local("role", "admin");
            next.proceed(req, res);
        } else {
            warn!("{} {:?} 鉴权失败", req.method_name(), req.path());
            res.status(401).send("Unauthorized");
        }
    })
}
