// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了路由器在注册阶段与请求处理阶段可能产生的各类异常。
//!
//! ## 设计意图
//! - **注册期快速失败**：路由、方法与 not-found 处理链的注册参数在调用时立即校验，
//!   错误同步返回给调用方，而不是拖到请求到来时才暴露。
//! - **传输层错误**：HTTP 报文解析失败、配置文件不可读等错误也集中在这里，
//!   便于上层统一转换为日志或 HTTP 状态码。
//! - **非错误情形**：参数解码失败与路由未命中不属于异常，前者降级为 `None`，
//!   后者交给 not-found 处理链或默认 404。

use std::fmt;

/// 路由器与其传输层可能返回的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 注册参数非法：空的路径模式、无法编译的路径模式，或者没有提供任何处理函数。
    InvalidArgument,
    /// 前置条件不满足：在注册任何路由之前就尝试为某个方法挂载处理链。
    PreconditionFailed,
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 客户端使用了路由器不支持的 HTTP 方法。
    UnSupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本。
    UnsupportedHttpVersion,
    /// 请求行缺少必要的组成部分。
    MalformedRequest,
    /// 配置文件不存在或无法读取。
    ConfigUnreadable,
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidArgument => write!(f, "Invalid argument"),
            PreconditionFailed => write!(f, "Cannot add a method handler for an undefined route"),
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            MalformedRequest => write!(f, "Malformed request line"),
            ConfigUnreadable => write!(f, "Config file can't be read"),
        }
    }
}

impl std::error::Error for Exception {}
