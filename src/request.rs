// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求模块
//!
//! `Request` 是路由器分发时读写的请求对象。它既可以由传输层从 TCP 流中的原始字节解析而来，
//! 也可以由嵌入方直接构造。路由器对它的要求只有三点：
//! 1. 能给出 HTTP 方法名，以及它是否属于可注册的方法；
//! 2. 能给出已解析的路径，或者退而求其次，给出通配捕获到的原始位置参数；
//! 3. 有一个可被路由器整体覆盖的路径参数表。

use std::collections::HashMap;

use log::error;

use crate::{exception::Exception, param::*};

/// 路由器分发时使用的请求对象。
#[derive(Debug, Clone)]
pub struct Request {
    /// 请求行中的方法名（大写），可以是路由器无法注册的方法，例如 `HEAD`
    method_name: String,
    /// 方法名对应的可注册方法；为 `None` 时任何路由都不会命中
    method: Option<HttpRequestMethod>,
    /// 已解析的请求路径（不含查询字符串）
    path: Option<String>,
    /// 查询字符串（不含 `?`）
    query: Option<String>,
    /// 上游通配捕获到的原始位置参数，仅在 `path` 缺失时用于还原匹配路径
    raw_params: Vec<String>,
    /// 路由器绑定的路径参数；解码失败或可选段缺席的参数值为 `None`
    params: HashMap<String, Option<String>>,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 请求头，字段名统一为小写
    headers: HashMap<String, String>,
    /// 中间件向后续处理函数传递数据用的键值表
    locals: HashMap<String, String>,
}

impl Request {
    /// 以已解析的路径构造请求
    pub fn new(method: HttpRequestMethod, path: &str) -> Self {
        Self {
            method_name: method.to_string(),
            method: Some(method),
            path: Some(path.to_string()),
            query: None,
            raw_params: vec![],
            params: HashMap::new(),
            version: HttpVersion::V1_1,
            headers: HashMap::new(),
            locals: HashMap::new(),
        }
    }

    /// 以任意方法名构造请求，方法名不区分大小写
    pub fn from_method_name(method_name: &str, path: &str) -> Self {
        Self {
            method_name: method_name.to_uppercase(),
            method: method_name.parse().ok(),
            ..Self::new(HttpRequestMethod::Get, path)
        }
    }

    /// 以上游通配捕获的位置参数构造请求，路径留空交给路由器还原
    pub fn from_raw_params(method: HttpRequestMethod, raw_params: Vec<String>) -> Self {
        Self {
            path: None,
            raw_params,
            ..Self::new(method, "/")
        }
    }

    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：确保请求数据是合法的 UTF-8 字符串。
    /// 2. 解析请求行：提取方法、路径、查询字符串和协议版本。
    /// 3. 逐行解析标头，直到遇到空行。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 连接 ID，用于在多线程环境下追踪日志。
    ///
    /// # 错误处理
    /// 如果请求格式不符合 HTTP 规范或使用了不支持的协议版本，将返回相应的 `Exception`。
    /// 方法名只要是合法的 token 就会被接受，是否有对应的处理链由路由器决定。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut request_lines = request_string.split(CRLF);
        let first_line = request_lines.next().unwrap_or_default();

        // 请求行，例如 "GET /users/42?full=1 HTTP/1.1"
        let first_line_parts: Vec<&str> = first_line.split(' ').collect();
        if first_line_parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, first_line);
            return Err(Exception::MalformedRequest);
        }

        let method_name = first_line_parts[0];
        if !is_token(method_name) {
            error!("[ID{}]HTTP请求方法不合法：{}", id, method_name);
            return Err(Exception::MalformedRequest);
        }

        let version_str = first_line_parts[first_line_parts.len() - 1].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 路径中出现空格虽然不规范，但尝试通过 join 恢复
        let target = first_line_parts[1..first_line_parts.len() - 1].join(" ");
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (target, None),
        };

        let mut headers = HashMap::new();
        for line in request_lines {
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_lowercase(), value.trim().to_string());
            }
        }

        Ok(Self {
            query,
            version,
            headers,
            ..Self::from_method_name(method_name, &path)
        })
    }
}

/// RFC 9110 的 token：由 tchar 组成的非空字符串
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

// --- 访问器实现 ---

impl Request {
    /// 获取可注册的请求方法；`HEAD` 等路由器不支持的方法返回 `None`
    pub fn method(&self) -> Option<HttpRequestMethod> {
        self.method
    }

    /// 获取请求行中的方法名
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// 获取已解析的请求路径
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// 获取查询字符串
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// 获取上游传入的原始位置参数
    pub fn raw_params(&self) -> &[String] {
        &self.raw_params
    }

    /// 获取 HTTP 协议版本
    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    /// 获取路由器绑定的全部路径参数
    pub fn params(&self) -> &HashMap<String, Option<String>> {
        &self.params
    }

    /// 获取单个路径参数；参数不存在或解码失败时返回 `None`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(|v| v.as_deref())
    }

    /// 整体替换路径参数表，先前的参数全部丢弃
    pub fn set_params(&mut self, params: HashMap<String, Option<String>>) {
        self.params = params;
    }

    /// 获取请求头，字段名大小写不敏感
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    /// 获取用户代理字符串
    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or_default()
    }

    pub fn local(&self, key: &str) -> Option<&str> {
        self.locals.get(key).map(String::as_str)
    }

    pub fn set_local(&mut self, key: &str, value: &str) {
        self.locals.insert(key.to_string(), value.to_string());
    }
}
