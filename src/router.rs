// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由模块
//!
//! 该模块是整个库的核心，由两部分组成：
//! 1. **路由表**：按注册顺序保存的路由条目，每条路由包含编译后的路径匹配器、
//!    参数名列表，以及“HTTP 方法 → 处理链”的映射。通过 [`Router::route`] 与
//!    各个方法注册函数以构建器的方式逐步建立。
//! 2. **分发器**：唯一的请求入口 [`Router::handle`]。对每个请求线性扫描路由表，
//!    第一个路径匹配且注册了该方法的路由胜出，绑定路径参数后执行其处理链；
//!    没有任何路由命中时执行 not-found 处理链，或直接返回空响应体的 404。
//!
//! ## 处理链
//! 每个处理函数都会收到一个 [`Next`]。调用 [`Next::proceed`] 会执行链上的下一个函数，
//! 不调用则链条就此终止（例如鉴权失败时直接返回 401）。`proceed` 按值消费 `Next`，
//! 同一个处理函数不可能让后续处理函数被执行两次。链上最后一个处理函数收到的 `Next`
//! 是终结的，对它调用 `proceed` 不会产生任何效果。
//!
//! ## 并发
//! 注册阶段需要 `&mut Router`，请求阶段只需要 `&Router`。建立完成后可放进 `Arc`
//! 在多个 Tokio 任务之间共享，无需加锁。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::{
    exception::Exception,
    param::{HttpRequestMethod, SUPPORTED_METHODS},
    pattern::{self, PathMatcher},
    request::Request,
    response::Response,
    util::{decode_component, normalize_path},
};

/// 处理函数。
///
/// 任何签名为 `Fn(&mut Request, &mut Response, Next<'_>)` 的闭包或函数都自动实现该 trait。
pub trait Handler: Send + Sync {
    fn call(&self, req: &mut Request, res: &mut Response, next: Next<'_>);
}

impl<F> Handler for F
where
    F: Fn(&mut Request, &mut Response, Next<'_>) + Send + Sync,
{
    fn call(&self, req: &mut Request, res: &mut Response, next: Next<'_>) {
        self(req, res, next)
    }
}

/// 路由表中保存的处理函数
pub type BoxedHandler = Arc<dyn Handler>;

/// 把闭包包装成可注册的处理函数
pub fn handler_fn<F>(f: F) -> BoxedHandler
where
    F: Fn(&mut Request, &mut Response, Next<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 把不需要继续传递的终端闭包包装成处理函数，通常放在处理链的最后
pub fn endpoint<F>(f: F) -> BoxedHandler
where
    F: Fn(&mut Request, &mut Response) + Send + Sync + 'static,
{
    handler_fn(move |req, res, _next| f(req, res))
}

/// 处理链的延续，持有当前处理函数之后的全部处理函数。
pub struct Next<'a> {
    remaining: &'a [BoxedHandler],
}

impl<'a> Next<'a> {
    /// 执行链上的下一个处理函数
    pub fn proceed(self, req: &mut Request, res: &mut Response) {
        run_chain(self.remaining, req, res);
    }

    /// 当前处理函数是否为链上的最后一个
    pub fn is_terminal(&self) -> bool {
        self.remaining.is_empty()
    }
}

fn run_chain(handlers: &[BoxedHandler], req: &mut Request, res: &mut Response) {
    if let Some((head, tail)) = handlers.split_first() {
        head.call(req, res, Next { remaining: tail });
    }
}

/// 非空的有序处理链
#[derive(Clone)]
pub struct Chain {
    handlers: Vec<BoxedHandler>,
}

impl Chain {
    /// 构造处理链，至少需要一个处理函数，否则返回 `Exception::InvalidArgument`
    pub fn new(handlers: impl IntoIterator<Item = BoxedHandler>) -> Result<Self, Exception> {
        let handlers: Vec<BoxedHandler> = handlers.into_iter().collect();
        if handlers.is_empty() {
            return Err(Exception::InvalidArgument);
        }
        Ok(Self { handlers })
    }

    /// 从第一个处理函数开始执行
    pub fn run(&self, req: &mut Request, res: &mut Response) {
        run_chain(&self.handlers, req, res);
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.len()).finish()
    }
}

/// 路由表中的一条路由
pub struct Route {
    pattern: String,
    matcher: PathMatcher,
    param_names: Vec<String>,
    method_handlers: HashMap<HttpRequestMethod, Chain>,
}

impl Route {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// 已注册处理链的方法，按 `SUPPORTED_METHODS` 的顺序排列
    pub fn methods(&self) -> Vec<HttpRequestMethod> {
        SUPPORTED_METHODS
            .into_iter()
            .filter(|m| self.method_handlers.contains_key(m))
            .collect()
    }

    pub fn chain(&self, method: HttpRequestMethod) -> Option<&Chain> {
        self.method_handlers.get(&method)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("regex", &self.matcher.as_str())
            .field("param_names", &self.param_names)
            .field("methods", &self.methods())
            .finish()
    }
}

/// 按注册顺序匹配的 HTTP 请求路由器。
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
    /// 最近一次注册的路由，方法注册总是挂在它上面
    idx: Option<usize>,
    not_found: Option<Chain>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// 编译路径模式并追加一条新路由，之后的方法注册都作用于这条路由。
    ///
    /// # 错误处理
    /// 模式为空或无法编译时返回 `Exception::InvalidArgument`。
    pub fn route(&mut self, pattern: &str) -> Result<&mut Self, Exception> {
        if pattern.is_empty() {
            return Err(Exception::InvalidArgument);
        }
        let (matcher, param_names) = pattern::compile(pattern)?;
        debug!("注册路由 {}，参数：{:?}", pattern, param_names);

        self.routes.push(Route {
            pattern: pattern.to_string(),
            matcher,
            param_names,
            method_handlers: HashMap::new(),
        });
        self.idx = Some(self.routes.len() - 1);
        Ok(self)
    }

    /// 为当前路由挂载某个方法的处理链。
    ///
    /// 同一路由同一方法只有第一次注册生效，之后的注册被忽略（记录一条警告）。
    ///
    /// # 错误处理
    /// - 没有提供任何处理函数：`Exception::InvalidArgument`
    /// - 尚未注册任何路由：`Exception::PreconditionFailed`
    pub fn method(
        &mut self,
        method: HttpRequestMethod,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, Exception> {
        let chain = Chain::new(handlers)?;
        let Some(idx) = self.idx else {
            warn!("尚未注册任何路由，无法挂载 {} 处理链", method);
            return Err(Exception::PreconditionFailed);
        };

        let route = &mut self.routes[idx];
        if route.method_handlers.contains_key(&method) {
            warn!("路由 {} 已注册 {} 处理链，本次注册被忽略", route.pattern, method);
        } else {
            debug!("路由 {} 挂载 {} 处理链，共{}个处理函数", route.pattern, method, chain.len());
            route.method_handlers.insert(method, chain);
        }
        Ok(self)
    }

    pub fn get(
        &mut self,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, Exception> {
        self.method(HttpRequestMethod::Get, handlers)
    }

    pub fn post(
        &mut self,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, Exception> {
        self.method(HttpRequestMethod::Post, handlers)
    }

    pub fn put(
        &mut self,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, Exception> {
        self.method(HttpRequestMethod::Put, handlers)
    }

    pub fn delete(
        &mut self,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, Exception> {
        self.method(HttpRequestMethod::Delete, handlers)
    }

    pub fn patch(
        &mut self,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, Exception> {
        self.method(HttpRequestMethod::Patch, handlers)
    }

    pub fn options(
        &mut self,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<&mut Self, Exception> {
        self.method(HttpRequestMethod::Options, handlers)
    }

    /// 设置没有任何路由命中时执行的处理链，只有第一次设置生效。
    pub fn not_found(
        &mut self,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Result<(), Exception> {
        let chain = Chain::new(handlers)?;
        if self.not_found.is_some() {
            warn!("not-found 处理链已设置，本次设置被忽略");
        } else {
            self.not_found = Some(chain);
        }
        Ok(())
    }

    /// 按注册顺序排列的全部路由
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// 请求入口：匹配路由、绑定路径参数并执行处理链。
    ///
    /// 处理函数中的 panic 不会被捕获，由外层传输层自行处理。
    pub fn handle(&self, req: &mut Request, res: &mut Response) {
        let path = match_path(req);

        // 无法注册的方法（例如 HEAD）为 None，不会命中任何路由
        let method = req.method();

        for route in &self.routes {
            let Some(chain) = method.and_then(|m| route.method_handlers.get(&m)) else {
                continue;
            };
            let Some(captures) = route.matcher.captures(&path) else {
                continue;
            };
            debug!("{} {} 命中路由 {}", req.method_name(), path, route.pattern);

            let params = route
                .param_names
                .iter()
                .cloned()
                .zip(captures.into_iter().map(|raw| raw.and_then(decode_component)))
                .collect();
            req.set_params(params);
            chain.run(req, res);
            return;
        }

        match &self.not_found {
            Some(chain) => {
                debug!("{} {} 未命中任何路由，执行 not-found 处理链", req.method_name(), path);
                chain.run(req, res);
            }
            None => {
                debug!("{} {} 未命中任何路由，返回404", req.method_name(), path);
                res.status(404).end();
            }
        }
    }
}

/// 计算用于匹配的路径：优先使用已解析的路径，否则从第一个原始位置参数还原
fn match_path(req: &Request) -> String {
    match req.path() {
        Some(path) => path.to_string(),
        None => normalize_path(req.raw_params().first().map(String::as_str).unwrap_or_default()),
    }
}
