// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路径模式编译模块
//!
//! 将 `/users/:id` 这样的路径模式编译为正则匹配器，同时给出按捕获组顺序排列的参数名。
//! 路由表只通过 [`compile`] 这一个入口使用本模块：
//! `compile(pattern) → (匹配器, 参数名列表)`。
//!
//! ## 支持的语法
//! - 普通字面量，大小写不敏感
//! - `\x`：转义单个字面字符
//! - `:name`：具名参数，匹配一个路径段（不含前缀分隔符）
//! - `:name(re)`：自定义正则的具名参数
//! - `(re)`：匿名参数，名字为其在匿名参数中的序号（`"0"`、`"1"`……）
//! - `*`：匿名通配，匹配任意内容
//! - 修饰符 `?`（可选）、`+`（一个或多个）、`*`（零个或多个）
//!
//! 匹配是非严格的：末尾多出的一个 `/` 也算匹配。

use lazy_static::lazy_static;
use log::error;
use regex::Regex;

use crate::exception::Exception;

/// 参数未显式给出分隔符时使用的默认分隔符
const DEFAULT_DELIMITER: &str = "/";

lazy_static! {
    /// 路径模式的词法规则。
    ///
    /// 各捕获组依次为：转义字符、前缀分隔符、参数名、参数的自定义正则、
    /// 匿名参数的正则、修饰符、通配符 `*`。
    static ref PATH_TOKEN: Regex = Regex::new(
        r"(\\.)|([/.])?(?:(?::(\w+)(?:\(((?:\\.|[^\\()])+)\))?|\(((?:\\.|[^\\()])+)\))([+*?])?|(\*))"
    )
    .unwrap();
}

/// 路径模式中的一个词法单元
#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// 原样匹配的字面量
    Literal(String),
    /// 会产生一个捕获组的参数
    Param(ParamToken),
}

#[derive(Debug, Clone, PartialEq)]
struct ParamToken {
    name: String,
    prefix: String,
    optional: bool,
    repeat: bool,
    /// 前缀后面紧跟的不是同一个分隔符，例如 `/:from-:to` 中的 `:from`
    partial: bool,
    pattern: String,
}

/// 编译后的路径匹配器。
///
/// 每个捕获组对应一个参数；可选段缺席时对应位置为 `None`。
#[derive(Debug, Clone)]
pub struct PathMatcher {
    regex: Regex,
}

impl PathMatcher {
    /// 测试具体路径，成功时按捕获组顺序返回匹配到的原始子串
    pub fn captures<'p>(&self, path: &'p str) -> Option<Vec<Option<&'p str>>> {
        let caps = self.regex.captures(path)?;
        Some(caps.iter().skip(1).map(|m| m.map(|m| m.as_str())).collect())
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// 捕获组数量（不含整体匹配）
    pub fn capture_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// 编译得到的正则表达式源码
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// 编译路径模式，返回匹配器以及与捕获组一一对应的参数名。
///
/// # 错误处理
/// 模式为空、自定义正则非法，或捕获组数量与参数数量不一致时返回
/// `Exception::InvalidArgument`。
pub fn compile(pattern: &str) -> Result<(PathMatcher, Vec<String>), Exception> {
    if pattern.is_empty() {
        return Err(Exception::InvalidArgument);
    }

    let tokens = parse(pattern);
    let source = to_regex_source(&tokens);
    let regex = match Regex::new(&source) {
        Ok(r) => r,
        Err(e) => {
            error!("无法编译路径模式 {}：{}", pattern, e);
            return Err(Exception::InvalidArgument);
        }
    };

    let param_names: Vec<String> = tokens
        .into_iter()
        .filter_map(|token| match token {
            Token::Param(p) => Some(p.name),
            Token::Literal(_) => None,
        })
        .collect();

    let matcher = PathMatcher { regex };
    if matcher.capture_count() != param_names.len() {
        error!(
            "路径模式 {} 的捕获组数量（{}）与参数数量（{}）不一致",
            pattern,
            matcher.capture_count(),
            param_names.len()
        );
        return Err(Exception::InvalidArgument);
    }
    Ok((matcher, param_names))
}

fn parse(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut unnamed = 0usize;
    let mut index = 0;
    let mut path = String::new();

    for caps in PATH_TOKEN.captures_iter(pattern) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        path.push_str(&pattern[index..whole.start()]);
        index = whole.end();

        // 转义字符直接并入字面量，去掉反斜杠
        if let Some(escaped) = caps.get(1) {
            path.push_str(&escaped.as_str()[1..]);
            continue;
        }

        if !path.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut path)));
        }

        let next = pattern[index..].chars().next();
        let prefix = caps.get(2).map(|m| m.as_str());
        let modifier = caps.get(6).map(|m| m.as_str());
        let asterisk = caps.get(7).is_some();

        let partial = match (prefix, next) {
            (Some(p), Some(n)) => !p.starts_with(n),
            _ => false,
        };
        let delimiter = prefix.unwrap_or(DEFAULT_DELIMITER);

        let name = match caps.get(3) {
            Some(n) => n.as_str().to_string(),
            None => {
                let name = unnamed.to_string();
                unnamed += 1;
                name
            }
        };

        let pattern = match caps.get(4).or_else(|| caps.get(5)) {
            Some(custom) => custom.as_str().to_string(),
            None if asterisk => ".*".to_string(),
            None => format!("[^{}]+?", regex::escape(delimiter)),
        };

        tokens.push(Token::Param(ParamToken {
            name,
            prefix: prefix.unwrap_or("").to_string(),
            optional: matches!(modifier, Some("?") | Some("*")),
            repeat: matches!(modifier, Some("+") | Some("*")),
            partial,
            pattern,
        }));
    }

    path.push_str(&pattern[index..]);
    if !path.is_empty() {
        tokens.push(Token::Literal(path));
    }
    tokens
}

fn to_regex_source(tokens: &[Token]) -> String {
    let mut route = String::new();

    for token in tokens {
        match token {
            Token::Literal(text) => route.push_str(&regex::escape(text)),
            Token::Param(param) => {
                let prefix = regex::escape(&param.prefix);
                let mut capture = format!("(?:{})", param.pattern);
                if param.repeat {
                    capture = format!("{capture}(?:{prefix}{capture})*");
                }
                let capture = match (param.optional, param.partial) {
                    (true, false) => format!("(?:{prefix}({capture}))?"),
                    (true, true) => format!("{prefix}({capture})?"),
                    (false, _) => format!("{prefix}({capture})"),
                };
                route.push_str(&capture);
            }
        }
    }

    // 非严格模式：结尾的分隔符可有可无
    if route.ends_with(DEFAULT_DELIMITER) {
        route.pop();
    }
    format!("(?i)^{route}(?:{DEFAULT_DELIMITER})?$")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captures(pattern: &str, path: &str) -> Option<Vec<Option<String>>> {
        let (matcher, _) = compile(pattern).unwrap();
        matcher
            .captures(path)
            .map(|caps| caps.into_iter().map(|c| c.map(str::to_string)).collect())
    }

    fn some(values: &[&str]) -> Option<Vec<Option<String>>> {
        Some(values.iter().map(|v| Some(v.to_string())).collect())
    }

    #[test]
    fn test_named_param() {
        let (matcher, names) = compile("/users/:id").unwrap();
        assert_eq!(names, vec!["id"]);
        assert_eq!(matcher.capture_count(), 1);
        assert_eq!(captures("/users/:id", "/users/42"), some(&["42"]));
    }

    #[test]
    fn test_named_param_rejects_extra_segments() {
        assert_eq!(captures("/users/:id", "/users"), None);
        assert_eq!(captures("/users/:id", "/users/"), None);
        assert_eq!(captures("/users/:id", "/users/42/posts"), None);
    }

    #[test]
    fn test_trailing_slash_is_optional() {
        assert_eq!(captures("/users/:id", "/users/42/"), some(&["42"]));
        assert!(compile("/about").unwrap().0.is_match("/about/"));
        assert!(compile("/about/").unwrap().0.is_match("/about"));
    }

    #[test]
    fn test_case_insensitive_literals() {
        assert!(compile("/About").unwrap().0.is_match("/aBOUT"));
    }

    #[test]
    fn test_static_pattern_has_no_params() {
        let (matcher, names) = compile("/").unwrap();
        assert!(names.is_empty());
        assert!(matcher.is_match("/"));
        assert!(!matcher.is_match("/x"));
    }

    #[test]
    fn test_multiple_params_keep_order() {
        let (_, names) = compile("/users/:user/posts/:post").unwrap();
        assert_eq!(names, vec!["user", "post"]);
        assert_eq!(
            captures("/users/:user/posts/:post", "/users/ann/posts/7"),
            some(&["ann", "7"])
        );
    }

    #[test]
    fn test_partial_params_in_one_segment() {
        let (_, names) = compile("/flights/:from-:to").unwrap();
        assert_eq!(names, vec!["from", "to"]);
        assert_eq!(
            captures("/flights/:from-:to", "/flights/LAX-SFO"),
            some(&["LAX", "SFO"])
        );
    }

    #[test]
    fn test_optional_param() {
        assert_eq!(captures("/posts/:id?", "/posts"), Some(vec![None]));
        assert_eq!(captures("/posts/:id?", "/posts/3"), some(&["3"]));
    }

    #[test]
    fn test_dot_prefixed_optional_param() {
        assert_eq!(captures("/file.:ext?", "/file.json"), some(&["json"]));
        assert_eq!(captures("/file.:ext?", "/file"), Some(vec![None]));
    }

    #[test]
    fn test_repeated_params() {
        assert_eq!(captures("/files/:path+", "/files/a/b/c"), some(&["a/b/c"]));
        assert_eq!(captures("/files/:path+", "/files"), None);
        assert_eq!(captures("/files/:path*", "/files"), Some(vec![None]));
        assert_eq!(captures("/files/:path*", "/files/a"), some(&["a"]));
    }

    #[test]
    fn test_custom_param_pattern() {
        assert_eq!(captures(r"/user/:id(\d+)", "/user/12"), some(&["12"]));
        assert_eq!(captures(r"/user/:id(\d+)", "/user/abc"), None);
    }

    #[test]
    fn test_unnamed_group_uses_position_as_name() {
        let (_, names) = compile(r"/icon-(\d+).png").unwrap();
        assert_eq!(names, vec!["0"]);
        assert_eq!(captures(r"/icon-(\d+).png", "/icon-16.png"), some(&["16"]));
        assert_eq!(captures(r"/icon-(\d+).png", "/icon-16xpng"), None);
    }

    #[test]
    fn test_asterisk_wildcard() {
        let (_, names) = compile("/assets/*").unwrap();
        assert_eq!(names, vec!["0"]);
        assert_eq!(captures("/assets/*", "/assets/js/app.js"), some(&["js/app.js"]));
        assert_eq!(captures("/assets/*", "/other/js"), None);
    }

    #[test]
    fn test_mixed_named_and_unnamed() {
        let (_, names) = compile("/:lang/*").unwrap();
        assert_eq!(names, vec!["lang", "0"]);
    }

    #[test]
    fn test_escaped_colon_is_literal() {
        let (matcher, names) = compile(r"/time\:now").unwrap();
        assert!(names.is_empty());
        assert!(matcher.is_match("/time:now"));
    }

    #[test]
    fn test_regex_metacharacters_in_literals_are_escaped() {
        let (matcher, _) = compile("/a.b").unwrap();
        assert!(matcher.is_match("/a.b"));
        assert!(!matcher.is_match("/axb"));
    }

    #[test]
    fn test_empty_pattern_is_rejected() {
        assert_eq!(compile("").unwrap_err(), Exception::InvalidArgument);
    }

    /// 自定义正则中不能嵌套括号，多出的括号要么成为独立的匿名参数，要么按字面量转义
    #[test]
    fn test_nested_parentheses_keep_captures_aligned() {
        let (matcher, names) = compile("/:id((a)b)").unwrap();
        assert_eq!(names, vec!["id", "0"]);
        assert_eq!(matcher.capture_count(), names.len());
    }

    #[test]
    fn test_invalid_custom_regex_is_rejected() {
        assert_eq!(compile("/x/:id([)").unwrap_err(), Exception::InvalidArgument);
    }
}
