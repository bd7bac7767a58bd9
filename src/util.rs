/// 按 URI 组件的规则进行百分号解码。
///
/// 所有 `%XX` 序列解码成字节后必须组成合法的 UTF-8；`%` 后不足两位十六进制数、
/// 或解码结果不是合法 UTF-8 时返回 `None`。`+` 保持原样，不会被当成空格。
pub fn decode_component(value: &str) -> Option<String> {
    if !value.contains('%') {
        return Some(value.to_string());
    }

    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let high = (hex[0] as char).to_digit(16)?;
            let low = (hex[1] as char).to_digit(16)?;
            decoded.push((high * 16 + low) as u8);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

/// 将路由通配捕获到的原始路径整理成以 `/` 开头的匹配路径，空串视为 `/`。
pub fn normalize_path(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        ["/", raw].concat()
    }
}
