use std::net::IpAddr;

/// 去掉地址中的端口部分，返回主机名或 IP。
///
/// 支持 `host:port`、`[v6]:port`、`[v6]`；不带方括号的 IPv6 字面量与裸主机名原样返回。
pub fn trim_port(address: &str) -> &str {
    let address = address.trim();
    if let Some(rest) = address.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return &rest[..end];
        }
        return address;
    }
    // 多个冒号说明是未加方括号的 IPv6 地址
    if address.matches(':').count() > 1 {
        return address;
    }
    match address.rsplit_once(':') {
        Some((host, _port)) => host,
        None => address,
    }
}

/// 若地址（去端口后）为 IP 字面量则返回解析结果。
pub fn parse_ip(address: &str) -> Option<IpAddr> {
    trim_port(address).parse().ok()
}
