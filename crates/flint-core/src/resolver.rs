use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// 传输层统一地址枚举。
///
/// # 教案级说明
///
/// ## 意图（Why）
/// - 建连入口同时接受"已解析的套接字地址"、"待解析的逻辑名"与
///   "域套接字路径"三类目标，统一为一个枚举后，解析桥与连接状态机
///   可以用同一套签名处理全部地址族；
/// - 通过值语义封装，类型可作为候选列表元素与哈希键安全复制。
///
/// ## 契约（What）
/// - `Socket`：具体的 IPv4/IPv6 套接字地址，无须解析；
/// - `Name { host, port }`：逻辑主机名，必须先经解析器展开为一个或
///   多个 `Socket` 地址；
/// - `Unix`：域套接字路径，视为已解析，且解析器不支持该地址族；
/// - `is_domain_socket` / `is_concrete`：供编排器选择通道工厂与判定
///   是否跳过解析。
///
/// ## 风险提示（Trade-offs）
/// - `Name` 不在本层做任何语法校验，非法主机名留给解析器报错；
/// - `Display` 输出面向日志，不保证可逆解析。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransportAddr {
    Socket(SocketAddr),
    Name { host: String, port: u16 },
    Unix(PathBuf),
}

impl TransportAddr {
    /// 构造逻辑主机名地址。
    pub fn name(host: impl Into<String>, port: u16) -> Self {
        Self::Name {
            host: host.into(),
            port,
        }
    }

    /// 构造域套接字地址。
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::Unix(path.into())
    }

    /// 是否为域套接字地址族。
    pub fn is_domain_socket(&self) -> bool {
        matches!(self, Self::Unix(_))
    }

    /// 是否已是具体地址（无须解析即可直接发起连接）。
    pub fn is_concrete(&self) -> bool {
        !matches!(self, Self::Name { .. })
    }

    /// 读取端口；域套接字没有端口概念，返回 `None`。
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Socket(addr) => Some(addr.port()),
            Self::Name { port, .. } => Some(*port),
            Self::Unix(_) => None,
        }
    }
}

impl fmt::Display for TransportAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket(addr) => write!(f, "{addr}"),
            Self::Name { host, port } => write!(f, "{host}:{port}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

impl From<SocketAddr> for TransportAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::Socket(addr)
    }
}

/// 解析完成回调，携带按解析器给定顺序排列的具体地址列表。
pub type ResolveCallback = Box<dyn FnOnce(crate::Result<Vec<TransportAddr>>) + Send + 'static>;

/// 地址解析引擎的契约接口。
///
/// # 设计背景（Why）
/// - 解析策略（DNS、服务发现、静态表）属于外部协作者，编排器只依赖
///   "是否支持、是否已解析、展开为有序列表"三个判定；
/// - 解析是异步动作：可能同步完成（结果已在缓存），也可能稍后完成，
///   回调统一承载两种情形。
///
/// # 契约说明（What）
/// - `is_supported`：解析器能否处理该地址族；不支持时编排器跳过解析
///   直接对原地址发起单次连接；
/// - `is_resolved`：地址是否已是具体形态；已解析同样跳过解析步骤；
/// - `resolve_all`：展开为**非空**有序地址列表；实现返回空列表时由
///   编排器按解析失败处理。
///
/// # 风险提示（Trade-offs）
/// - 回调可能在解析器内部线程上执行，实现与调用方都不得假设回调
///   所处线程；编排器会把后续通道操作重新投递回通道上下文。
pub trait AddressResolver: Send + Sync + 'static {
    /// 解析器能否处理该地址族。
    fn is_supported(&self, address: &TransportAddr) -> bool;

    /// 地址是否已是具体形态、无须解析。
    fn is_resolved(&self, address: &TransportAddr) -> bool;

    /// 将逻辑地址展开为有序的具体地址列表。
    fn resolve_all(&self, address: &TransportAddr, on_done: ResolveCallback);
}

/// 永不解析的占位解析器：一切地址族都声明为不支持。
///
/// # 契约说明（What）
/// - `is_supported` 恒为 `false`，编排器因此总是走"跳过解析、直接
///   连接原地址"的路径；
/// - `resolve_all` 理论上不会被编排器调用；出于契约完整性，它把
///   原地址原样回传为单元素列表。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopResolver;

impl AddressResolver for NoopResolver {
    fn is_supported(&self, _address: &TransportAddr) -> bool {
        false
    }

    fn is_resolved(&self, _address: &TransportAddr) -> bool {
        true
    }

    fn resolve_all(&self, address: &TransportAddr, on_done: ResolveCallback) {
        on_done(Ok(vec![address.clone()]));
    }
}
