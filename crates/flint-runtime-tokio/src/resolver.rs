use flint_core::resolver::{AddressResolver, ResolveCallback, TransportAddr};
use tokio::runtime::Handle;
use tracing::debug;

use crate::error::{RuntimeError, resolve_error};
use crate::event_loop::TokioEventLoop;

/// 基于系统名字服务的解析实现。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 逻辑主机名必须在连接前展开为具体套接字地址；系统解析器
///   （`/etc/hosts`、DNS）是缺省且无须额外配置的解析来源；
/// - 查询在事件循环的运行时上以异步任务执行，调用方线程不被
///   阻塞——与编排器"登记续体立即返回"的模型一致。
///
/// ## 契约 (What)
/// - `is_supported`：域套接字地址族不支持（编排器随即跳过解析
///   直连）；IP 与逻辑名支持；
/// - `is_resolved`：具体地址自报已解析；
/// - `resolve_all`：逻辑名经系统解析展开为**按返回顺序**排列的
///   地址列表；具体地址原样回传为单元素列表；空结果由编排器按
///   解析失败处理。
///
/// ## 注意事项 (Trade-offs)
/// - 回调可能在事件循环线程上触发；编排器会把后续通道操作重新
///   投递回通道上下文，调用方不得假设回调线程；
/// - 系统解析不提供 TTL 或缓存控制，需要缓存策略时应另行实现
///   解析契约。
pub struct DnsResolver {
    handle: Handle,
}

impl DnsResolver {
    /// 复用事件循环的运行时执行查询。
    pub fn new(event_loop: &TokioEventLoop) -> Self {
        Self {
            handle: event_loop.handle().clone(),
        }
    }

    /// 以显式运行时句柄构造（宿主已有运行时时的接入口）。
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl AddressResolver for DnsResolver {
    fn is_supported(&self, address: &TransportAddr) -> bool {
        !address.is_domain_socket()
    }

    fn is_resolved(&self, address: &TransportAddr) -> bool {
        address.is_concrete()
    }

    fn resolve_all(&self, address: &TransportAddr, on_done: ResolveCallback) {
        match address {
            TransportAddr::Name { host, port } => {
                let authority = format!("{host}:{port}");
                let handle = self.handle.clone();
                drop(handle.spawn(async move {
                    match tokio::net::lookup_host(authority.clone()).await {
                        Ok(resolved) => {
                            let addresses: Vec<TransportAddr> =
                                resolved.map(TransportAddr::Socket).collect();
                            debug!(authority = %authority, count = addresses.len(), "resolved");
                            on_done(Ok(addresses));
                        }
                        Err(source) => {
                            on_done(Err(resolve_error(RuntimeError::Lookup {
                                authority,
                                source,
                            })));
                        }
                    }
                }));
            }
            concrete => on_done(Ok(vec![concrete.clone()])),
        }
    }
}
