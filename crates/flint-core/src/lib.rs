#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = "flint-core: 连接建立编排器的核心契约与状态机。"]
#![doc = ""]
#![doc = "== 使命概述 =="]
#![doc = "- **Why**：为传输层建立入站与出站通道——绑定监听端点、连接远端对等体，统一处理地址解析、多地址回退、通道配置与异步完成通告。"]
#![doc = "- **What**：核心是建连编排状态机：创建并初始化原始通道、把逻辑远端地址解析为一个或多个具体地址、跨候选地址以全新通道回退重试、经可取消的单值完成单元对外交付恰好一次的结果。"]
#![doc = "- **How**：通道、解析引擎与执行上下文以契约接口表达（[`channel`]、[`resolver`]、[`executor`]），编排器（[`connector`]）对其保持无状态组合；所有触碰通道的工作显式投递到通道绑定的单线程上下文内串行执行。"]
#![doc = ""]
#![doc = "== 职责边界 =="]
#![doc = "- 底层套接字 I/O、事件轮询、解析策略与属性值类型都是外部协作者，本 crate 仅驱动其生命周期迁移；"]
#![doc = "- 不定义承载在通道上的线格式，不定义应用层请求的重试/退避策略，不定义 TLS 与协议协商。"]

/// 统一的结果别名：错误侧缺省为 [`error::CoreError`]。
pub type Result<T, E = error::CoreError> = core::result::Result<T, E>;

pub mod channel;
pub mod config;
pub mod connector;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod promise;
pub mod resolver;
/// 测试桩命名空间：集中维护官方 `Stub`/`Manual`/`Recording` 替身，
/// 供集成测试与示例复用；详见模块级文档。
pub mod test_stubs;

pub use channel::{
    Acceptor, AttributeKey, AttributeValue, Channel, ChannelFactory, ChannelInitializer,
    ChannelOption, CompletionCallback, InitFn, InitSignal, OptionValue, ServerChannelFactory,
};
pub use config::{
    BindAddressSupplier, ChannelObserver, NoopPropagation, PropagationContext, PropagationGuard,
    ResolveErrorObserver, ResolveObserver, TransportConfig,
};
pub use connector::TransportConnector;
pub use error::{CoreError, ErrorCategory};
pub use executor::{EventExecutor, EventExecutorGroup, Task};
pub use promise::{ChannelConsumer, ChannelPromise, FnConsumer};
pub use resolver::{AddressResolver, NoopResolver, ResolveCallback, TransportAddr};
