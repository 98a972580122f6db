//! # flint-core Prelude
//!
//! ## 教案级说明（Why）
//! - **统一导入面**：为传输实现与宿主 crate 提供稳定、浅路径的导入
//!   入口，避免业务代码里铺满 `flint_core::channel::...` 深层路径；
//! - **范围控制**：仅收录跨模块高频依赖的契约类型；测试桩等边缘
//!   命名空间仍建议使用显式路径以保持可读性。
//!
//! ## 收录内容（What）
//! - 错误体系：[`CoreError`]、[`ErrorCategory`]、[`Result`](crate::Result)；
//! - 执行上下文：[`EventExecutor`]、[`EventExecutorGroup`]；
//! - 通道契约：[`Channel`]、[`ChannelFactory`]、[`ServerChannelFactory`]、
//!   [`ChannelInitializer`]、[`ChannelOption`]、[`OptionValue`]；
//! - 解析契约：[`AddressResolver`]、[`TransportAddr`]、[`NoopResolver`]；
//! - 编排面：[`TransportConnector`]、[`TransportConfig`]、
//!   [`ChannelPromise`]、[`ChannelConsumer`]、[`FnConsumer`]。

pub use crate::Result;
pub use crate::channel::{
    Acceptor, Channel, ChannelFactory, ChannelInitializer, ChannelOption, InitSignal, OptionValue,
    ServerChannelFactory,
};
pub use crate::config::{NoopPropagation, PropagationContext, TransportConfig};
pub use crate::connector::TransportConnector;
pub use crate::error::{CoreError, ErrorCategory};
pub use crate::executor::{EventExecutor, EventExecutorGroup};
pub use crate::promise::{ChannelConsumer, ChannelPromise, FnConsumer};
pub use crate::resolver::{AddressResolver, NoopResolver, TransportAddr};
