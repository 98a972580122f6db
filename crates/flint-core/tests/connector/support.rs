//! 场景测试共享的装置：一套手工执行上下文加可脚本化通道工厂。

use std::net::SocketAddr;
use std::sync::Arc;

use flint_core::channel::ChannelInitializer;
use flint_core::config::TransportConfig;
use flint_core::resolver::TransportAddr;
use flint_core::test_stubs::channel::{StubChannel, StubChannelFactory, StubPlan};
use flint_core::test_stubs::executor::{ManualExecutor, ManualExecutorGroup};

pub struct Harness {
    pub executor: Arc<ManualExecutor>,
    pub plan: Arc<StubPlan>,
    pub factory: Arc<StubChannelFactory>,
    pub config: Arc<TransportConfig<StubChannel>>,
}

/// 缺省装置：单执行上下文，四个工厂槽位指向同一个桩工厂。
pub fn harness() -> Harness {
    harness_with(|config| config)
}

/// 允许调用方在冻结前追加配置的装置构造入口。
pub fn harness_with(
    customize: impl FnOnce(TransportConfig<StubChannel>) -> TransportConfig<StubChannel>,
) -> Harness {
    let executor = Arc::new(ManualExecutor::new());
    let group = Arc::new(ManualExecutorGroup::single(Arc::clone(&executor)));
    let plan = StubPlan::new();
    let factory = StubChannelFactory::new(Arc::clone(&plan));
    let config: TransportConfig<StubChannel> = TransportConfig::new(group)
        .with_channel_factory(
            Arc::clone(&factory) as Arc<dyn flint_core::channel::ChannelFactory<StubChannel>>,
        )
        .with_domain_channel_factory(
            Arc::clone(&factory) as Arc<dyn flint_core::channel::ChannelFactory<StubChannel>>,
        )
        .with_server_channel_factory(
            Arc::clone(&factory) as Arc<dyn flint_core::channel::ServerChannelFactory<StubChannel>>,
        )
        .with_server_domain_channel_factory(
            Arc::clone(&factory) as Arc<dyn flint_core::channel::ServerChannelFactory<StubChannel>>,
        );
    let config = Arc::new(customize(config));
    Harness {
        executor,
        plan,
        factory,
        config,
    }
}

/// 不做任何装配的客户端初始化器。
pub fn client_initializer() -> ChannelInitializer<StubChannel> {
    ChannelInitializer::client(|_| Ok(()))
}

/// 测试网段内的具体地址，`last` 区分候选。
pub fn sock(last: u8) -> TransportAddr {
    TransportAddr::Socket(SocketAddr::from(([10, 0, 0, last], 7000)))
}

/// 需要解析的逻辑远端地址。
pub fn logical() -> TransportAddr {
    TransportAddr::name("service.internal", 7000)
}
