use std::sync::Arc;

use crate::channel::{
    AttributeKey, AttributeValue, Channel, ChannelFactory, ChannelOption, OptionValue,
    ServerChannelFactory,
};
use crate::error::{CoreError, codes};
use crate::executor::EventExecutorGroup;
use crate::resolver::TransportAddr;

/// 本地绑定地址供给器：每次连接尝试时取一次。
pub type BindAddressSupplier = Arc<dyn Fn() -> TransportAddr + Send + Sync>;

/// 解析开始前的观察回调。
pub type ChannelObserver<C> = Arc<dyn Fn(&C) + Send + Sync>;

/// 解析成功后的观察回调，携带首个解析结果。
pub type ResolveObserver<C> = Arc<dyn Fn(&C, &TransportAddr) + Send + Sync>;

/// 解析失败时的观察回调，携带失败根因。
pub type ResolveErrorObserver<C> = Arc<dyn Fn(&C, &CoreError) + Send + Sync>;

/// 传输配置：建连编排的只读输入。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 把通道选项、属性、工厂、执行上下文组与解析观察点收拢为一个
///   只读对象，编排器自身保持无状态、可从任意线程调用；
/// - 客户端与服务端、IP 与域套接字共四个工厂槽位，按角色与地址族
///   二维选择，避免在编排路径上做运行期类型探测。
///
/// ## 契约（What）
/// - 选项与属性保持插入顺序，初始化按序逐项应用；
/// - `bind_address`：可选的本地地址供给器，每次连接尝试求值一次；
/// - `group`：执行上下文组；`child_group`：服务端角色为已接入连接
///   准备的子组，缺省时复用主组；
/// - `connection_factory` / `server_connection_factory`：按地址族取
///   工厂，未配置对应槽位时返回
///   [`codes::FACTORY_FAILED`]；
/// - `before_resolve` / `after_resolve` / `on_resolve_error`：解析
///   生命周期观察点，全部可选。
///
/// ## 风险提示（Trade-offs）
/// - 配置在构建完成后应视为冻结；编排器跨重试共享同一份配置，
///   构建后的外部突变不在契约保护范围内。
pub struct TransportConfig<C: Channel> {
    options: Vec<(ChannelOption, OptionValue)>,
    attributes: Vec<(AttributeKey, AttributeValue)>,
    bind_address: Option<BindAddressSupplier>,
    group: Arc<dyn EventExecutorGroup>,
    child_group: Option<Arc<dyn EventExecutorGroup>>,
    channel_factory: Option<Arc<dyn ChannelFactory<C>>>,
    domain_channel_factory: Option<Arc<dyn ChannelFactory<C>>>,
    server_channel_factory: Option<Arc<dyn ServerChannelFactory<C>>>,
    server_domain_channel_factory: Option<Arc<dyn ServerChannelFactory<C>>>,
    before_resolve: Option<ChannelObserver<C>>,
    after_resolve: Option<ResolveObserver<C>>,
    on_resolve_error: Option<ResolveErrorObserver<C>>,
}

impl<C: Channel> TransportConfig<C> {
    /// 以必需的执行上下文组构造配置。
    pub fn new(group: Arc<dyn EventExecutorGroup>) -> Self {
        Self {
            options: Vec::new(),
            attributes: Vec::new(),
            bind_address: None,
            group,
            child_group: None,
            channel_factory: None,
            domain_channel_factory: None,
            server_channel_factory: None,
            server_domain_channel_factory: None,
            before_resolve: None,
            after_resolve: None,
            on_resolve_error: None,
        }
    }

    /// 追加一个通道选项（保持插入顺序）。
    pub fn with_option(mut self, option: ChannelOption, value: OptionValue) -> Self {
        self.options.push((option, value));
        self
    }

    /// 追加一个通道属性（保持插入顺序）。
    pub fn with_attribute(mut self, key: AttributeKey, value: AttributeValue) -> Self {
        self.attributes.push((key, value));
        self
    }

    /// 指定本地绑定地址供给器。
    pub fn with_bind_address(mut self, supplier: BindAddressSupplier) -> Self {
        self.bind_address = Some(supplier);
        self
    }

    /// 指定客户端角色、IP 地址族的通道工厂。
    pub fn with_channel_factory(mut self, factory: Arc<dyn ChannelFactory<C>>) -> Self {
        self.channel_factory = Some(factory);
        self
    }

    /// 指定客户端角色、域套接字地址族的通道工厂。
    pub fn with_domain_channel_factory(mut self, factory: Arc<dyn ChannelFactory<C>>) -> Self {
        self.domain_channel_factory = Some(factory);
        self
    }

    /// 指定服务端角色、IP 地址族的通道工厂。
    pub fn with_server_channel_factory(
        mut self,
        factory: Arc<dyn ServerChannelFactory<C>>,
    ) -> Self {
        self.server_channel_factory = Some(factory);
        self
    }

    /// 指定服务端角色、域套接字地址族的通道工厂。
    pub fn with_server_domain_channel_factory(
        mut self,
        factory: Arc<dyn ServerChannelFactory<C>>,
    ) -> Self {
        self.server_domain_channel_factory = Some(factory);
        self
    }

    /// 指定服务端角色为已接入连接准备的子执行上下文组。
    pub fn with_child_group(mut self, child_group: Arc<dyn EventExecutorGroup>) -> Self {
        self.child_group = Some(child_group);
        self
    }

    /// 指定解析开始前的观察回调。
    pub fn with_before_resolve(mut self, observer: ChannelObserver<C>) -> Self {
        self.before_resolve = Some(observer);
        self
    }

    /// 指定解析成功后的观察回调。
    pub fn with_after_resolve(mut self, observer: ResolveObserver<C>) -> Self {
        self.after_resolve = Some(observer);
        self
    }

    /// 指定解析失败时的观察回调。
    pub fn with_on_resolve_error(mut self, observer: ResolveErrorObserver<C>) -> Self {
        self.on_resolve_error = Some(observer);
        self
    }

    /// 读取有序选项表。
    pub fn options(&self) -> &[(ChannelOption, OptionValue)] {
        &self.options
    }

    /// 读取有序属性表。
    pub fn attributes(&self) -> &[(AttributeKey, AttributeValue)] {
        &self.attributes
    }

    /// 读取本地绑定地址供给器。
    pub fn bind_address(&self) -> Option<&(dyn Fn() -> TransportAddr + Send + Sync)> {
        self.bind_address.as_deref()
    }

    /// 读取执行上下文组。
    pub fn group(&self) -> &Arc<dyn EventExecutorGroup> {
        &self.group
    }

    /// 读取子执行上下文组。
    pub fn child_group(&self) -> Option<&Arc<dyn EventExecutorGroup>> {
        self.child_group.as_ref()
    }

    /// 按地址族选择客户端角色的通道工厂。
    pub fn connection_factory(
        &self,
        is_domain_socket: bool,
    ) -> crate::Result<&Arc<dyn ChannelFactory<C>>> {
        let slot = if is_domain_socket {
            &self.domain_channel_factory
        } else {
            &self.channel_factory
        };
        slot.as_ref().ok_or_else(|| {
            CoreError::new(
                codes::FACTORY_FAILED,
                "no channel factory configured for the requested address family",
            )
        })
    }

    /// 按地址族选择服务端角色的通道工厂。
    pub fn server_connection_factory(
        &self,
        is_domain_socket: bool,
    ) -> crate::Result<&Arc<dyn ServerChannelFactory<C>>> {
        let slot = if is_domain_socket {
            &self.server_domain_channel_factory
        } else {
            &self.server_channel_factory
        };
        slot.as_ref().ok_or_else(|| {
            CoreError::new(
                codes::FACTORY_FAILED,
                "no server channel factory configured for the requested address family",
            )
        })
    }

    /// 读取解析开始前的观察回调。
    pub fn before_resolve(&self) -> Option<&(dyn Fn(&C) + Send + Sync)> {
        self.before_resolve.as_deref()
    }

    /// 读取解析成功后的观察回调。
    pub fn after_resolve(&self) -> Option<&(dyn Fn(&C, &TransportAddr) + Send + Sync)> {
        self.after_resolve.as_deref()
    }

    /// 读取解析失败时的观察回调。
    pub fn on_resolve_error(&self) -> Option<&(dyn Fn(&C, &CoreError) + Send + Sync)> {
        self.on_resolve_error.as_deref()
    }
}

/// 跨上下文传播契约：把调用方上下文的值带进建连流程。
///
/// # 契约说明（What）
/// - `save`：通道刚创建时调用，把捕获的值挂载到通道；
/// - `restore`：在调用解析引擎前恢复捕获值，返回的守卫在丢弃时撤销
///   恢复——作用域只覆盖解析的发起，不覆盖其异步完成。
pub trait PropagationContext<C: Channel>: Send + Sync + 'static {
    /// 把捕获的传播值挂载到新建通道。
    fn save(&self, channel: &C);

    /// 恢复捕获值，守卫丢弃时撤销。
    fn restore(&self) -> PropagationGuard;
}

/// 传播恢复守卫：丢弃时执行撤销动作。
pub struct PropagationGuard {
    reset: Option<Box<dyn FnOnce() + Send>>,
}

impl PropagationGuard {
    /// 构造携带撤销动作的守卫。
    pub fn new(reset: impl FnOnce() + Send + 'static) -> Self {
        Self {
            reset: Some(Box::new(reset)),
        }
    }

    /// 构造无撤销动作的守卫。
    pub fn noop() -> Self {
        Self { reset: None }
    }
}

impl Drop for PropagationGuard {
    fn drop(&mut self) {
        if let Some(reset) = self.reset.take() {
            reset();
        }
    }
}

/// 空传播实现：不捕获也不恢复任何值。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPropagation;

impl<C: Channel> PropagationContext<C> for NoopPropagation {
    fn save(&self, _channel: &C) {}

    fn restore(&self) -> PropagationGuard {
        PropagationGuard::noop()
    }
}
