use std::any::Any;
use std::borrow::Cow;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::CoreError;
use crate::executor::{EventExecutor, EventExecutorGroup};
use crate::resolver::TransportAddr;

/// 单次异步通道操作的完成回调。
///
/// # 契约说明（What）
/// - 实现方必须在通道所属的执行上下文内调用回调；
/// - 回调恰好调用一次：成功传 `Ok(())`，失败传携带根因的 [`CoreError`]。
pub type CompletionCallback = Box<dyn FnOnce(crate::Result<()>) + Send + 'static>;

/// 统一的通道契约接口。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 通道是外部传输引擎持有的 I/O 端点句柄，本 crate 只驱动其生命周期
///   迁移（创建 → 配置 → 流水线初始化 → 注册 → 可用），不触碰字节收发；
/// - 以回调承接异步结果而非返回 Future，使编排器的续体能够显式地在
///   通道执行上下文内被调度，注册竞态被上下文串行化吸收。
///
/// ## 契约（What）
/// - `executor`：返回通道永久绑定的执行上下文；
/// - `register` / `bind` / `connect`：异步操作，完成回调在通道上下文内
///   恰好调用一次；
/// - `close`：有序关闭；`close_forcibly`：立即拆除（用于尚未注册成功的
///   半初始化通道）；两者都必须让挂起中的异步操作以失败终止；
/// - `set_option`：返回 `Ok(true)` 表示已应用，`Ok(false)` 表示实现不
///   认识该选项，`Err` 表示应用动作本身失败——后两者均由调用方按
///   非致命告警处理；
/// - `set_attribute`：附加任意元数据，永远成功；
/// - `is_registered`：通道是否已在执行上下文完成注册。
///
/// ## 风险提示（Trade-offs）
/// - `Clone` 约束表达"句柄"语义：克隆共享同一底层端点；
/// - 关闭是幂等操作，失败路径可能对同一通道多次关闭。
pub trait Channel: Clone + Send + Sync + 'static {
    /// 通道绑定的执行上下文。
    fn executor(&self) -> Arc<dyn EventExecutor>;

    /// 将通道注册到其执行上下文。
    fn register(&self, on_done: CompletionCallback);

    /// 绑定本地地址。
    fn bind(&self, local: &TransportAddr, on_done: CompletionCallback);

    /// 连接远端地址；给定 `local` 时同时绑定本地地址。
    fn connect(
        &self,
        remote: &TransportAddr,
        local: Option<&TransportAddr>,
        on_done: CompletionCallback,
    );

    /// 有序关闭通道。
    fn close(&self);

    /// 立即强制拆除通道。
    fn close_forcibly(&self);

    /// 通道是否已完成注册。
    fn is_registered(&self) -> bool;

    /// 应用单个通道选项。
    fn set_option(&self, option: ChannelOption, value: &OptionValue) -> crate::Result<bool>;

    /// 附加通道属性。
    fn set_attribute(&self, key: AttributeKey, value: AttributeValue);
}

/// 通道选项键。
///
/// # 契约说明（What）
/// - 键集合覆盖常见的套接字调优项；具体实现可只认识其中一部分，
///   不认识的键通过 [`Channel::set_option`] 返回 `Ok(false)` 表达；
/// - `is_inet_only` 标记仅对 IP 地址族有意义的选项，域套接字通道的
///   初始化会静默跳过它们。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelOption {
    ReuseAddress,
    NoDelay,
    KeepAlive,
    ConnectTimeout,
    ReceiveBufferSize,
    SendBufferSize,
    Linger,
    Backlog,
}

impl ChannelOption {
    /// 该选项是否仅对 IP 地址族有意义。
    pub const fn is_inet_only(self) -> bool {
        matches!(self, Self::ReuseAddress | Self::NoDelay)
    }
}

/// 通道选项值。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    Flag(bool),
    Size(usize),
    Interval(Duration),
}

/// 通道属性键。
pub type AttributeKey = Cow<'static, str>;

/// 通道属性值：任意可跨线程共享的元数据。
pub type AttributeValue = Arc<dyn Any + Send + Sync>;

/// 客户端角色的通道工厂。
///
/// # 契约说明（What）
/// - `new_channel` 产出绑定到给定执行上下文的原始通道；
/// - 资源耗尽等构造失败通过 `Err` 返回——此时尚无通道需要清理。
pub trait ChannelFactory<C: Channel>: Send + Sync + 'static {
    /// 构造绑定到 `executor` 的原始通道。
    fn new_channel(&self, executor: Arc<dyn EventExecutor>) -> crate::Result<C>;
}

/// 服务端（接入）角色的通道工厂。
///
/// # 契约说明（What）
/// - 除自身的执行上下文外，还接收用于已接入连接的子上下文组。
pub trait ServerChannelFactory<C: Channel>: Send + Sync + 'static {
    /// 构造绑定到 `executor` 的原始接入通道。
    fn new_channel(
        &self,
        executor: Arc<dyn EventExecutor>,
        child_group: Arc<dyn EventExecutorGroup>,
    ) -> crate::Result<C>;
}

/// 客户端角色的流水线初始化闭包。
pub type InitFn<C> = Arc<dyn Fn(&C) -> crate::Result<()> + Send + Sync>;

/// 流水线初始化器，以显式角色标签区分客户端与服务端语义。
///
/// # 设计背景（Why）
/// - 客户端初始化是同步等价动作：闭包返回即视为完成；
/// - 服务端初始化的完成时点由接入器决定：接入器装配好按连接处理
///   逻辑后，通过 [`InitSignal`] 通知初始化流程继续；
/// - 用枚举标签替代运行期类型探测，角色差异在签名层面即可见。
pub enum ChannelInitializer<C: Channel> {
    /// 客户端角色：初始化闭包返回即完成。
    Client(InitFn<C>),
    /// 服务端角色：初始化完成由接入器经信号槽异步通知。
    Server(Arc<dyn Acceptor<C>>),
}

impl<C: Channel> ChannelInitializer<C> {
    /// 构造客户端初始化器。
    pub fn client(init: impl Fn(&C) -> crate::Result<()> + Send + Sync + 'static) -> Self {
        Self::Client(Arc::new(init))
    }

    /// 构造服务端初始化器。
    pub fn server(acceptor: Arc<dyn Acceptor<C>>) -> Self {
        Self::Server(acceptor)
    }

    /// 是否为服务端角色。
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server(_))
    }
}

impl<C: Channel> Clone for ChannelInitializer<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Client(init) => Self::Client(Arc::clone(init)),
            Self::Server(acceptor) => Self::Server(Arc::clone(acceptor)),
        }
    }
}

/// 服务端接入器契约。
///
/// # 契约说明（What）
/// - `prepare`：在原始通道刚由工厂产出、尚未进入执行上下文时调用，
///   用于挂接自动读取等需要尽早就位的任务；
/// - `install`：在通道执行上下文内调用，装配按连接处理逻辑；装配
///   完成（或失败）时必须解析传入的 [`InitSignal`]，初始化流程在该
///   信号解析前不会推进到注册步骤。
pub trait Acceptor<C: Channel>: Send + Sync + 'static {
    /// 通道创建后的准备动作。
    fn prepare(&self, channel: &C);

    /// 在通道上下文内装配接入处理，并在完成后解析信号。
    fn install(&self, channel: &C, signal: InitSignal);
}

/// 服务端初始化完成信号：一次性结果槽。
///
/// # 契约说明（What）
/// - `complete` / `fail`：首个调用者胜出，其后的调用为空操作并返回
///   `false`；
/// - 续体注册与解析的先后顺序任意：先解析后注册时，续体被立即
///   调用并携带已知结果；
/// - 信号在通道执行上下文内被解析，续体随之在同一上下文内执行。
pub struct InitSignal {
    inner: Arc<Mutex<SignalState>>,
}

struct SignalState {
    outcome: Option<crate::Result<()>>,
    delivered: bool,
    waiter: Option<Box<dyn FnOnce(crate::Result<()>) + Send + 'static>>,
}

impl InitSignal {
    /// 构造未解析的信号槽。
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SignalState {
                outcome: None,
                delivered: false,
                waiter: None,
            })),
        }
    }

    /// 以成功解析信号。
    pub fn complete(&self) -> bool {
        self.resolve(Ok(()))
    }

    /// 以失败解析信号。
    pub fn fail(&self, error: CoreError) -> bool {
        self.resolve(Err(error))
    }

    /// 注册解析续体；若信号已解析则立即携带结果调用。
    pub(crate) fn on_resolved(&self, waiter: impl FnOnce(crate::Result<()>) + Send + 'static) {
        let ready = {
            let mut state = self
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if state.delivered {
                None
            } else if state.outcome.is_some() {
                state.delivered = true;
                state.outcome.take()
            } else {
                state.waiter = Some(Box::new(waiter));
                return;
            }
        };
        if let Some(outcome) = ready {
            waiter(outcome);
        }
    }

    fn resolve(&self, outcome: crate::Result<()>) -> bool {
        let waiter = {
            let mut state = self
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if state.outcome.is_some() || state.delivered {
                return false;
            }
            match state.waiter.take() {
                Some(waiter) => {
                    state.delivered = true;
                    Some((waiter, outcome))
                }
                None => {
                    state.outcome = Some(outcome);
                    None
                }
            }
        };
        if let Some((waiter, outcome)) = waiter {
            waiter(outcome);
        }
        true
    }
}

impl Clone for InitSignal {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for InitSignal {
    fn default() -> Self {
        Self::new()
    }
}
