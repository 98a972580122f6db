use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::channel::{
    Acceptor, AttributeKey, AttributeValue, Channel, ChannelFactory, ChannelInitializer,
    ChannelOption, CompletionCallback, InitSignal, OptionValue, ServerChannelFactory,
};
use crate::config::{NoopPropagation, PropagationContext, TransportConfig};
use crate::error::{CoreError, codes};
use crate::executor::{EventExecutor, EventExecutorGroup};
use crate::promise::{ChannelPromise, FnConsumer};
use crate::resolver::{AddressResolver, ResolveCallback, TransportAddr};

/// 建连编排器：创建、初始化并注册通道，然后执行绑定或连接。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 把"创建原始通道 → 应用配置 → 初始化流水线 → 注册执行上下文 →
///   解析地址 → 逐地址连接回退"这串线程受限的异步步骤，编排为对外
///   恰好一次的成功/失败结果；
/// - 编排器自身无状态、可从任意线程调用，所有触碰通道的工作都被
///   显式投递到通道绑定的执行上下文内。
///
/// ## 逻辑（How）
/// - `bind`：初始化链完成后，在通道上下文内执行一次绑定；无解析、
///   无重试；
/// - `connect`：初始化链产出首个通道后进入解析桥——地址族不受解析器
///   支持或已是具体形态时跳过解析直接单地址连接；否则解析为有序
///   候选列表并从游标 0 开始逐地址尝试；
/// - 每次尝试失败即关闭当前通道；尚有候选时产生内部重试信号（携带
///   完整候选列表），编排器推进游标并以**全新**通道重启尝试；候选
///   耗尽时以最后一次尝试的根因终止；
/// - 重试信号只在编排器内部流转，绝不进入公共错误面。
///
/// ## 契约（What）
/// - 两个入口都返回可取消的单值完成单元：恰好一个成功（就绪通道）
///   或一个失败（最后失败阶段的根因）；
/// - 所有致命失败在浮出前关闭牵连的通道，不遗留半开通道；
/// - 尝试严格按解析器给定顺序串行推进，不重排、不并发竞速。
///
/// ## 风险提示（Trade-offs）
/// - 取消语义依赖完成单元持有在途尝试的通道句柄：重试换通道时经
///   `retarget` 转移，竞态窗口内产出的新通道会被立即关闭。
pub struct TransportConnector;

impl TransportConnector {
    /// 绑定监听端点。
    ///
    /// # 契约说明（What）
    /// - 初始化链成功后在通道上下文内执行绑定；绑定失败关闭通道并
    ///   以根因解析失败；
    /// - `is_domain_socket` 指示地址族，决定工厂槽位与选项过滤。
    pub fn bind<C: Channel>(
        config: Arc<TransportConfig<C>>,
        initializer: ChannelInitializer<C>,
        bind_address: TransportAddr,
        is_domain_socket: bool,
    ) -> ChannelPromise<C> {
        let executor = config.group().next();
        let outer = ChannelPromise::new(Arc::clone(&executor));
        let init = Self::init_and_register(
            config,
            initializer,
            is_domain_socket,
            executor,
            Arc::new(NoopPropagation),
        );
        let outer_handle = outer.clone();
        init.subscribe(FnConsumer::new(move |result: crate::Result<C>| match result {
            Ok(channel) => {
                if !outer_handle.retarget(channel.clone()) {
                    return;
                }
                Self::bind_within_context(channel, bind_address, outer_handle);
            }
            Err(error) => {
                outer_handle.fail(error);
            }
        }));
        outer
    }

    /// 连接远端，执行上下文取配置组的下一个。
    pub fn connect<C: Channel>(
        config: Arc<TransportConfig<C>>,
        remote: TransportAddr,
        resolver: Arc<dyn AddressResolver>,
        initializer: ChannelInitializer<C>,
    ) -> ChannelPromise<C> {
        let executor = config.group().next();
        Self::connect_on(config, remote, resolver, initializer, executor)
    }

    /// 连接远端，使用显式指定的执行上下文。
    pub fn connect_on<C: Channel>(
        config: Arc<TransportConfig<C>>,
        remote: TransportAddr,
        resolver: Arc<dyn AddressResolver>,
        initializer: ChannelInitializer<C>,
        executor: Arc<dyn EventExecutor>,
    ) -> ChannelPromise<C> {
        Self::connect_with_propagation(
            config,
            remote,
            resolver,
            initializer,
            executor,
            Arc::new(NoopPropagation),
        )
    }

    /// 连接远端，携带显式执行上下文与跨上下文传播实现。
    ///
    /// # 契约说明（What）
    /// - 域套接字判定从远端地址族推导；
    /// - 候选地址严格按解析器给定顺序串行尝试；每个后续尝试都经由
    ///   初始化链获得全新通道，失败通道绝不复用；
    /// - 对外只浮出一个结果：就绪通道，或最后失败阶段的根因。
    pub fn connect_with_propagation<C: Channel>(
        config: Arc<TransportConfig<C>>,
        remote: TransportAddr,
        resolver: Arc<dyn AddressResolver>,
        initializer: ChannelInitializer<C>,
        executor: Arc<dyn EventExecutor>,
        propagation: Arc<dyn PropagationContext<C>>,
    ) -> ChannelPromise<C> {
        let is_domain_socket = remote.is_domain_socket();
        let outer = ChannelPromise::new(Arc::clone(&executor));
        let flow = Arc::new(ConnectFlow {
            config: Arc::clone(&config),
            initializer: initializer.clone(),
            resolver,
            remote,
            is_domain_socket,
            executor: Arc::clone(&executor),
            propagation: Arc::clone(&propagation),
            cursor: AtomicUsize::new(0),
        });
        let init =
            Self::init_and_register(config, initializer, is_domain_socket, executor, propagation);
        let outer_handle = outer.clone();
        init.subscribe(FnConsumer::new(move |result: crate::Result<C>| match result {
            Ok(channel) => {
                if !outer_handle.retarget(channel.clone()) {
                    return;
                }
                Self::resolve_and_connect(channel, flow, outer_handle);
            }
            Err(error) => {
                outer_handle.fail(error);
            }
        }));
        outer
    }

    /// 创建、配置、初始化并注册一条通道。
    ///
    /// # 契约说明（What）
    /// - 工厂失败立即返回预失败单元——尚无通道需要清理；
    /// - 其余步骤一律投递到通道上下文内按序执行：配置 → 流水线
    ///   初始化 → 注册；
    /// - 选项逐项应用：不认识或应用失败的选项告警后跳过，配置阶段
    ///   永不中断初始化；域套接字静默跳过仅 IP 族有效的选项；
    /// - 客户端初始化闭包返回即完成；服务端初始化等待接入器解析
    ///   [`InitSignal`]；初始化失败强制关闭通道；
    /// - 注册失败时：通道自报已注册则有序关闭，否则强制关闭。
    pub fn init_and_register<C: Channel>(
        config: Arc<TransportConfig<C>>,
        initializer: ChannelInitializer<C>,
        is_domain_socket: bool,
        executor: Arc<dyn EventExecutor>,
        propagation: Arc<dyn PropagationContext<C>>,
    ) -> ChannelPromise<C> {
        let channel = match &initializer {
            ChannelInitializer::Server(acceptor) => {
                let factory = match config.server_connection_factory(is_domain_socket) {
                    Ok(factory) => Arc::clone(factory),
                    Err(error) => return ChannelPromise::failed(executor, error),
                };
                let child_group = config
                    .child_group()
                    .cloned()
                    .unwrap_or_else(|| Arc::clone(config.group()));
                match factory.new_channel(Arc::clone(&executor), child_group) {
                    Ok(channel) => {
                        acceptor.prepare(&channel);
                        channel
                    }
                    Err(error) => return ChannelPromise::failed(executor, error),
                }
            }
            ChannelInitializer::Client(_) => {
                let factory = match config.connection_factory(is_domain_socket) {
                    Ok(factory) => Arc::clone(factory),
                    Err(error) => return ChannelPromise::failed(executor, error),
                };
                match factory.new_channel(Arc::clone(&executor)) {
                    Ok(channel) => channel,
                    Err(error) => return ChannelPromise::failed(executor, error),
                }
            }
        };

        propagation.save(&channel);

        let promise = ChannelPromise::with_channel(channel.clone());
        let init_promise = promise.clone();
        executor.execute(Box::new(move || {
            apply_options(&channel, config.options(), is_domain_socket);
            apply_attributes(&channel, config.attributes());
            match initializer {
                ChannelInitializer::Client(init) => match init.as_ref()(&channel) {
                    Ok(()) => register_channel(channel, init_promise),
                    Err(cause) => {
                        channel.close_forcibly();
                        init_promise.fail(cause);
                    }
                },
                ChannelInitializer::Server(acceptor) => {
                    let signal = InitSignal::new();
                    acceptor.install(&channel, signal.clone());
                    signal.on_resolved(move |result| match result {
                        Ok(()) => register_channel(channel, init_promise),
                        Err(cause) => {
                            channel.close_forcibly();
                            init_promise.fail(cause);
                        }
                    });
                }
            }
        }));
        promise
    }

    fn bind_within_context<C: Channel>(
        channel: C,
        local: TransportAddr,
        outer: ChannelPromise<C>,
    ) {
        let executor = channel.executor();
        executor.execute(Box::new(move || {
            let closer = channel.clone();
            channel.bind(
                &local,
                Box::new(move |result| match result {
                    Ok(()) => {
                        outer.succeed();
                    }
                    Err(cause) => {
                        closer.close();
                        outer.fail(cause);
                    }
                }),
            );
        }));
    }

    /// 地址解析桥：决定是否解析，并把结果交给连接状态机。
    fn resolve_and_connect<C: Channel>(
        channel: C,
        flow: Arc<ConnectFlow<C>>,
        outer: ChannelPromise<C>,
    ) {
        // 不支持的地址族或已是具体形态：跳过解析，单地址直连。
        if !flow.resolver.is_supported(&flow.remote) || flow.resolver.is_resolved(&flow.remote) {
            let candidates: Arc<[TransportAddr]> = Arc::from(vec![flow.remote.clone()]);
            Self::attempt(channel, candidates, flow, outer);
            return;
        }

        if let Some(observer) = flow.config.before_resolve() {
            observer(&channel);
        }

        let resolve_flow = Arc::clone(&flow);
        let resolve_channel = channel.clone();
        let on_resolved: ResolveCallback = Box::new(move |result| match result {
            Ok(addresses) => {
                if addresses.is_empty() {
                    // 空候选列表按解析失败处理，而非零次尝试的成功。
                    let error = CoreError::new(
                        codes::RESOLVE_EMPTY,
                        "resolution produced an empty candidate list",
                    );
                    if let Some(observer) = resolve_flow.config.on_resolve_error() {
                        observer(&resolve_channel, &error);
                    }
                    resolve_channel.close();
                    outer.fail(error);
                    return;
                }
                if let Some(observer) = resolve_flow.config.after_resolve() {
                    observer(&resolve_channel, &addresses[0]);
                }
                let candidates: Arc<[TransportAddr]> = addresses.into();
                Self::attempt(resolve_channel, candidates, resolve_flow, outer);
            }
            Err(error) => {
                // 解析失败是终态：没有候选列表可供回退。
                if let Some(observer) = resolve_flow.config.on_resolve_error() {
                    observer(&resolve_channel, &error);
                }
                resolve_channel.close();
                outer.fail(error);
            }
        });

        let guard = flow.propagation.restore();
        flow.resolver.resolve_all(&flow.remote, on_resolved);
        drop(guard);
    }

    /// 对游标指向的候选地址执行一次连接尝试。
    fn attempt<C: Channel>(
        channel: C,
        candidates: Arc<[TransportAddr]>,
        flow: Arc<ConnectFlow<C>>,
        outer: ChannelPromise<C>,
    ) {
        let executor = channel.executor();
        executor.execute(Box::new(move || {
            let index = flow.cursor.load(Ordering::Acquire);
            let remote = candidates[index].clone();
            debug!(remote = %remote, attempt = index + 1, total = candidates.len(), "connecting");
            let local = flow.config.bind_address().map(|supplier| supplier());

            let closer = channel.clone();
            let callback_flow = Arc::clone(&flow);
            let failed_remote = remote.clone();
            let on_done: CompletionCallback = Box::new(move |result| match result {
                Ok(()) => Self::finish_attempt(ConnectOutcome::Connected, callback_flow, outer),
                Err(cause) => {
                    closer.close();
                    debug!(remote = %failed_remote, error = %cause, "connect attempt failed");
                    let next = index + 1;
                    let outcome = if next < candidates.len() {
                        ConnectOutcome::Retry { candidates }
                    } else {
                        ConnectOutcome::Aborted(cause)
                    };
                    Self::finish_attempt(outcome, callback_flow, outer);
                }
            });
            channel.connect(&remote, local.as_ref(), on_done);
        }));
    }

    /// 消化一次尝试的结果；重试信号在此被吸收，绝不外泄。
    fn finish_attempt<C: Channel>(
        outcome: ConnectOutcome,
        flow: Arc<ConnectFlow<C>>,
        outer: ChannelPromise<C>,
    ) {
        match outcome {
            ConnectOutcome::Connected => {
                outer.succeed();
            }
            ConnectOutcome::Aborted(cause) => {
                outer.fail(cause);
            }
            ConnectOutcome::Retry { candidates } => {
                if outer.is_cancelled() {
                    return;
                }
                flow.cursor.fetch_add(1, Ordering::AcqRel);
                let init = Self::init_and_register(
                    Arc::clone(&flow.config),
                    flow.initializer.clone(),
                    flow.is_domain_socket,
                    Arc::clone(&flow.executor),
                    Arc::clone(&flow.propagation),
                );
                let retry_flow = flow;
                init.subscribe(FnConsumer::new(move |result: crate::Result<C>| match result {
                    Ok(channel) => {
                        if !outer.retarget(channel.clone()) {
                            return;
                        }
                        Self::attempt(channel, candidates, retry_flow, outer);
                    }
                    Err(error) => {
                        outer.fail(error);
                    }
                }));
            }
        }
    }
}

/// 一次逻辑连接调用贯穿全部重试共享的状态。
struct ConnectFlow<C: Channel> {
    config: Arc<TransportConfig<C>>,
    initializer: ChannelInitializer<C>,
    resolver: Arc<dyn AddressResolver>,
    remote: TransportAddr,
    is_domain_socket: bool,
    executor: Arc<dyn EventExecutor>,
    propagation: Arc<dyn PropagationContext<C>>,
    /// 尝试游标：独立于候选列表存在，仅随失败前进、绝不回退。
    cursor: AtomicUsize,
}

/// 单次尝试的内部结果；`Retry` 变体只在编排器循环内流转。
enum ConnectOutcome {
    Connected,
    Retry { candidates: Arc<[TransportAddr]> },
    Aborted(CoreError),
}

fn apply_options<C: Channel>(
    channel: &C,
    options: &[(ChannelOption, OptionValue)],
    is_domain_socket: bool,
) {
    for (option, value) in options {
        // 域套接字上仅 IP 族有效的选项直接跳过，不告警。
        if is_domain_socket && option.is_inet_only() {
            continue;
        }
        match channel.set_option(*option, value) {
            Ok(true) => {}
            Ok(false) => warn!(option = ?option, "unknown channel option"),
            Err(error) => {
                warn!(option = ?option, value = ?value, error = %error, "failed to set channel option");
            }
        }
    }
}

fn apply_attributes<C: Channel>(channel: &C, attributes: &[(AttributeKey, AttributeValue)]) {
    for (key, value) in attributes {
        channel.set_attribute(key.clone(), Arc::clone(value));
    }
}

fn register_channel<C: Channel>(channel: C, promise: ChannelPromise<C>) {
    let closer = channel.clone();
    channel.register(Box::new(move |result| match result {
        Ok(()) => {
            promise.succeed();
        }
        Err(cause) => {
            // 已注册的通道走有序关闭；从未注册成功的直接强制拆除。
            if closer.is_registered() {
                closer.close();
            } else {
                closer.close_forcibly();
            }
            promise.fail(cause);
        }
    }));
}
