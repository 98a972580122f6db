use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::channel::{
    Acceptor, AttributeKey, AttributeValue, Channel, ChannelFactory, ChannelOption,
    CompletionCallback, InitSignal, OptionValue, ServerChannelFactory,
};
use crate::error::{CoreError, ErrorCategory, codes};
use crate::executor::{EventExecutor, EventExecutorGroup};
use crate::resolver::TransportAddr;

/// 单个地址的连接脚本。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectScript {
    /// 连接立即成功。
    Succeed,
    /// 连接被拒绝。
    Refuse,
    /// 连接挂起，直到通道被关闭才以失败终止。
    Hold,
}

/// 注册脚本。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterScript {
    Succeed,
    /// 注册失败；`leave_registered` 控制通道事后自报的注册状态，
    /// 用于区分有序关闭与强制拆除两条清理路径。
    Fail { leave_registered: bool },
}

/// 绑定脚本。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindScript {
    Succeed,
    Refuse,
}

/// 通道行为剧本：工厂与其产出的全部通道共享同一份。
///
/// # 契约说明（What）
/// - 未脚本化的地址走 `default_connect`（缺省为成功）；
/// - `factory_failures` 大于零时，工厂按次消耗并返回构造失败；
/// - 选项处置：`option_unknown` 标记的键返回"不认识"，
///   `option_rejected` 标记的键返回应用失败。
pub struct StubPlan {
    connect_scripts: Mutex<HashMap<TransportAddr, ConnectScript>>,
    default_connect: Mutex<ConnectScript>,
    register_script: Mutex<RegisterScript>,
    bind_script: Mutex<BindScript>,
    unknown_options: Mutex<HashSet<ChannelOption>>,
    rejected_options: Mutex<HashSet<ChannelOption>>,
    factory_failures: AtomicUsize,
}

impl StubPlan {
    /// 构造缺省剧本：一切操作成功。
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connect_scripts: Mutex::new(HashMap::new()),
            default_connect: Mutex::new(ConnectScript::Succeed),
            register_script: Mutex::new(RegisterScript::Succeed),
            bind_script: Mutex::new(BindScript::Succeed),
            unknown_options: Mutex::new(HashSet::new()),
            rejected_options: Mutex::new(HashSet::new()),
            factory_failures: AtomicUsize::new(0),
        })
    }

    /// 脚本化：对该地址的连接被拒绝。
    pub fn connect_refused(&self, address: TransportAddr) {
        self.lock(&self.connect_scripts)
            .insert(address, ConnectScript::Refuse);
    }

    /// 脚本化：对该地址的连接成功。
    pub fn connect_succeeds(&self, address: TransportAddr) {
        self.lock(&self.connect_scripts)
            .insert(address, ConnectScript::Succeed);
    }

    /// 脚本化：对该地址的连接挂起，由关闭动作终止。
    pub fn connect_held(&self, address: TransportAddr) {
        self.lock(&self.connect_scripts)
            .insert(address, ConnectScript::Hold);
    }

    /// 设置未脚本化地址的缺省连接行为。
    pub fn default_connect(&self, script: ConnectScript) {
        *self.lock(&self.default_connect) = script;
    }

    /// 脚本化注册失败。
    pub fn register_fails(&self, leave_registered: bool) {
        *self.lock(&self.register_script) = RegisterScript::Fail { leave_registered };
    }

    /// 脚本化绑定失败。
    pub fn bind_refused(&self) {
        *self.lock(&self.bind_script) = BindScript::Refuse;
    }

    /// 标记实现不认识的选项键。
    pub fn option_unknown(&self, option: ChannelOption) {
        self.lock(&self.unknown_options).insert(option);
    }

    /// 标记应用时失败的选项键。
    pub fn option_rejected(&self, option: ChannelOption) {
        self.lock(&self.rejected_options).insert(option);
    }

    /// 让接下来 `times` 次工厂调用失败。
    pub fn fail_factory_times(&self, times: usize) {
        self.factory_failures.store(times, Ordering::Release);
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 可脚本化的通道桩。
///
/// # 契约说明（What）
/// - 完成回调一律经执行上下文投递，恰好一次；
/// - `close` / `close_forcibly` 幂等，并以失败终止挂起中的连接；
/// - 记录应用过的选项、属性键、绑定与连接目标，供断言取用。
pub struct StubChannel {
    inner: Arc<StubChannelInner>,
}

struct StubChannelInner {
    sequence: usize,
    executor: Arc<dyn EventExecutor>,
    plan: Arc<StubPlan>,
    state: Mutex<StubChannelState>,
}

#[derive(Default)]
struct StubChannelState {
    registered: bool,
    closed: bool,
    forcibly_closed: bool,
    bound_local: Option<TransportAddr>,
    connected_remote: Option<TransportAddr>,
    connect_local: Option<TransportAddr>,
    applied_options: Vec<(ChannelOption, OptionValue)>,
    attribute_keys: Vec<AttributeKey>,
    held_connect: Option<CompletionCallback>,
}

impl StubChannel {
    /// 工厂分配的创建序号（从 0 起）。
    pub fn sequence(&self) -> usize {
        self.inner.sequence
    }

    /// 通道是否已关闭（任一路径）。
    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    /// 通道是否经由强制拆除关闭。
    pub fn was_forcibly_closed(&self) -> bool {
        self.lock_state().forcibly_closed
    }

    /// 成功连接到的远端地址。
    pub fn connected_remote(&self) -> Option<TransportAddr> {
        self.lock_state().connected_remote.clone()
    }

    /// 连接时携带的本地绑定地址。
    pub fn connect_local(&self) -> Option<TransportAddr> {
        self.lock_state().connect_local.clone()
    }

    /// 绑定到的本地地址。
    pub fn bound_local(&self) -> Option<TransportAddr> {
        self.lock_state().bound_local.clone()
    }

    /// 成功应用的选项（按应用顺序）。
    pub fn applied_options(&self) -> Vec<(ChannelOption, OptionValue)> {
        self.lock_state().applied_options.clone()
    }

    /// 附加过的属性键（按附加顺序）。
    pub fn attribute_keys(&self) -> Vec<AttributeKey> {
        self.lock_state().attribute_keys.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, StubChannelState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn close_common(&self, forcibly: bool) {
        let held = {
            let mut state = self.lock_state();
            state.closed = true;
            if forcibly {
                state.forcibly_closed = true;
            }
            state.held_connect.take()
        };
        if let Some(on_done) = held {
            self.inner.executor.execute(Box::new(move || {
                on_done(Err(CoreError::new(
                    codes::CHANNEL_CLOSED,
                    "channel closed while connect was pending",
                )));
            }));
        }
    }
}

impl Clone for StubChannel {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Channel for StubChannel {
    fn executor(&self) -> Arc<dyn EventExecutor> {
        Arc::clone(&self.inner.executor)
    }

    fn register(&self, on_done: CompletionCallback) {
        let script = *self.inner.plan.lock(&self.inner.plan.register_script);
        let inner = Arc::clone(&self.inner);
        self.inner.executor.execute(Box::new(move || {
            let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);
            match script {
                RegisterScript::Succeed => {
                    state.registered = true;
                    drop(state);
                    on_done(Ok(()));
                }
                RegisterScript::Fail { leave_registered } => {
                    state.registered = leave_registered;
                    drop(state);
                    on_done(Err(CoreError::new(
                        codes::REGISTER_FAILED,
                        "stubbed registration failure",
                    )));
                }
            }
        }));
    }

    fn bind(&self, local: &TransportAddr, on_done: CompletionCallback) {
        let script = *self.inner.plan.lock(&self.inner.plan.bind_script);
        let local = local.clone();
        let inner = Arc::clone(&self.inner);
        self.inner.executor.execute(Box::new(move || {
            let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                drop(state);
                on_done(Err(CoreError::new(codes::CHANNEL_CLOSED, "channel closed")));
                return;
            }
            match script {
                BindScript::Succeed => {
                    state.bound_local = Some(local);
                    drop(state);
                    on_done(Ok(()));
                }
                BindScript::Refuse => {
                    drop(state);
                    on_done(Err(CoreError::new(
                        codes::BIND_FAILED,
                        format!("stubbed bind refusal for {local}"),
                    )));
                }
            }
        }));
    }

    fn connect(
        &self,
        remote: &TransportAddr,
        local: Option<&TransportAddr>,
        on_done: CompletionCallback,
    ) {
        let script = self
            .inner
            .plan
            .lock(&self.inner.plan.connect_scripts)
            .get(remote)
            .copied()
            .unwrap_or(*self.inner.plan.lock(&self.inner.plan.default_connect));
        let remote = remote.clone();
        let local = local.cloned();
        let inner = Arc::clone(&self.inner);
        self.inner.executor.execute(Box::new(move || {
            let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                drop(state);
                on_done(Err(CoreError::new(codes::CHANNEL_CLOSED, "channel closed")));
                return;
            }
            match script {
                ConnectScript::Succeed => {
                    state.connected_remote = Some(remote);
                    state.connect_local = local;
                    drop(state);
                    on_done(Ok(()));
                }
                ConnectScript::Refuse => {
                    drop(state);
                    on_done(Err(CoreError::new(
                        codes::CONNECT_FAILED,
                        format!("stubbed connection refusal for {remote}"),
                    )
                    .with_category(ErrorCategory::Retryable)));
                }
                ConnectScript::Hold => {
                    state.held_connect = Some(on_done);
                }
            }
        }));
    }

    fn close(&self) {
        self.close_common(false);
    }

    fn close_forcibly(&self) {
        self.close_common(true);
    }

    fn is_registered(&self) -> bool {
        self.lock_state().registered
    }

    fn set_option(&self, option: ChannelOption, value: &OptionValue) -> crate::Result<bool> {
        if self
            .inner
            .plan
            .lock(&self.inner.plan.unknown_options)
            .contains(&option)
        {
            return Ok(false);
        }
        if self
            .inner
            .plan
            .lock(&self.inner.plan.rejected_options)
            .contains(&option)
        {
            return Err(CoreError::new(
                codes::OPTION_REJECTED,
                "stubbed option application failure",
            ));
        }
        self.lock_state()
            .applied_options
            .push((option, value.clone()));
        Ok(true)
    }

    fn set_attribute(&self, key: AttributeKey, _value: AttributeValue) {
        self.lock_state().attribute_keys.push(key);
    }
}

/// 记录每条产出通道的桩工厂，同时实现客户端与服务端工厂契约。
pub struct StubChannelFactory {
    plan: Arc<StubPlan>,
    created: Mutex<Vec<StubChannel>>,
}

impl StubChannelFactory {
    /// 以给定剧本构造工厂。
    pub fn new(plan: Arc<StubPlan>) -> Arc<Self> {
        Arc::new(Self {
            plan,
            created: Mutex::new(Vec::new()),
        })
    }

    /// 工厂迄今产出的全部通道（按创建顺序）。
    pub fn created(&self) -> Vec<StubChannel> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 工厂迄今产出的通道数。
    pub fn created_count(&self) -> usize {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 构造通道的共享入口：两个工厂契约都落到这里。
    pub fn new_stub(&self, executor: Arc<dyn EventExecutor>) -> crate::Result<StubChannel> {
        if self
            .plan
            .factory_failures
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                left.checked_sub(1)
            })
            .is_ok()
        {
            return Err(CoreError::new(
                codes::FACTORY_FAILED,
                "stubbed channel factory failure",
            ));
        }
        let mut created = self.created.lock().unwrap_or_else(PoisonError::into_inner);
        let channel = StubChannel {
            inner: Arc::new(StubChannelInner {
                sequence: created.len(),
                executor,
                plan: Arc::clone(&self.plan),
                state: Mutex::new(StubChannelState::default()),
            }),
        };
        created.push(channel.clone());
        Ok(channel)
    }
}

impl ChannelFactory<StubChannel> for StubChannelFactory {
    fn new_channel(&self, executor: Arc<dyn EventExecutor>) -> crate::Result<StubChannel> {
        self.new_stub(executor)
    }
}

impl ServerChannelFactory<StubChannel> for StubChannelFactory {
    fn new_channel(
        &self,
        executor: Arc<dyn EventExecutor>,
        _child_group: Arc<dyn EventExecutorGroup>,
    ) -> crate::Result<StubChannel> {
        self.new_stub(executor)
    }
}

/// 记录准备与装配调用的接入器桩；信号交由测试显式解析。
pub struct RecordingAcceptor {
    prepared: AtomicUsize,
    signals: Mutex<Vec<InitSignal>>,
}

impl RecordingAcceptor {
    /// 构造空记录的接入器。
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            prepared: AtomicUsize::new(0),
            signals: Mutex::new(Vec::new()),
        })
    }

    /// `prepare` 被调用的次数。
    pub fn prepared_count(&self) -> usize {
        self.prepared.load(Ordering::Acquire)
    }

    /// 最近一次 `install` 收到的信号。
    pub fn last_signal(&self) -> Option<InitSignal> {
        self.signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl<C: Channel> Acceptor<C> for RecordingAcceptor {
    fn prepare(&self, _channel: &C) {
        self.prepared.fetch_add(1, Ordering::AcqRel);
    }

    fn install(&self, _channel: &C, signal: InitSignal) {
        self.signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(signal);
    }
}
