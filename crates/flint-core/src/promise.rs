use std::sync::{Arc, Mutex, PoisonError};

use crate::channel::Channel;
use crate::error::{CoreError, codes};
use crate::executor::{EventExecutor, run_confined};

/// 完成单元的单一消费者契约。
///
/// # 契约说明（What）
/// - 成功结果按"先通告值、再通告完成"两个事件送达：`on_channel`
///   携带就绪通道，随后 `on_complete` 收尾——与单元素异步流的
///   观察序一致；
/// - 失败结果仅触发一次 `on_error`；
/// - 全部回调都在通道的执行上下文内执行。
pub trait ChannelConsumer<C>: Send + 'static {
    /// 通告就绪通道。
    fn on_channel(&mut self, channel: C);

    /// 通告成功完成。
    fn on_complete(&mut self);

    /// 通告失败。
    fn on_error(&mut self, error: CoreError);
}

/// 把 `FnOnce(Result)` 闭包适配为消费者的便捷包装。
///
/// # 契约说明（What）
/// - 闭包在 `on_channel` 或 `on_error` 时刻恰好调用一次；
/// - `on_complete` 不再携带信息，映射为空操作。
pub struct FnConsumer<F> {
    callback: Option<F>,
}

impl<F> FnConsumer<F> {
    /// 包装一次性回调闭包。
    pub fn new(callback: F) -> Self {
        Self {
            callback: Some(callback),
        }
    }
}

impl<C, F> ChannelConsumer<C> for FnConsumer<F>
where
    F: FnOnce(crate::Result<C>) + Send + 'static,
{
    fn on_channel(&mut self, channel: C) {
        if let Some(callback) = self.callback.take() {
            callback(Ok(channel));
        }
    }

    fn on_complete(&mut self) {}

    fn on_error(&mut self, error: CoreError) {
        if let Some(callback) = self.callback.take() {
            callback(Err(error));
        }
    }
}

/// 单值完成单元：恰好一次解析、至多一个消费者的异步结果槽。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 建连流程由多个线程受限的异步步骤（创建、配置、初始化、注册、
///   解析、连接）拼接而成，对外却只承诺一个结果：就绪通道或失败根因；
/// - 监听器链式回调被替换为显式的结果槽：解析方与订阅方可能身处
///   不同上下文，槽内的单一状态机把两侧的竞态收敛为一次判定。
///
/// ## 逻辑（How）
/// - 内部状态受单把互斥锁保护，解析采用"先到者赢"的比较交换语义；
/// - `subscribe` 若在通道上下文之外被调用，先把自身投递回该上下文
///   再读取或登记，使注册与解析在同一上下文内串行化；
/// - 取消不直接解析槽，而是关闭当前挂载的通道，让在途操作自然以
///   失败终止；取消之后的解析结果不再向消费者投递。
///
/// ## 契约（What）
/// - `succeed` / `fail`：首个调用者胜出，其后调用为空操作并返回
///   `false`；成功解析要求槽上已挂载通道；
/// - `subscribe`：至多一个消费者；重复订阅被拒绝，后来者收到
///   [`codes::ALREADY_SUBSCRIBED`]；解析先于订阅时，消费者在订阅
///   时刻（于通道上下文内）同步收到已存结果；
/// - `cancel`：随时可调用；关闭当前挂载的通道并抑制其后的消费者
///   通知，自身不解析槽；
/// - `retarget`：重试循环把取消语义转移到新一轮尝试的通道上；若
///   槽已被取消则立即关闭新通道并返回 `false`。
///
/// ## 风险提示（Trade-offs）
/// - 消费者回调在锁外执行，回调内再次触碰同一单元不会死锁；
/// - 槽保留对通道的克隆直至取消或丢弃，取消语义因此总有目标可关。
pub struct ChannelPromise<C: Channel> {
    inner: Arc<PromiseInner<C>>,
}

struct PromiseInner<C: Channel> {
    executor: Arc<dyn EventExecutor>,
    state: Mutex<CellState<C>>,
}

struct CellState<C: Channel> {
    channel: Option<C>,
    outcome: Outcome,
    consumer: Option<Box<dyn ChannelConsumer<C>>>,
    subscribed: bool,
    cancelled: bool,
}

enum Outcome {
    Unset,
    Success,
    /// 失败结果；错误在送达消费者时被取走。
    Failed(Option<CoreError>),
}

enum SubscribeAction<C: Channel> {
    Stored,
    Dropped,
    Reject(Box<dyn ChannelConsumer<C>>),
    DeliverSuccess(Box<dyn ChannelConsumer<C>>, Option<C>),
    DeliverFailure(Box<dyn ChannelConsumer<C>>, Option<CoreError>),
}

impl<C: Channel> ChannelPromise<C> {
    /// 构造尚未挂载通道的完成单元（通道随后经 `retarget` 挂载）。
    pub fn new(executor: Arc<dyn EventExecutor>) -> Self {
        Self::build(executor, None, Outcome::Unset)
    }

    /// 构造挂载了给定通道的完成单元。
    pub fn with_channel(channel: C) -> Self {
        let executor = channel.executor();
        Self::build(executor, Some(channel), Outcome::Unset)
    }

    /// 构造已以失败解析的完成单元（无通道可清理的前置失败）。
    pub fn failed(executor: Arc<dyn EventExecutor>, error: CoreError) -> Self {
        Self::build(executor, None, Outcome::Failed(Some(error)))
    }

    fn build(executor: Arc<dyn EventExecutor>, channel: Option<C>, outcome: Outcome) -> Self {
        Self {
            inner: Arc::new(PromiseInner {
                executor,
                state: Mutex::new(CellState {
                    channel,
                    outcome,
                    consumer: None,
                    subscribed: false,
                    cancelled: false,
                }),
            }),
        }
    }

    /// 以当前挂载的通道解析为成功。
    ///
    /// # 契约说明（What）
    /// - 槽未挂载通道或已解析时返回 `false`；
    /// - 消费者已就位且未取消时，立即按"值、完成"两事件送达。
    pub fn succeed(&self) -> bool {
        let delivery = {
            let mut state = self.lock_state();
            if !matches!(state.outcome, Outcome::Unset) {
                return false;
            }
            let Some(channel) = state.channel.clone() else {
                return false;
            };
            state.outcome = Outcome::Success;
            if state.cancelled {
                None
            } else {
                state.consumer.take().map(|consumer| (consumer, channel))
            }
        };
        if let Some((mut consumer, channel)) = delivery {
            consumer.on_channel(channel);
            consumer.on_complete();
        }
        true
    }

    /// 以给定错误解析为失败。
    pub fn fail(&self, error: CoreError) -> bool {
        let delivery = {
            let mut state = self.lock_state();
            if !matches!(state.outcome, Outcome::Unset) {
                return false;
            }
            if state.cancelled {
                state.outcome = Outcome::Failed(Some(error));
                None
            } else if let Some(consumer) = state.consumer.take() {
                state.outcome = Outcome::Failed(None);
                Some((consumer, error))
            } else {
                state.outcome = Outcome::Failed(Some(error));
                None
            }
        };
        if let Some((mut consumer, error)) = delivery {
            consumer.on_error(error);
        }
        true
    }

    /// 注册唯一消费者。
    ///
    /// # 契约说明（What）
    /// - 调用方不在通道上下文内时，注册动作先被投递回该上下文；
    /// - 已有消费者时，新消费者立即收到
    ///   [`codes::ALREADY_SUBSCRIBED`]，原消费者不受影响；
    /// - 槽已解析时同步送达既有结果，否则在解析时刻送达。
    pub fn subscribe(&self, consumer: impl ChannelConsumer<C> + 'static) {
        let inner = Arc::clone(&self.inner);
        let executor = Arc::clone(&self.inner.executor);
        run_confined(executor.as_ref(), move || {
            PromiseInner::register(&inner, Box::new(consumer));
        });
    }

    /// 取消：关闭当前挂载的通道并抑制其后的消费者通知。
    pub fn cancel(&self) {
        let channel = {
            let mut state = self.lock_state();
            state.cancelled = true;
            state.channel.clone()
        };
        if let Some(channel) = channel {
            channel.close();
        }
    }

    /// 槽是否已被取消。
    pub fn is_cancelled(&self) -> bool {
        self.lock_state().cancelled
    }

    /// 槽是否已解析。
    pub fn is_done(&self) -> bool {
        !matches!(self.lock_state().outcome, Outcome::Unset)
    }

    /// 读取当前挂载的通道。
    pub fn channel(&self) -> Option<C> {
        self.lock_state().channel.clone()
    }

    /// 把取消目标切换为新一轮尝试的通道。
    ///
    /// # 契约说明（What）
    /// - 槽已取消时立即关闭传入通道并返回 `false`，调用方不得再
    ///   调度后续尝试。
    pub(crate) fn retarget(&self, channel: C) -> bool {
        let rejected = {
            let mut state = self.lock_state();
            if state.cancelled {
                Some(channel)
            } else {
                state.channel = Some(channel);
                None
            }
        };
        match rejected {
            Some(channel) => {
                channel.close();
                false
            }
            None => true,
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CellState<C>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Channel> Clone for ChannelPromise<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Channel> PromiseInner<C> {
    fn register(inner: &Arc<Self>, consumer: Box<dyn ChannelConsumer<C>>) {
        let action = {
            let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);
            let cell = &mut *state;
            if cell.cancelled {
                SubscribeAction::Dropped
            } else if cell.subscribed {
                SubscribeAction::Reject(consumer)
            } else {
                cell.subscribed = true;
                match &mut cell.outcome {
                    Outcome::Unset => {
                        cell.consumer = Some(consumer);
                        SubscribeAction::Stored
                    }
                    Outcome::Success => {
                        SubscribeAction::DeliverSuccess(consumer, cell.channel.clone())
                    }
                    Outcome::Failed(error) => {
                        SubscribeAction::DeliverFailure(consumer, error.take())
                    }
                }
            }
        };
        match action {
            SubscribeAction::Stored | SubscribeAction::Dropped => {}
            SubscribeAction::Reject(mut consumer) => {
                consumer.on_error(CoreError::new(
                    codes::ALREADY_SUBSCRIBED,
                    "completion cell already has a consumer",
                ));
            }
            SubscribeAction::DeliverSuccess(mut consumer, channel) => {
                if let Some(channel) = channel {
                    consumer.on_channel(channel);
                    consumer.on_complete();
                }
            }
            SubscribeAction::DeliverFailure(mut consumer, error) => {
                if let Some(error) = error {
                    consumer.on_error(error);
                }
            }
        }
    }
}
