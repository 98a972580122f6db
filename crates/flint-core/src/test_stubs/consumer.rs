use std::sync::{Arc, Mutex, PoisonError};

use crate::error::CoreError;
use crate::promise::ChannelConsumer;

/// 消费者观察到的单个事件。
pub enum ConsumerEvent<C> {
    Channel(C),
    Complete,
    Error(CoreError),
}

/// 记录事件序的消费者桩。
///
/// # 契约说明（What）
/// - 与配套的 [`ConsumerLog`] 共享同一事件缓冲；
/// - 消费者本体交给完成单元订阅，句柄留在测试侧做断言。
pub struct RecordingConsumer<C> {
    events: Arc<Mutex<Vec<ConsumerEvent<C>>>>,
}

impl<C> RecordingConsumer<C> {
    /// 构造消费者与其断言句柄。
    pub fn new() -> (Self, ConsumerLog<C>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                events: Arc::clone(&events),
            },
            ConsumerLog { events },
        )
    }
}

impl<C: Send + 'static> ChannelConsumer<C> for RecordingConsumer<C> {
    fn on_channel(&mut self, channel: C) {
        self.push(ConsumerEvent::Channel(channel));
    }

    fn on_complete(&mut self) {
        self.push(ConsumerEvent::Complete);
    }

    fn on_error(&mut self, error: CoreError) {
        self.push(ConsumerEvent::Error(error));
    }
}

impl<C> RecordingConsumer<C> {
    fn push(&self, event: ConsumerEvent<C>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// 事件缓冲的断言句柄。
pub struct ConsumerLog<C> {
    events: Arc<Mutex<Vec<ConsumerEvent<C>>>>,
}

impl<C> Clone for ConsumerLog<C> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<C: Clone> ConsumerLog<C> {
    /// 事件种类序列（`"channel"` / `"complete"` / `"error"`）。
    pub fn kinds(&self) -> Vec<&'static str> {
        self.lock()
            .iter()
            .map(|event| match event {
                ConsumerEvent::Channel(_) => "channel",
                ConsumerEvent::Complete => "complete",
                ConsumerEvent::Error(_) => "error",
            })
            .collect()
    }

    /// 首个值通告携带的通道。
    pub fn channel(&self) -> Option<C> {
        self.lock().iter().find_map(|event| match event {
            ConsumerEvent::Channel(channel) => Some(channel.clone()),
            _ => None,
        })
    }

    /// 首个错误通告的稳定错误码。
    pub fn error_code(&self) -> Option<String> {
        self.lock().iter().find_map(|event| match event {
            ConsumerEvent::Error(error) => Some(error.code().to_owned()),
            _ => None,
        })
    }

    /// 是否尚无任何事件。
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ConsumerEvent<C>>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
