use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{CoreError, codes};
use crate::resolver::{AddressResolver, ResolveCallback, TransportAddr};

/// 解析剧本。
pub enum ResolveScript {
    /// 以给定有序列表完成解析（空列表用于验证空解析语义）。
    Respond(Vec<TransportAddr>),
    /// 以给定文案的解析失败完成。
    Fail(String),
    /// 挂起解析，由测试经 [`ScriptedResolver::release`] 释放。
    Hold,
}

/// 可脚本化的解析器桩。
///
/// # 契约说明（What）
/// - 仅逻辑主机名地址族被声明为受支持，具体地址自报已解析——
///   与真实解析引擎的判定一致；
/// - 剧本按次消耗：一次 `resolve_all` 取走一份剧本；未脚本化的调用
///   以失败完成，避免测试悬死。
pub struct ScriptedResolver {
    script: Mutex<Option<ResolveScript>>,
    held: Mutex<Option<ResolveCallback>>,
    resolve_calls: AtomicUsize,
}

impl ScriptedResolver {
    /// 构造以给定地址列表应答的解析器。
    pub fn respond_with(addresses: Vec<TransportAddr>) -> Arc<Self> {
        Self::with_script(ResolveScript::Respond(addresses))
    }

    /// 构造以失败应答的解析器。
    pub fn failing(message: impl Into<String>) -> Arc<Self> {
        Self::with_script(ResolveScript::Fail(message.into()))
    }

    /// 构造挂起应答的解析器。
    pub fn holding() -> Arc<Self> {
        Self::with_script(ResolveScript::Hold)
    }

    fn with_script(script: ResolveScript) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Some(script)),
            held: Mutex::new(None),
            resolve_calls: AtomicUsize::new(0),
        })
    }

    /// 释放挂起中的解析调用。
    pub fn release(&self, result: crate::Result<Vec<TransportAddr>>) {
        let held = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(on_done) = held {
            on_done(result);
        }
    }

    /// `resolve_all` 被调用的次数。
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::Acquire)
    }
}

impl AddressResolver for ScriptedResolver {
    fn is_supported(&self, address: &TransportAddr) -> bool {
        matches!(address, TransportAddr::Name { .. })
    }

    fn is_resolved(&self, address: &TransportAddr) -> bool {
        address.is_concrete()
    }

    fn resolve_all(&self, _address: &TransportAddr, on_done: ResolveCallback) {
        self.resolve_calls.fetch_add(1, Ordering::AcqRel);
        let script = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match script {
            Some(ResolveScript::Respond(addresses)) => on_done(Ok(addresses)),
            Some(ResolveScript::Fail(message)) => {
                on_done(Err(CoreError::new(codes::RESOLVE_FAILED, message)));
            }
            Some(ResolveScript::Hold) => {
                *self.held.lock().unwrap_or_else(PoisonError::into_inner) = Some(on_done);
            }
            None => on_done(Err(CoreError::new(
                codes::RESOLVE_FAILED,
                "no scripted resolution result",
            ))),
        }
    }
}
