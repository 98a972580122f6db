use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use flint_core::executor::{EventExecutor, EventExecutorGroup, Task};
use tokio::runtime::{Builder, Handle};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tracing::debug;

use crate::error::{RuntimeError, event_loop_error};

/// 独占一条线程的 Tokio 事件循环。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 通道线程受限模型要求"一个上下文、一条线程、严格提交序"；
///   多线程调度器无法承诺任务间的顺序，故每个循环独占一个
///   current-thread 运行时；
/// - 任务经无界队列进入单消费循环，天然串行且保持 FIFO，免去
///   对调度器轮询顺序的依赖。
///
/// ## 逻辑 (How)
/// - 构造时拉起承载线程：线程内先构建运行时，把句柄与线程标识
///   经一次性通道交还调用方，再阻塞于任务队列消费循环；
/// - `execute` 从任意线程向队列投递任务；
/// - `in_event_loop` 比对当前线程标识与承载线程标识；
/// - 最后一个句柄释放时关闭队列发送端，消费循环随之退出并合拢
///   线程；在循环线程内释放时跳过合拢，避免自我 join。
///
/// ## 契约 (What)
/// - **顺序保证**：提交顺序即执行顺序；
/// - **前置条件**：任务不得阻塞线程过久，否则拖慢同循环的全部
///   后续任务与在其上运行的异步任务（如 DNS 查询）；
/// - **后置条件**：`new` 成功返回后队列立即可用。
///
/// ## 注意事项 (Trade-offs)
/// - 句柄释放后仍在队列中的任务被丢弃而非执行；
/// - 任务内 panic 会终结承载线程；桩测试外的任务应自行兜底。
pub struct TokioEventLoop {
    inner: Arc<LoopInner>,
}

struct LoopInner {
    name: String,
    handle: Handle,
    thread_id: ThreadId,
    sender: Option<UnboundedSender<Task>>,
    thread: Option<JoinHandle<()>>,
}

impl TokioEventLoop {
    /// 拉起以 `name` 命名的事件循环线程。
    pub fn new(name: impl Into<String>) -> flint_core::Result<Self> {
        let name = name.into();
        let (queue_tx, mut queue_rx) = unbounded_channel::<Task>();
        let (handover_tx, handover_rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(cause) => {
                        let _ = handover_tx.send(Err(RuntimeError::Build(cause)));
                        return;
                    }
                };
                let _ = handover_tx.send(Ok((runtime.handle().clone(), thread::current().id())));
                runtime.block_on(async move {
                    while let Some(task) = queue_rx.recv().await {
                        task();
                    }
                });
            })
            .map_err(|cause| event_loop_error(RuntimeError::Spawn(cause)))?;
        let (handle, thread_id) = handover_rx
            .recv()
            .map_err(|_| event_loop_error(RuntimeError::HandleUnavailable))?
            .map_err(event_loop_error)?;
        debug!(name = %name, "event loop started");
        Ok(Self {
            inner: Arc::new(LoopInner {
                name,
                handle,
                thread_id,
                sender: Some(queue_tx),
                thread: Some(thread),
            }),
        })
    }

    /// 循环承载的 Tokio 运行时句柄（供解析等异步任务复用）。
    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    /// 循环名称。
    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl Clone for TokioEventLoop {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl EventExecutor for TokioEventLoop {
    fn execute(&self, task: Task) {
        if let Some(sender) = &self.inner.sender {
            // 发送失败意味着循环已在关闭路径上，任务按关闭语义丢弃。
            let _ = sender.send(task);
        }
    }

    fn in_event_loop(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }
}

impl Drop for LoopInner {
    fn drop(&mut self) {
        drop(self.sender.take());
        if thread::current().id() == self.thread_id {
            return;
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// 轮转派发的事件循环组。
///
/// # 契约说明（What）
/// - `new` 一次性拉起 `size`（至少 1）个循环，线程名为
///   `"{name_prefix}-{index}"`；
/// - `next` 按轮转返回下一个循环；同一通道整个生命周期只使用
///   `next` 返回的那一个循环。
pub struct TokioEventLoopGroup {
    loops: Vec<TokioEventLoop>,
    cursor: AtomicUsize,
}

impl TokioEventLoopGroup {
    /// 拉起 `size` 个事件循环（`size` 为零时按 1 处理）。
    pub fn new(size: usize, name_prefix: &str) -> flint_core::Result<Self> {
        let size = size.max(1);
        let mut loops = Vec::with_capacity(size);
        for index in 0..size {
            loops.push(TokioEventLoop::new(format!("{name_prefix}-{index}"))?);
        }
        Ok(Self {
            loops,
            cursor: AtomicUsize::new(0),
        })
    }

    /// 访问组内全部循环。
    pub fn loops(&self) -> &[TokioEventLoop] {
        &self.loops
    }

    /// 组内首个循环（解析器等单循环用户的便捷入口）。
    pub fn first(&self) -> &TokioEventLoop {
        &self.loops[0]
    }
}

impl EventExecutorGroup for TokioEventLoopGroup {
    fn next(&self) -> Arc<dyn EventExecutor> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.loops.len();
        Arc::new(self.loops[index].clone())
    }
}
