use std::sync::Arc;

/// 提交给执行上下文的一次性任务。
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// `EventExecutor` 定义通道所属的单线程执行上下文契约。
///
/// # 设计背景（Why）
/// - 每条通道永久绑定到一个执行上下文，通道状态（选项、流水线、注册、
///   连接）的全部变更都必须在该上下文内完成，从而免去通道内部加锁；
/// - 编排器自身无状态、可从任意线程调用，它通过本契约把触碰通道的
///   工作显式投递到目标上下文，而不是依赖隐式的线程亲和。
///
/// # 契约说明（What）
/// - `execute`：将任务入队到上下文。**即使调用方已经身处该上下文，
///   任务也必须入队而非内联执行**，以保证同一上下文内的提交顺序即
///   执行顺序；
/// - `in_event_loop`：判断当前线程是否就是该上下文的承载线程，供
///   需要"已在上下文内则内联"语义的调用方（如订阅注册）做分支。
///
/// # 风险提示（Trade-offs）
/// - 实现必须保证任务按提交顺序串行执行；乱序或并行执行会破坏
///   初始化步骤"配置 → 流水线 → 注册"的顺序保证；
/// - 任务内 panic 的处置由实现决定，但不得使上下文永久失去调度能力。
pub trait EventExecutor: Send + Sync + 'static {
    /// 将任务入队到本执行上下文，按提交顺序串行执行。
    fn execute(&self, task: Task);

    /// 当前线程是否为本上下文的承载线程。
    fn in_event_loop(&self) -> bool;
}

/// `EventExecutorGroup` 管理一组执行上下文并按既定策略派发。
///
/// # 契约说明（What）
/// - `next`：返回下一个可用的执行上下文；典型实现为轮转派发；
/// - 同一个通道整个生命周期内只使用 `next` 返回的那一个上下文，
///   组本身不参与后续调度。
pub trait EventExecutorGroup: Send + Sync + 'static {
    /// 派发下一个执行上下文。
    fn next(&self) -> Arc<dyn EventExecutor>;
}

/// 若当前线程已在目标上下文内则内联执行，否则投递后执行。
///
/// # 契约说明（What）
/// - 仅用于"注册监听/读取状态"这类与上下文内既有任务不存在顺序
///   依赖的操作；通道状态变更一律走 [`EventExecutor::execute`]。
pub fn run_confined(executor: &dyn EventExecutor, task: impl FnOnce() + Send + 'static) {
    if executor.in_event_loop() {
        task();
    } else {
        executor.execute(Box::new(task));
    }
}
