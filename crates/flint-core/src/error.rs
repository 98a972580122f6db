use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// 稳定错误码清单，遵循 `<域>.<语义>` 命名约定。
///
/// # 设计背景（Why）
/// - 建连编排跨越工厂、初始化、注册、解析与连接多个阶段，日志、指标与
///   自动化治理需要稳定的机读码值来区分故障阶段；
/// - 码值一经发布即冻结语义，调用方可以安全地基于字符串前缀做路由。
///
/// # 契约说明（What）
/// - 所有码值均为 `'static` 字符串常量；
/// - `flint.connector.*` 标识编排器自身产出的失败；
/// - `flint.resolver.*` 标识地址解析阶段的失败；
/// - `flint.promise.*` / `flint.channel.*` 标识完成单元与通道契约层的
///   使用性错误。
pub mod codes {
    /// 通道工厂构造原始通道失败（无通道可清理）。
    pub const FACTORY_FAILED: &str = "flint.connector.factory_failed";
    /// 流水线初始化失败（通道被强制关闭）。
    pub const INIT_FAILED: &str = "flint.connector.init_failed";
    /// 通道注册到执行上下文失败。
    pub const REGISTER_FAILED: &str = "flint.connector.register_failed";
    /// 本地绑定失败。
    pub const BIND_FAILED: &str = "flint.connector.bind_failed";
    /// 对端连接失败（候选地址耗尽后的终态错误）。
    pub const CONNECT_FAILED: &str = "flint.connector.connect_failed";
    /// 地址解析失败。
    pub const RESOLVE_FAILED: &str = "flint.resolver.resolve_failed";
    /// 解析成功但产出空候选列表——按契约视为解析失败而非零次尝试成功。
    pub const RESOLVE_EMPTY: &str = "flint.resolver.empty";
    /// 完成单元已被订阅，后续订阅者收到该拒绝错误。
    pub const ALREADY_SUBSCRIBED: &str = "flint.promise.already_subscribed";
    /// 通道已关闭，挂起中的异步操作以该码值终止。
    pub const CHANNEL_CLOSED: &str = "flint.channel.closed";
    /// 通道选项在应用阶段被实现拒绝（逐项告警，不中断初始化）。
    pub const OPTION_REJECTED: &str = "flint.channel.option_rejected";
}

/// 错误的处置分类，驱动上层自动化容错策略。
///
/// # 契约说明（What）
/// - `Retryable`：瞬态故障，调用方可安排重试；
/// - `NonRetryable`：确定性故障，重试不会改变结果；
/// - `Cancelled`：调用方主动取消；
/// - `Timeout`：超出截止时间。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Retryable,
    NonRetryable,
    Cancelled,
    Timeout,
}

/// `CoreError` 是建连编排各阶段共享的稳定错误形态。
///
/// # 设计背景（Why）
/// - 工厂、初始化、注册、解析与连接的失败需要合流为统一的错误码，
///   以便日志与告警系统执行精确分类；
/// - 底层实现（套接字、解析引擎）各有错误类型，通过 `cause` 链保留
///   根因而不泄漏实现细节到公共签名。
///
/// # 逻辑解析（How）
/// - 以 Builder 风格方法叠加上下文（分类、底层原因），`source()` 暴露
///   完整根因链路；
/// - 错误码 `code` 始终为 `'static` 字符串，承载稳定语义；`message`
///   面向排障人员。
///
/// # 契约说明（What）
/// - **前置条件**：调用方使用 [`codes`] 模块或遵循 `<域>.<语义>` 约定
///   的自定义码值；
/// - **返回值**：拥有所有权的 `CoreError`，可安全跨线程移动
///   （`Send + Sync + 'static`）；
/// - **后置条件**：除非显式调用 `with_*` 方法，错误不含额外上下文。
///
/// # 设计取舍（Trade-offs）
/// - 消息采用 `Cow<'static, str>`，静态文案零分配、动态文案按需分配；
/// - 不实现 `Clone`：根因链路持有 `Box<dyn Error>`，复制语义容易造成
///   误用，需要传递时应移动所有权。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    category: Option<ErrorCategory>,
    cause: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl CoreError {
    /// 构造核心错误。
    ///
    /// # 契约说明（What）
    /// - `code`：稳定错误码，建议取自 [`codes`]；
    /// - `message`：面向排障人员的描述，可为静态或动态字符串；
    /// - **后置条件**：返回的错误不含分类与根因，可继续链式补充。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            category: None,
            cause: None,
        }
    }

    /// 附带底层原因并返回新的错误。
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 为错误标记处置分类。
    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// 读取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 读取人类可读描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 读取处置分类；未标记时返回 `None`，提示调用方采用默认策略。
    pub fn category(&self) -> Option<ErrorCategory> {
        self.category
    }

    /// 读取底层原因。
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause.as_ref() as &(dyn StdError + 'static))
    }
}
