//! 测试桩命名空间：框架官方维护的确定性替身实现。
//!
//! # 设计背景（Why）
//! - 建连编排的行为验证需要可脚本化的通道、可手工驱动的执行上下文
//!   与可控的解析结果；在各测试文件内重复定义这些替身会在契约演进
//!   时产生大量漏改；
//! - 统一出口后，契约变更只需单点更新，所有测试同步获得编译期提示。
//!
//! # 使用方式（How）
//! - `executor::ManualExecutor`：任务入队后由测试显式 `run_until_idle`
//!   逐批排空，排空期间线程被标记为该上下文的承载线程；
//! - `channel::StubPlan` + `channel::StubChannelFactory`：按地址脚本化
//!   连接结果（成功/拒绝/挂起）、注册与绑定结果、选项处置与工厂失败
//!   次数，工厂记录每条产出的通道供断言取用；
//! - `resolver::ScriptedResolver`：预置解析结果或挂起后由测试释放；
//! - `consumer::RecordingConsumer`：记录消费者事件序，配套句柄断言
//!   事件种类、通道与错误码。
//!
//! # 契约说明（What）
//! - 桩对象仅面向测试与示例环境；它们不产生网络副作用；
//! - 全部桩回调遵循正式契约：完成回调经执行上下文投递、恰好一次。

pub mod channel;
pub mod consumer;
pub mod executor;
pub mod resolver;
