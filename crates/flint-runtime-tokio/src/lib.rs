#![deny(unsafe_code)]
#![doc = r#"
# flint-runtime-tokio

## 设计动机（Why）
- **定位**：在 Tokio 运行时上落地 `flint-core` 的执行上下文契约：
  每个事件循环独占一条线程与一个 current-thread 运行时，任务经
  无界队列按提交顺序串行执行，满足通道线程受限模型的顺序保证。
- **架构角色**：建连编排器对执行上下文与解析引擎只认契约接口；
  本 crate 提供两者的生产级实现——[`TokioEventLoop`] /
  [`TokioEventLoopGroup`] 与 [`DnsResolver`]。

## 核心契约（What）
- **顺序保证**：`execute` 的提交顺序即执行顺序；单消费循环天然
  串行，不存在同一循环内的任务并发；
- **线程判定**：`in_event_loop` 以线程标识判定调用方是否身处
  循环线程，支撑完成单元的"已在上下文内则内联"订阅语义；
- **解析语义**：[`DnsResolver`] 只解析逻辑主机名；具体地址自报
  已解析，域套接字声明为不支持——与编排器的跳过解析路径衔接。

## 风险与考量（Trade-offs）
- **关闭语义**：事件循环在最后一个句柄释放时丢弃任务队列并合拢
  线程；仍在队列中的任务不再执行，调用方应在释放前完成排空；
- **解析线程**：DNS 查询在循环线程上以异步任务执行，回调可能
  在该线程触发；编排器会把后续通道操作重新投递回通道上下文。
"#]

mod error;
mod event_loop;
mod resolver;

pub use event_loop::{TokioEventLoop, TokioEventLoopGroup};
pub use resolver::DnsResolver;
