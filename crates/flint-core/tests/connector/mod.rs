//! 建连编排器的场景化集成测试聚合入口。
//!
//! 各场景文件共享 [`support`] 中的测试装置：手工驱动的执行上下文、
//! 可脚本化的通道工厂与解析器。

pub mod support;

mod bind;
mod cancel;
mod fallback;
mod lifecycle;
