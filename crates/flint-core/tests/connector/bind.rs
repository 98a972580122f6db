//! 绑定入口的场景：直通绑定，无解析、无回退。

use std::sync::Arc;

use flint_core::channel::Channel;
use flint_core::connector::TransportConnector;
use flint_core::error::codes;
use flint_core::test_stubs::consumer::RecordingConsumer;

use super::support::{client_initializer, harness, sock};

/// 初始化链成功后在通道上下文内完成绑定。
#[test]
fn bind_succeeds_and_reports_ready_channel() {
    let h = harness();
    let promise = TransportConnector::bind(
        Arc::clone(&h.config),
        client_initializer(),
        sock(5),
        false,
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.kinds(), ["channel", "complete"]);
    let channel = log.channel().expect("ready channel");
    assert!(channel.is_registered());
    assert_eq!(channel.bound_local(), Some(sock(5)));
    assert_eq!(h.factory.created_count(), 1);
}

/// 绑定失败：通道关闭，根因浮出，不做任何回退。
#[test]
fn bind_failure_closes_channel() {
    let h = harness();
    h.plan.bind_refused();

    let promise = TransportConnector::bind(
        Arc::clone(&h.config),
        client_initializer(),
        sock(5),
        false,
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.error_code().as_deref(), Some(codes::BIND_FAILED));
    let created = h.factory.created();
    assert_eq!(created.len(), 1);
    assert!(created[0].is_closed());
    assert!(!created[0].was_forcibly_closed());
}
