//! 取消语义的场景：关闭在途通道、抑制通知、终止重试推进。

use std::sync::Arc;

use flint_core::connector::TransportConnector;
use flint_core::test_stubs::consumer::RecordingConsumer;
use flint_core::test_stubs::resolver::ScriptedResolver;

use super::support::{client_initializer, harness, logical, sock};

/// 解析完成前取消：当前通道被关闭，结果此后绝不以成功交付。
#[test]
fn cancel_before_resolution_never_succeeds() {
    let h = harness();
    let resolver = ScriptedResolver::holding();

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        logical(),
        Arc::clone(&resolver) as Arc<dyn flint_core::resolver::AddressResolver>,
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();
    assert_eq!(resolver.resolve_calls(), 1);

    promise.cancel();
    h.executor.run_until_idle();
    let created = h.factory.created();
    assert_eq!(created.len(), 1);
    assert!(created[0].is_closed());

    // 迟到的解析结果到达：连接在已关闭的通道上失败，且不再通知消费者。
    resolver.release(Ok(vec![sock(1)]));
    h.executor.run_until_idle();

    assert!(log.is_empty());
    assert_eq!(h.factory.created_count(), 1);
}

/// 回退进行中取消：只关闭在途尝试的通道，不再调度后续尝试。
#[test]
fn cancel_during_fallback_schedules_no_further_attempts() {
    let h = harness();
    h.plan.connect_held(sock(1));
    h.plan.connect_succeeds(sock(2));
    let resolver = ScriptedResolver::respond_with(vec![sock(1), sock(2)]);

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        logical(),
        resolver,
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();
    assert_eq!(h.factory.created_count(), 1);

    // 首个尝试挂起期间取消：关闭触发挂起连接以失败终止，
    // 但失败被吸收，第二个候选不再被尝试。
    promise.cancel();
    h.executor.run_until_idle();

    assert!(log.is_empty());
    let created = h.factory.created();
    assert_eq!(created.len(), 1);
    assert!(created[0].is_closed());
}
