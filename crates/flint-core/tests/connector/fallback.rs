//! 多地址回退状态机的场景：按序尝试、全新通道、游标外置语义。

use std::sync::{Arc, Mutex};

use flint_core::connector::TransportConnector;
use flint_core::error::codes;
use flint_core::test_stubs::consumer::RecordingConsumer;
use flint_core::test_stubs::resolver::ScriptedResolver;

use super::support::{client_initializer, harness, harness_with, logical, sock};

/// 解析出 [A, B, C]：A、B 失败、C 成功——三条通道、前两条关闭。
#[test]
fn fallback_reaches_third_candidate() {
    let h = harness();
    h.plan.connect_refused(sock(1));
    h.plan.connect_refused(sock(2));
    h.plan.connect_succeeds(sock(3));
    let resolver = ScriptedResolver::respond_with(vec![sock(1), sock(2), sock(3)]);

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        logical(),
        resolver,
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.kinds(), ["channel", "complete"]);
    let created = h.factory.created();
    assert_eq!(created.len(), 3);
    assert!(created[0].is_closed());
    assert!(created[1].is_closed());
    assert!(!created[2].is_closed());
    assert_eq!(created[2].connected_remote(), Some(sock(3)));
    assert_eq!(log.channel().expect("ready channel").sequence(), 2);
}

/// 全部候选失败：以最后一次尝试的根因终止，所有通道关闭。
#[test]
fn exhaustion_surfaces_last_attempt_error() {
    let h = harness();
    h.plan.connect_refused(sock(1));
    h.plan.connect_refused(sock(2));
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

    assert_eq!(log.kinds(), ["error"]);
    assert_eq!(log.error_code().as_deref(), Some(codes::CONNECT_FAILED));
    let created = h.factory.created();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|channel| channel.is_closed()));
}

/// 解析失败是终态：通道关闭、无连接尝试、根因原样浮出。
#[test]
fn resolution_failure_never_attempts_connect() {
    let h = harness();
    let resolver = ScriptedResolver::failing("nxdomain: service.internal");

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        logical(),
        Arc::clone(&resolver) as Arc<dyn flint_core::resolver::AddressResolver>,
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.error_code().as_deref(), Some(codes::RESOLVE_FAILED));
    assert_eq!(resolver.resolve_calls(), 1);
    let created = h.factory.created();
    assert_eq!(created.len(), 1);
    assert!(created[0].is_closed());
    assert_eq!(created[0].connected_remote(), None);
}

/// 解析成功但列表为空：按解析失败处理，而非零次尝试的成功。
#[test]
fn empty_resolution_is_a_failure() {
    let h = harness();
    let resolver = ScriptedResolver::respond_with(Vec::new());

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        logical(),
        resolver,
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.error_code().as_deref(), Some(codes::RESOLVE_EMPTY));
    let created = h.factory.created();
    assert_eq!(created.len(), 1);
    assert!(created[0].is_closed());
    assert_eq!(created[0].connected_remote(), None);
}

/// 候选列表含重复地址时仍按游标顺序推进：[A, A, B] 尝试三次。
#[test]
fn duplicate_candidates_keep_cursor_order() {
    let h = harness();
    h.plan.connect_refused(sock(1));
    h.plan.connect_succeeds(sock(2));
    let resolver = ScriptedResolver::respond_with(vec![sock(1), sock(1), sock(2)]);

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        logical(),
        resolver,
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.kinds(), ["channel", "complete"]);
    let created = h.factory.created();
    assert_eq!(created.len(), 3);
    assert!(created[0].is_closed());
    assert!(created[1].is_closed());
    assert_eq!(created[2].connected_remote(), Some(sock(2)));
}

/// 解析观察点按"解析前、解析后（首个结果）"的顺序触发。
#[test]
fn resolution_observers_fire_in_order() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let before_events = Arc::clone(&events);
    let after_events = Arc::clone(&events);
    let h = harness_with(move |config| {
        config
            .with_before_resolve(Arc::new(move |_| {
                before_events
                    .lock()
                    .expect("lock events")
                    .push("before".to_string());
            }))
            .with_after_resolve(Arc::new(move |_, first| {
                after_events
                    .lock()
                    .expect("lock events")
                    .push(format!("after:{first}"));
            }))
    });
    let resolver = ScriptedResolver::respond_with(vec![sock(1)]);

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        logical(),
        resolver,
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.kinds(), ["channel", "complete"]);
    assert_eq!(
        *events.lock().expect("lock events"),
        vec!["before".to_string(), "after:10.0.0.1:7000".to_string()]
    );
}

/// 解析失败时触发错误观察点并携带根因。
#[test]
fn resolve_error_observer_receives_cause() {
    let observed = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&observed);
    let h = harness_with(move |config| {
        config.with_on_resolve_error(Arc::new(move |_, error| {
            *slot.lock().expect("lock slot") = Some(error.code());
        }))
    });
    let resolver = ScriptedResolver::failing("nxdomain");

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        logical(),
        resolver,
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.error_code().as_deref(), Some(codes::RESOLVE_FAILED));
    assert_eq!(
        observed.lock().expect("lock slot").take(),
        Some(codes::RESOLVE_FAILED)
    );
}
