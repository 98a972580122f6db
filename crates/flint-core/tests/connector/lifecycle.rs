//! 通道生命周期链路的场景：配置应用、角色化初始化与注册清理。

use std::sync::Arc;

use flint_core::channel::{Acceptor, Channel, ChannelInitializer, ChannelOption, OptionValue};
use flint_core::connector::TransportConnector;
use flint_core::error::{CoreError, codes};
use flint_core::resolver::NoopResolver;
use flint_core::test_stubs::channel::{RecordingAcceptor, StubChannel};
use flint_core::test_stubs::consumer::RecordingConsumer;
use tracing_test::traced_test;

use super::support::{client_initializer, harness, harness_with, sock};

/// 已解析地址跳过解析：一条通道、一次连接、两段成功通告。
#[test]
fn resolved_address_connects_without_resolution() {
    let h = harness();
    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        sock(1),
        Arc::new(NoopResolver),
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.kinds(), ["channel", "complete"]);
    let channel = log.channel().expect("ready channel");
    assert!(channel.is_registered());
    assert_eq!(channel.connected_remote(), Some(sock(1)));
    assert_eq!(h.factory.created_count(), 1);
}

/// 选项与属性按插入顺序应用到通道。
#[test]
fn options_and_attributes_apply_in_order() {
    let h = harness_with(|config| {
        config
            .with_option(ChannelOption::NoDelay, OptionValue::Flag(true))
            .with_option(ChannelOption::SendBufferSize, OptionValue::Size(4096))
            .with_attribute("trace-id".into(), Arc::new(42u64))
    });
    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        sock(1),
        Arc::new(NoopResolver),
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    let channel = log.channel().expect("ready channel");
    assert_eq!(
        channel.applied_options(),
        [
            (ChannelOption::NoDelay, OptionValue::Flag(true)),
            (ChannelOption::SendBufferSize, OptionValue::Size(4096)),
        ]
    );
    let keys = channel.attribute_keys();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0], "trace-id");
}

/// 不认识的选项仅告警，其后的选项照常应用，初始化不受影响。
#[traced_test]
#[test]
fn unknown_option_warns_and_initialization_continues() {
    let h = harness_with(|config| {
        config
            .with_option(ChannelOption::Linger, OptionValue::Flag(false))
            .with_option(ChannelOption::KeepAlive, OptionValue::Flag(true))
    });
    h.plan.option_unknown(ChannelOption::Linger);

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        sock(1),
        Arc::new(NoopResolver),
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert!(logs_contain("unknown channel option"));
    let channel = log.channel().expect("ready channel");
    assert_eq!(
        channel.applied_options(),
        [(ChannelOption::KeepAlive, OptionValue::Flag(true))]
    );
    assert!(channel.is_registered());
}

/// 应用失败的选项仅告警跳过，不中断后续选项与注册。
#[traced_test]
#[test]
fn rejected_option_warns_and_initialization_continues() {
    let h = harness_with(|config| {
        config
            .with_option(ChannelOption::NoDelay, OptionValue::Flag(true))
            .with_option(ChannelOption::KeepAlive, OptionValue::Flag(true))
    });
    h.plan.option_rejected(ChannelOption::NoDelay);

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        sock(1),
        Arc::new(NoopResolver),
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert!(logs_contain("failed to set channel option"));
    let channel = log.channel().expect("ready channel");
    assert_eq!(
        channel.applied_options(),
        [(ChannelOption::KeepAlive, OptionValue::Flag(true))]
    );
}

/// 域套接字静默跳过仅 IP 族有效的选项，其余选项照常应用。
#[traced_test]
#[test]
fn domain_socket_silently_skips_inet_only_options() {
    let h = harness_with(|config| {
        config
            .with_option(ChannelOption::ReuseAddress, OptionValue::Flag(true))
            .with_option(ChannelOption::NoDelay, OptionValue::Flag(true))
            .with_option(ChannelOption::KeepAlive, OptionValue::Flag(true))
    });
    let remote = flint_core::resolver::TransportAddr::unix("/var/run/flint.sock");
    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        remote.clone(),
        Arc::new(NoopResolver),
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    let channel = log.channel().expect("ready channel");
    assert_eq!(
        channel.applied_options(),
        [(ChannelOption::KeepAlive, OptionValue::Flag(true))]
    );
    assert!(!logs_contain("unknown channel option"));
    assert!(!logs_contain("failed to set channel option"));
    assert_eq!(channel.connected_remote(), Some(remote));
}

/// 工厂失败立即以失败交付，没有任何通道被创建。
#[test]
fn factory_failure_creates_no_channel() {
    let h = harness();
    h.plan.fail_factory_times(1);

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        sock(1),
        Arc::new(NoopResolver),
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.error_code().as_deref(), Some(codes::FACTORY_FAILED));
    assert_eq!(h.factory.created_count(), 0);
}

/// 客户端初始化闭包失败：通道被强制拆除，根因原样浮出。
#[test]
fn client_init_failure_closes_channel_forcibly() {
    let h = harness();
    let initializer = ChannelInitializer::client(|_| {
        Err(CoreError::new(codes::INIT_FAILED, "handler wiring failed"))
    });
    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        sock(1),
        Arc::new(NoopResolver),
        initializer,
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.error_code().as_deref(), Some(codes::INIT_FAILED));
    let channel = &h.factory.created()[0];
    assert!(channel.was_forcibly_closed());
    assert!(!channel.is_registered());
}

/// 注册失败且通道从未注册成功：强制拆除。
#[test]
fn registration_failure_without_registration_closes_forcibly() {
    let h = harness();
    h.plan.register_fails(false);

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        sock(1),
        Arc::new(NoopResolver),
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.error_code().as_deref(), Some(codes::REGISTER_FAILED));
    let channel = &h.factory.created()[0];
    assert!(channel.is_closed());
    assert!(channel.was_forcibly_closed());
}

/// 注册失败但通道自报已注册：有序关闭。
#[test]
fn registration_failure_with_registration_closes_gracefully() {
    let h = harness();
    h.plan.register_fails(true);

    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        sock(1),
        Arc::new(NoopResolver),
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(log.error_code().as_deref(), Some(codes::REGISTER_FAILED));
    let channel = &h.factory.created()[0];
    assert!(channel.is_closed());
    assert!(!channel.was_forcibly_closed());
}

/// 服务端初始化等待接入器信号：信号解析前不注册，解析后继续注册。
#[test]
fn server_initialization_waits_for_acceptor_signal() {
    let h = harness();
    let acceptor = RecordingAcceptor::new();
    let promise = TransportConnector::bind(
        Arc::clone(&h.config),
        ChannelInitializer::server(Arc::clone(&acceptor) as Arc<dyn Acceptor<StubChannel>>),
        sock(9),
        false,
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    assert_eq!(acceptor.prepared_count(), 1);
    let channel = &h.factory.created()[0];
    assert!(!channel.is_registered());
    assert!(log.is_empty());

    let signal = acceptor.last_signal().expect("installed signal");
    assert!(signal.complete());
    h.executor.run_until_idle();

    assert_eq!(log.kinds(), ["channel", "complete"]);
    assert!(channel.is_registered());
    assert_eq!(channel.bound_local(), Some(sock(9)));
}

/// 接入器信号以失败解析：通道被强制拆除，根因浮出。
#[test]
fn server_signal_failure_closes_channel_forcibly() {
    let h = harness();
    let acceptor = RecordingAcceptor::new();
    let promise = TransportConnector::bind(
        Arc::clone(&h.config),
        ChannelInitializer::server(Arc::clone(&acceptor) as Arc<dyn Acceptor<StubChannel>>),
        sock(9),
        false,
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    let signal = acceptor.last_signal().expect("installed signal");
    assert!(signal.fail(CoreError::new(codes::INIT_FAILED, "acceptor wiring failed")));
    h.executor.run_until_idle();

    assert_eq!(log.error_code().as_deref(), Some(codes::INIT_FAILED));
    let channel = &h.factory.created()[0];
    assert!(channel.was_forcibly_closed());
}

/// 配置了本地地址供给器时，连接同时携带本地与远端地址。
#[test]
fn bind_address_supplier_feeds_connect() {
    let h = harness_with(|config| config.with_bind_address(Arc::new(|| sock(200))));
    let promise = TransportConnector::connect(
        Arc::clone(&h.config),
        sock(1),
        Arc::new(NoopResolver),
        client_initializer(),
    );
    let (consumer, log) = RecordingConsumer::new();
    promise.subscribe(consumer);
    h.executor.run_until_idle();

    let channel = log.channel().expect("ready channel");
    assert_eq!(channel.connect_local(), Some(sock(200)));
    assert_eq!(channel.connected_remote(), Some(sock(1)));
}
