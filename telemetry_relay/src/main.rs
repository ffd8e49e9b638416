use anyhow::Context;
use log::{error, info, LevelFilter};
use std::sync::Arc;
use telemetry_relay::api;
use telemetry_relay::api::control_sink::LoggingControlSink;
use telemetry_relay::config;
use telemetry_relay::ws_server::connection_manager::ConnectionManager;
use telemetry_relay::ws_server::heartbeat_monitor::HeartbeatMonitor;
use telemetry_relay::ws_server::service::WsService;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志记录器，RUST_LOG 可覆盖默认级别
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp_millis()
        .parse_default_env()
        .init();
    info!("[主程序] 日志系统已成功初始化 (env_logger)，默认级别: Info。");

    let app_config = config::init_config();
    info!(
        "[主程序] 应用配置已加载。WebSocket: {}，心跳周期: {:?}",
        app_config.websocket.listen_addr(),
        app_config.websocket.heartbeat_interval()
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let connection_manager = Arc::new(ConnectionManager::new());

    let ws_service = WsService::bind(app_config.websocket.clone(), Arc::clone(&connection_manager))
        .await
        .context("启动 WebSocket 服务失败")?;

    let heartbeat_monitor = HeartbeatMonitor::new(
        Arc::clone(&connection_manager),
        app_config.websocket.heartbeat_interval(),
    );
    let heartbeat_task = tokio::spawn(heartbeat_monitor.run(shutdown_rx.clone()));
    info!("[主程序] 心跳监视器 (HeartbeatMonitor) 已派生到后台异步执行。");

    let control_api_task = if app_config.control_api.enabled {
        let control_config = app_config.control_api.clone();
        let shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = api::serve(control_config, Arc::new(LoggingControlSink), shutdown).await {
                error!("[主程序] 控制接口运行失败: {}", e);
            }
        }))
    } else {
        info!("[主程序] 控制接口已在配置中禁用。");
        None
    };

    let ctrl_c_shutdown = Arc::clone(&shutdown_tx);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("[主程序] 收到 Ctrl-C，正在停止服务..."),
            Err(e) => error!("[主程序] 监听 Ctrl-C 信号失败: {}，立即停止服务。", e),
        }
        let _ = ctrl_c_shutdown.send(true);
    });

    let result = ws_service.start(shutdown_rx).await;
    // 监听循环异常退出时也要停止其余后台任务
    let _ = shutdown_tx.send(true);

    if let Err(e) = heartbeat_task.await {
        error!("[主程序] 心跳监视器任务异常结束: {:?}", e);
    }
    if let Some(task) = control_api_task {
        if let Err(e) = task.await {
            error!("[主程序] 控制接口任务异常结束: {:?}", e);
        }
    }
    info!("[主程序] 服务已停止，剩余连接数: {}", connection_manager.client_count());
    result.context("WebSocket 服务运行失败")
}
