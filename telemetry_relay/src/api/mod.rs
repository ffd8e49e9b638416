//! 标定 / PID 调参的 HTTP 控制接口。

pub mod control_handler;
pub mod control_sink;

use crate::config::ControlApiConfig;
use crate::error::AppError;
use control_handler::SharedSink;
use log::info;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// 启动控制接口，直到 `shutdown` 变为 `true` 后优雅退出。
pub async fn serve(
    config: ControlApiConfig,
    sink: SharedSink,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), AppError> {
    let listen_addr = config.listen_addr();
    let listener = TcpListener::bind(&listen_addr)
        .await
        .map_err(|e| AppError::ControlApi(format!("无法绑定到 {}: {}", listen_addr, e)))?;
    info!("[控制接口] HTTP 控制接口正在监听 {}", listen_addr);

    axum::serve(listener, control_handler::router(sink))
        .with_graceful_shutdown(async move {
            // 发送端被丢弃也视为停止
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .map_err(|e| AppError::ControlApi(format!("HTTP 服务异常结束: {}", e)))?;

    info!("[控制接口] HTTP 控制接口已停止。");
    Ok(())
}
