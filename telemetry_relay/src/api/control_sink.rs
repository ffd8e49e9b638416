//! 控制指令的下游出口。

use crate::error::AppError;
use log::info;
use telemetry_models::control::{CalibrationRequest, PidGains};

/// 接收已校验的控制指令，并负责把它们下发给运动控制器。
///
/// 返回错误时，HTTP 接口以 500 响应调用方。
pub trait ControlSink: Send + Sync {
    /// 对指定轴发起标定。
    fn calibrate(&self, request: &CalibrationRequest) -> Result<(), AppError>;

    /// 应用一组新的 PID 增益。
    fn apply_pid(&self, gains: &PidGains) -> Result<(), AppError>;
}

/// 只记录日志的 sink。尚未接入实际控制器时使用。
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingControlSink;

impl ControlSink for LoggingControlSink {
    fn calibrate(&self, request: &CalibrationRequest) -> Result<(), AppError> {
        info!("[控制接口] 收到标定请求，轴: {}", request.axis);
        Ok(())
    }

    fn apply_pid(&self, gains: &PidGains) -> Result<(), AppError> {
        info!("[控制接口] 收到 PID 调参请求: P={} I={} D={}", gains.p, gains.i, gains.d);
        Ok(())
    }
}
