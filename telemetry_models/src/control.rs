// telemetry_models/src/control.rs

//! 控制接口 (标定 / PID 调参) 的负载结构体。
//!
//! 这些请求最终应当下发给运动控制器；中继服务只负责接收、校验并交给外部 sink。

use serde::{Deserialize, Serialize};

/// `POST /api/calibrate` 的请求体，例如 `{ "axis": "x" }`。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CalibrationRequest {
    /// 需要标定的轴。
    pub axis: String,
}

/// `POST /api/calibrate` 成功时的响应体。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CalibrationResponse {
    pub status: String,
    pub axis: String,
}

/// `POST /api/pid` 的请求体：PID 三个增益。
///
/// 回显时与仪表盘一致，整数值不带小数点。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    #[serde(serialize_with = "crate::number::serialize")]
    pub p: f64,
    #[serde(serialize_with = "crate::number::serialize")]
    pub i: f64,
    #[serde(serialize_with = "crate::number::serialize")]
    pub d: f64,
}

/// `POST /api/pid` 成功时的响应体。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PidResponse {
    pub status: String,
    #[serde(flatten)]
    pub gains: PidGains,
}

/// 控制接口失败时的统一响应体。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ControlErrorResponse {
    pub error: String,
}

impl ControlErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
