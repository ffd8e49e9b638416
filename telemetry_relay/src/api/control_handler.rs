//! 标定 / PID 调参接口的请求处理函数。
//!
//! 请求体按原始字节接收后自行解析，这样 JSON 语法错误和字段缺失可以返回不同的状态码，
//! 而不是统一交给 axum 的 `Json` 提取器拒绝。

use crate::api::control_sink::ControlSink;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use log::{error, warn};
use serde_json::{Map, Value};
use std::sync::Arc;
use telemetry_models::control::{
    CalibrationRequest, CalibrationResponse, ControlErrorResponse, PidGains, PidResponse,
};
use tower_http::cors::CorsLayer;

const CALIBRATION_FAILED: &str = "Calibration failed";
const NO_AXIS_SPECIFIED: &str = "No axis specified";
const PID_UPDATE_FAILED: &str = "PID update failed";
const MISSING_PID_VALUES: &str = "Missing PID values";
const INVALID_PID_VALUES: &str = "Invalid PID values";

/// 共享给所有处理函数的状态。
pub type SharedSink = Arc<dyn ControlSink>;

/// 构建控制接口路由。CORS 完全放开，仪表盘通常运行在另一个源上。
pub fn router(sink: SharedSink) -> Router {
    Router::new()
        .route("/api/calibrate", post(calibrate))
        .route("/api/pid", post(update_pid))
        .layer(CorsLayer::permissive())
        .with_state(sink)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ControlErrorResponse::new(message))).into_response()
}

/// 请求体必须是 JSON 对象。
fn parse_object(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Some(object),
        Ok(other) => {
            warn!("[控制接口] 请求体不是 JSON 对象: {}", other);
            None
        }
        Err(e) => {
            warn!("[控制接口] 解析请求体失败: {}", e);
            None
        }
    }
}

/// `POST /api/calibrate`
pub async fn calibrate(State(sink): State<SharedSink>, body: Bytes) -> Response {
    let Some(object) = parse_object(&body) else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, CALIBRATION_FAILED);
    };

    let axis = match object.get("axis") {
        Some(Value::String(axis)) if !axis.is_empty() => axis.clone(),
        _ => return error_response(StatusCode::BAD_REQUEST, NO_AXIS_SPECIFIED),
    };

    let request = CalibrationRequest { axis };
    if let Err(e) = sink.calibrate(&request) {
        error!("[控制接口] 标定轴 {} 失败: {}", request.axis, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, CALIBRATION_FAILED);
    }

    let response = CalibrationResponse {
        status: "success".to_string(),
        axis: request.axis,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// `POST /api/pid`
pub async fn update_pid(State(sink): State<SharedSink>, body: Bytes) -> Response {
    let Some(object) = parse_object(&body) else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, PID_UPDATE_FAILED);
    };

    let (Some(p), Some(i), Some(d)) = (object.get("p"), object.get("i"), object.get("d")) else {
        return error_response(StatusCode::BAD_REQUEST, MISSING_PID_VALUES);
    };
    let (Some(p), Some(i), Some(d)) = (p.as_f64(), i.as_f64(), d.as_f64()) else {
        return error_response(StatusCode::BAD_REQUEST, INVALID_PID_VALUES);
    };

    let gains = PidGains { p, i, d };
    if let Err(e) = sink.apply_pid(&gains) {
        error!("[控制接口] 应用 PID 增益 {:?} 失败: {}", gains, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, PID_UPDATE_FAILED);
    }

    let response = PidResponse {
        status: "PID updated".to_string(),
        gains,
    };
    (StatusCode::OK, Json(response)).into_response()
}
