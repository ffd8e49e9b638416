//! 入站帧规范化。
//!
//! 传感器板发送扁平的原始 IMU 读数，仪表盘只认 `{"type":"imu",...}` 形状。
//! 本模块是一个纯函数：输入一条入站帧，输出需要广播的帧，不持有任何共享状态。
//!
//! 规则：
//! - 二进制帧原样返回；
//! - 文本帧不是 JSON 对象时原样返回（包括非 JSON 文本、JSON 数组和标量）；
//! - JSON 对象包含全部六个原始字段且都能转为有限数值时，转换为规范化 IMU 消息；
//! - 其他 JSON 对象重新序列化后返回（统一格式，内容不变）。

use log::debug;
use rust_websocket_utils::message::RelayFrame;
use serde_json::{Map, Value};
use telemetry_models::imu::{ImuReading, ORIENTATION_KEYS, RAW_IMU_KEYS};
use telemetry_models::number::to_json_number;

/// 规范化一条入站帧。
pub fn normalize(frame: RelayFrame) -> RelayFrame {
    let text = match frame {
        RelayFrame::Binary(_) => return frame,
        RelayFrame::Text(text) => text,
    };

    let object = match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(object)) => object,
        // 非 JSON 或非对象：尽力转发原文
        _ => return RelayFrame::Text(text),
    };

    if !RAW_IMU_KEYS.iter().all(|key| object.contains_key(*key)) {
        return reserialize(object, text);
    }

    match to_imu_reading(&object) {
        Some(reading) => match serde_json::to_string(&reading) {
            Ok(json) => RelayFrame::Text(json),
            Err(e) => {
                debug!("[规范化] 序列化 IMU 消息失败: {}，转发原文", e);
                RelayFrame::Text(text)
            }
        },
        None => {
            debug!("[规范化] IMU 原始读数含非数值轴，不做转换");
            reserialize(object, text)
        }
    }
}

/// 按原始字段构造规范化读数。六个核心轴任一无法转为有限数值时返回 `None`。
fn to_imu_reading(object: &Map<String, Value>) -> Option<ImuReading> {
    let axis = |key: &str| object.get(key).and_then(coerce_number);
    let accel = [axis("ax")?, axis("ay")?, axis("az")?];
    let gyro = [axis("gx")?, axis("gy")?, axis("gz")?];

    // 姿态角缺失或无效时取 0
    let [roll, pitch, yaw] = ORIENTATION_KEYS.map(|key| object.get(key).and_then(coerce_number).unwrap_or(0.0));
    Some(ImuReading::new(accel, gyro).with_orientation(roll, pitch, yaw))
}

/// 重新序列化非 IMU 对象。数值按前端 `JSON.stringify` 的写法输出（`1.0` 写作 `1`）。
fn reserialize(mut object: Map<String, Value>, original: String) -> RelayFrame {
    object.values_mut().for_each(normalize_number_spelling);
    match serde_json::to_string(&object) {
        Ok(json) => RelayFrame::Text(json),
        Err(_) => RelayFrame::Text(original),
    }
}

fn normalize_number_spelling(value: &mut Value) {
    let respelled = match value {
        Value::Number(n) if n.is_f64() => n.as_f64().map(to_json_number),
        Value::Array(items) => {
            items.iter_mut().for_each(normalize_number_spelling);
            None
        }
        Value::Object(map) => {
            map.values_mut().for_each(normalize_number_spelling);
            None
        }
        _ => None,
    };
    if let Some(respelled) = respelled {
        *value = respelled;
    }
}

/// 宽松的数值转换，与前端 `Number(x)` 的常见情形一致：
/// 数字原样；`true`/`false` 为 1/0；`null`、空串为 0；字符串按十进制解析；
/// 单元素数组取其元素。其余情况以及非有限结果返回 `None`。
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else if trimmed.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')) {
                trimmed.parse::<f64>().ok()?
            } else {
                return None;
            }
        }
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single @ (Value::Number(_) | Value::String(_))] => coerce_number(single)?,
            _ => return None,
        },
        Value::Object(_) => return None,
    };
    number.is_finite().then_some(number)
}
