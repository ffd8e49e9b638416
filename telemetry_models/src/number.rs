// telemetry_models/src/number.rs

//! JavaScript 风格的数值序列化辅助函数。
//!
//! 仪表盘前端与早期的中继实现都使用 `JSON.stringify` 输出数字：整数值输出为 `1` 而不是 `1.0`，
//! `-0` 输出为 `0`。`serde_json` 对 `f64` 默认总是带小数点，因此这里提供 `serialize_with`
//! 可用的函数，保证 `{"accel":[1,2,3]}` 这样的线上形状保持不变。

use serde::ser::{SerializeTuple, Serializer};

/// 能够无损表示为整数的最大绝对值 (2^53)，与 JS 的安全整数范围一致。
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// 判断一个 `f64` 是否应当按整数输出。
fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER
}

/// 将单个数值转换为 `serde_json::Value`，整数值转为整数 JSON 数字。
///
/// 非有限值 (`NaN` / `±Infinity`) 转为 `null`，与 `JSON.stringify` 行为一致。
pub fn to_json_number(value: f64) -> serde_json::Value {
    if is_integral(value) {
        // `as i64` 同时把 -0.0 归一为 0
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// `#[serde(serialize_with = "...")]` 使用：按 JS 风格序列化单个 `f64`。
pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if is_integral(*value) {
        serializer.serialize_i64(*value as i64)
    } else if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

/// `#[serde(serialize_with = "...")]` 使用：按 JS 风格序列化三元组（加速度 / 角速度）。
pub fn serialize_triplet<S: Serializer>(values: &[f64; 3], serializer: S) -> Result<S::Ok, S::Error> {
    let mut tuple = serializer.serialize_tuple(3)?;
    for value in values {
        tuple.serialize_element(&to_json_number(*value))?;
    }
    tuple.end()
}
