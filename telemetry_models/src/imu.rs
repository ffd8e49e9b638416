// telemetry_models/src/imu.rs

//! 惯性测量 (IMU) 消息模型。
//!
//! 传感器板直接发送扁平的原始读数 `{ax, ay, az, gx, gy, gz, roll?, pitch?, yaw?}`，
//! 仪表盘只认规范化形状：
//!
//! ```json
//! {"type":"imu","accel":[ax,ay,az],"gyro":[gx,gy,gz],"roll":0,"pitch":0,"yaw":0}
//! ```
//!
//! 中继服务在广播前把前者转换为后者。

use serde::{Deserialize, Serialize};

/// 识别原始 IMU 读数所需的六个字段（加速度三轴 + 角速度三轴）。
pub const RAW_IMU_KEYS: [&str; 6] = ["ax", "ay", "az", "gx", "gy", "gz"];

/// 原始读数中可选的姿态角字段。缺失或无效时取 0。
pub const ORIENTATION_KEYS: [&str; 3] = ["roll", "pitch", "yaw"];

/// 规范化消息的 `type` 字段。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryKind {
    /// 惯性测量数据。
    Imu,
}

/// 仪表盘使用的规范化 IMU 消息。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImuReading {
    /// 固定为 `"imu"`。
    #[serde(rename = "type")]
    pub kind: TelemetryKind,
    /// 加速度 `[ax, ay, az]`。
    #[serde(serialize_with = "crate::number::serialize_triplet")]
    pub accel: [f64; 3],
    /// 角速度 `[gx, gy, gz]`。
    #[serde(serialize_with = "crate::number::serialize_triplet")]
    pub gyro: [f64; 3],
    /// 横滚角。
    #[serde(serialize_with = "crate::number::serialize")]
    pub roll: f64,
    /// 俯仰角。
    #[serde(serialize_with = "crate::number::serialize")]
    pub pitch: f64,
    /// 偏航角。
    #[serde(serialize_with = "crate::number::serialize")]
    pub yaw: f64,
}

impl ImuReading {
    /// 以给定的加速度、角速度构造读数，姿态角全部为 0。
    pub fn new(accel: [f64; 3], gyro: [f64; 3]) -> Self {
        Self {
            kind: TelemetryKind::Imu,
            accel,
            gyro,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }

    /// 设置姿态角 (roll, pitch, yaw)。
    pub fn with_orientation(mut self, roll: f64, pitch: f64, yaw: f64) -> Self {
        self.roll = roll;
        self.pitch = pitch;
        self.yaw = yaw;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_dashboard_shape() {
        let reading = ImuReading::new([1.0, 2.0, 3.0], [4.0, 5.0, 6.0]);
        let json = serde_json::to_string(&reading).expect("序列化 ImuReading 失败");
        assert_eq!(
            json,
            r#"{"type":"imu","accel":[1,2,3],"gyro":[4,5,6],"roll":0,"pitch":0,"yaw":0}"#
        );
    }

    #[test]
    fn fractional_orientation_is_kept() {
        let reading = ImuReading::new([0.5, -9.81, 0.0], [0.0, 0.0, 1.25]).with_orientation(12.5, -3.0, 0.0);
        let value = serde_json::to_value(&reading).expect("序列化 ImuReading 失败");
        assert_eq!(value["accel"], serde_json::json!([0.5, -9.81, 0]));
        assert_eq!(value["roll"], serde_json::json!(12.5));
        assert_eq!(value["pitch"], serde_json::json!(-3));

        // 仪表盘一侧可以把同一份 JSON 反序列化回来
        let parsed: ImuReading = serde_json::from_value(value).expect("反序列化 ImuReading 失败");
        assert_eq!(parsed, reading);
    }
}
