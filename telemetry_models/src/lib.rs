//! `telemetry_models` 公共模型库 crate。
//!
//! 本 crate 集中定义了遥测中继服务 (`telemetry_relay`) 与其外部协作方
//! （传感器板、仪表盘前端）之间共享的数据结构。
//!
//! 主要包含以下模型：
//! - **惯性测量 (`imu`)**: 仪表盘期望的规范化 IMU 消息 `ImuReading`，以及传感器板原始读数的字段名常量。
//! - **控制接口负载 (`control`)**: 标定与 PID 调参 HTTP 接口使用的请求/响应结构体。
//! - **数值序列化 (`number`)**: 将 `f64` 按 JavaScript `JSON.stringify` 的方式输出（整数值不带小数点）。
//!
//! 设计原则：
//! - 所有模型都派生 `Serialize`、`Deserialize`、`Debug`、`Clone`，便于网络传输和调试。
//! - 线上 JSON 形状由这里唯一确定，服务端与测试都引用同一份定义。

pub mod control; // 标定 / PID 控制接口的负载
pub mod imu; // 规范化惯性测量消息
pub mod number; // JS 风格的数值序列化
