//! # ECU Protocol
//!
//! 巡检车 ECU 链路协议定义（无 I/O 依赖）
//!
//! ## 模块
//!
//! - `ids`: 命令 ID 与协议常量定义
//! - `command`: 命令/响应类型定义
//! - `control`: 请求帧构建
//! - `feedback`: 响应帧解析（含重同步）
//! - `telemetry`: 遥测数据报解析
//!
//! ## 帧格式
//!
//! 命令帧为 `[command_id (1 byte)][payload]`，字节序为大端（MSB 高位在前）。
//! 所有解码函数都是字节缓冲区上的纯函数，不依赖任何 socket。

pub mod command;
pub mod control;
pub mod feedback;
pub mod ids;
pub mod telemetry;

// 重新导出常用类型
pub use command::*;
pub use control::*;
pub use feedback::*;
pub use ids::*;
pub use telemetry::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid payload length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unknown command id: 0x{id:02X}")]
    UnknownCommandId { id: u8 },

    #[error("Unexpected response id: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedResponseId { expected: u8, actual: u8 },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: i64 },
}

/// 字节序转换工具函数
///
/// 协议使用大端字节序（MSB 高位在前），速度字段为 RPM×100 定点编码。
///
/// 大端字节序转 i32
pub fn bytes_to_i32_be(bytes: [u8; 4]) -> i32 {
    i32::from_be_bytes(bytes)
}

/// 大端字节序转 u16
pub fn bytes_to_u16_be(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// i32 转大端字节序
pub fn i32_to_bytes_be(value: i32) -> [u8; 4] {
    value.to_be_bytes()
}

/// u16 转大端字节序
pub fn u16_to_bytes_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}
