//! 命令 ID 与协议常量定义

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 电机数量（底盘四轮差速）
pub const MOTOR_COUNT: usize = 4;

/// 速度定点缩放因子（线上传输 RPM×100）
pub const SPEED_SCALE: i32 = 100;

/// 本驱动的协议版本号（GetApiVersion 请求携带）
pub const DRIVER_VERSION: u8 = 0x01;

/// GetAllEncoders 响应负载长度（4 × i32）
pub const ENCODER_PAYLOAD_LEN: usize = 16;

/// 遥测数据报头部长度（source_id + 序列号）
pub const TELEMETRY_HEADER_LEN: usize = 3;

/// 携带姿态四元数的遥测样本最小值数量
pub const ATTITUDE_MIN_VALUES: usize = 10;

/// 四元数在遥测值向量中的起始下标（w, x, y, z）
pub const QUATERNION_OFFSET: usize = 6;

/// 命令 ID
///
/// 请求与响应共用同一 ID 空间：响应帧首字节回显请求的命令 ID。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CommandId {
    /// 查询 ECU 协议版本
    GetApiVersion = 0x01,
    /// 设置单个电机转速
    SetMotorSpeed = 0x02,
    /// 设置全部电机转速
    SetAllMotorsSpeed = 0x03,
    /// 读取全部编码器增量
    GetAllEncoders = 0x05,
}
