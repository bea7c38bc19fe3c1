//! 请求帧构建
//!
//! 每种命令一个编码函数，统一入口为 [`encode_request`]。
//! 速度字段按 RPM×100 定点编码为大端 i32。

use crate::command::CommandKind;
use crate::ids::{CommandId, DRIVER_VERSION, MOTOR_COUNT, SPEED_SCALE};
use crate::{ProtocolError, bytes_to_i32_be, i32_to_bytes_be};

/// RPM 转线上定点编码（RPM×100，大端）
///
/// |rpm| 超出定点可表示范围（约 2147 万）时饱和到 i32 边界。
pub fn encode_rpm(speed_rpm: i32) -> [u8; 4] {
    i32_to_bytes_be(speed_rpm.saturating_mul(SPEED_SCALE))
}

/// 线上定点编码转 RPM
pub fn decode_rpm(bytes: [u8; 4]) -> i32 {
    bytes_to_i32_be(bytes) / SPEED_SCALE
}

/// 构建请求帧：`[command_id (1 byte)][payload]`
pub fn encode_request(kind: &CommandKind) -> Vec<u8> {
    match kind {
        // [0x01][driver_version]
        CommandKind::GetApiVersion => vec![CommandId::GetApiVersion.into(), DRIVER_VERSION],

        // [0x02][motor_id][speed*100 (i32 BE)]
        CommandKind::SetMotorSpeed { motor_id, speed_rpm } => {
            let mut frame = Vec::with_capacity(6);
            frame.push(CommandId::SetMotorSpeed.into());
            frame.push(*motor_id);
            frame.extend_from_slice(&encode_rpm(*speed_rpm));
            frame
        },

        // [0x03][s0][s1][s2][s3]（各 4 字节，按电机顺序）
        CommandKind::SetAllMotorsSpeed { speeds } => {
            let mut frame = Vec::with_capacity(1 + MOTOR_COUNT * 4);
            frame.push(CommandId::SetAllMotorsSpeed.into());
            for speed in speeds {
                frame.extend_from_slice(&encode_rpm(*speed));
            }
            frame
        },

        // [0x05]（无负载）
        CommandKind::GetAllEncoders => vec![CommandId::GetAllEncoders.into()],
    }
}

/// 解码 SetAllMotorsSpeed 负载（16 字节）回 RPM 向量
///
/// 仅用于测试与诊断；ECU 不会回传速度负载。
pub fn decode_speed_payload(payload: &[u8]) -> Result<[i32; MOTOR_COUNT], ProtocolError> {
    if payload.len() != MOTOR_COUNT * 4 {
        return Err(ProtocolError::InvalidLength {
            expected: MOTOR_COUNT * 4,
            actual: payload.len(),
        });
    }

    let mut speeds = [0i32; MOTOR_COUNT];
    for (i, chunk) in payload.chunks_exact(4).enumerate() {
        speeds[i] = decode_rpm([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(speeds)
}
