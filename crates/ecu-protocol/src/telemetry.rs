//! 遥测数据报解析
//!
//! 遥测走独立的 UDP 通道，与命令/响应链路完全解耦。
//!
//! 数据报格式：
//! `source_id (1 byte) | sequence (2 bytes BE) | value_0 (4 bytes) | value_1 ...`
//!
//! 每个 value 是 IEEE-754 f32 的 32 位位模式，按大端无符号整数传输，
//! 接收端按位重解释为 f32（不是文本也不是本机浮点编码）。

use crate::ids::{ATTITUDE_MIN_VALUES, QUATERNION_OFFSET, TELEMETRY_HEADER_LEN};
use crate::bytes_to_u16_be;

/// 一帧解码后的遥测样本
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetrySample {
    /// 来源标识（IMU、里程计等）
    pub source_id: u8,
    /// 发送端序列号（检测丢包用）
    pub sequence: u16,
    /// 样本值向量，顺序由发送端约定
    pub values: Vec<f32>,
}

impl TelemetrySample {
    /// 解码一个遥测数据报
    ///
    /// 短于 3 字节头部的包直接丢弃（返回 None）。
    /// 值区按完整的 4 字节组解码，末尾不足 4 字节的残余被丢弃。
    pub fn decode(datagram: &[u8]) -> Option<Self> {
        if datagram.len() < TELEMETRY_HEADER_LEN {
            return None;
        }

        let source_id = datagram[0];
        let sequence = bytes_to_u16_be([datagram[1], datagram[2]]);

        let values = datagram[TELEMETRY_HEADER_LEN..]
            .chunks_exact(4)
            .map(|chunk| f32::from_bits(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])))
            .collect();

        Some(Self {
            source_id,
            sequence,
            values,
        })
    }

    /// 从嵌入的姿态四元数推导欧拉角
    ///
    /// 仅当样本携带 ≥10 个值时有意义：values[6..=9] 为单位四元数 (w, x, y, z)。
    pub fn attitude(&self) -> Option<Attitude> {
        if self.values.len() < ATTITUDE_MIN_VALUES {
            return None;
        }

        let w = self.values[QUATERNION_OFFSET];
        let x = self.values[QUATERNION_OFFSET + 1];
        let y = self.values[QUATERNION_OFFSET + 2];
        let z = self.values[QUATERNION_OFFSET + 3];

        Some(Attitude::from_quaternion(w, x, y, z))
    }
}

/// 姿态角（度）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attitude {
    pub roll_deg: f32,
    pub pitch_deg: f32,
    /// 偏航角，归一化到 [0, 360)
    pub yaw_deg: f32,
}

impl Attitude {
    /// 单位四元数 (w, x, y, z) 转欧拉角
    ///
    /// pitch 的 asin 输入做了 [-1, 1] 截断，±90° 奇点处不会产生 NaN。
    pub fn from_quaternion(w: f32, x: f32, y: f32, z: f32) -> Self {
        let roll = (2.0 * (w * y + x * z)).atan2(1.0 - 2.0 * (y * y + x * x));
        let pitch = (2.0 * (w * x - z * y)).clamp(-1.0, 1.0).asin();
        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

        Self {
            roll_deg: roll.to_degrees(),
            pitch_deg: pitch.to_degrees(),
            yaw_deg: yaw.to_degrees().rem_euclid(360.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_datagram(source_id: u8, sequence: u16, values: &[f32]) -> Vec<u8> {
        let mut datagram = vec![source_id];
        datagram.extend_from_slice(&sequence.to_be_bytes());
        for v in values {
            datagram.extend_from_slice(&v.to_bits().to_be_bytes());
        }
        datagram
    }

    #[test]
    fn test_decode_basic_sample() {
        let datagram = build_datagram(2, 300, &[1.5, -2.25, 0.0]);
        let sample = TelemetrySample::decode(&datagram).unwrap();
        assert_eq!(sample.source_id, 2);
        assert_eq!(sample.sequence, 300);
        assert_eq!(sample.values, vec![1.5, -2.25, 0.0]);
    }

    #[test]
    fn test_decode_drops_trailing_partial_group() {
        let mut datagram = build_datagram(1, 1, &[1.0]);
        datagram.extend_from_slice(&[0xAA, 0xBB]); // 残余 2 字节
        let sample = TelemetrySample::decode(&datagram).unwrap();
        assert_eq!(sample.values, vec![1.0]);
    }

    #[test]
    fn test_decode_rejects_short_datagram() {
        assert!(TelemetrySample::decode(&[0x01, 0x00]).is_none());
        assert!(TelemetrySample::decode(&[]).is_none());
    }

    #[test]
    fn test_decode_header_only() {
        let sample = TelemetrySample::decode(&[0x07, 0x00, 0x2A]).unwrap();
        assert_eq!(sample.source_id, 7);
        assert_eq!(sample.sequence, 42);
        assert!(sample.values.is_empty());
    }

    #[test]
    fn test_attitude_requires_ten_values() {
        let datagram = build_datagram(1, 1, &[0.0; 9]);
        let sample = TelemetrySample::decode(&datagram).unwrap();
        assert!(sample.attitude().is_none());
    }

    #[test]
    fn test_attitude_identity_quaternion() {
        // values[6..=9] = (1, 0, 0, 0)：无旋转
        let mut values = vec![0.0f32; 10];
        values[6] = 1.0;
        let sample = TelemetrySample::decode(&build_datagram(1, 1, &values)).unwrap();

        let att = sample.attitude().unwrap();
        assert!(att.roll_deg.abs() < 1e-4);
        assert!(att.pitch_deg.abs() < 1e-4);
        assert!(att.yaw_deg.abs() < 1e-4);
    }

    #[test]
    fn test_attitude_yaw_normalized_to_0_360() {
        // 绕 z 轴 -90°：w = cos(-45°), z = sin(-45°)
        let half = std::f32::consts::FRAC_PI_4;
        let mut values = vec![0.0f32; 10];
        values[6] = half.cos();
        values[9] = -half.sin();
        let sample = TelemetrySample::decode(&build_datagram(1, 1, &values)).unwrap();

        let att = sample.attitude().unwrap();
        assert!((att.yaw_deg - 270.0).abs() < 1e-2);
    }

    #[test]
    fn test_attitude_pitch_clamped_at_singularity() {
        // 绕 x 轴 90°（万向节奇点）：w = cos(45°), x = sin(45°)
        let half = std::f32::consts::FRAC_PI_4;
        let att = Attitude::from_quaternion(half.cos(), half.sin(), 0.0, 0.0);
        assert!(att.pitch_deg.is_finite());
        // f32 下 asin 在 1.0 附近精度有限，放宽容差
        assert!((att.pitch_deg - 90.0).abs() < 0.5);
    }
}
