//! 响应帧解析
//!
//! ECU 的响应流可能混入偏移或杂散字节（上电残留、填充 0x00 等），
//! 因此解析入口是显式的重同步扫描 [`scan_for_marker`]：
//! 丢弃所有非标记字节直到命中期望的命令 ID。
//! 所有函数都是字节缓冲区上的纯函数。

use crate::ids::{ENCODER_PAYLOAD_LEN, MOTOR_COUNT};
use crate::{ProtocolError, bytes_to_i32_be};

/// 重同步扫描结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncOutcome<'a> {
    /// 是否命中标记字节
    pub matched: bool,
    /// 命中前被丢弃的字节（用于诊断日志）
    pub discarded: Vec<u8>,
    /// 标记之后的剩余字节（未命中时为空）
    pub rest: &'a [u8],
}

/// 在缓冲区中扫描期望的帧标记（命令 ID）
///
/// 标记之前的字节全部计入 `discarded`；命中后 `rest` 指向标记的下一字节。
pub fn scan_for_marker(buf: &[u8], marker: u8) -> ResyncOutcome<'_> {
    match buf.iter().position(|&b| b == marker) {
        Some(pos) => ResyncOutcome {
            matched: true,
            discarded: buf[..pos].to_vec(),
            rest: &buf[pos + 1..],
        },
        None => ResyncOutcome {
            matched: false,
            discarded: buf.to_vec(),
            rest: &[],
        },
    }
}

/// 解码 GetAllEncoders 响应负载：恰好 16 字节 → 4 × i32 大端（按电机顺序）
///
/// 负载是自上次轮询以来的 tick 增量，不是绝对位置。
/// 任何长度不足 16 字节的输入都是硬解码失败。
pub fn decode_encoder_payload(payload: &[u8]) -> Result<[i32; MOTOR_COUNT], ProtocolError> {
    if payload.len() != ENCODER_PAYLOAD_LEN {
        return Err(ProtocolError::InvalidLength {
            expected: ENCODER_PAYLOAD_LEN,
            actual: payload.len(),
        });
    }

    let mut deltas = [0i32; MOTOR_COUNT];
    for (i, chunk) in payload.chunks_exact(4).enumerate() {
        deltas[i] = bytes_to_i32_be([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(deltas)
}

/// 将字节序列格式化为十六进制串（诊断日志用）
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_for_marker_with_leading_noise() {
        // 杂散字节 FF FF 在真正的 0x01 响应之前
        let outcome = scan_for_marker(&[0xFF, 0xFF, 0x01, 0x07], 0x01);
        assert!(outcome.matched);
        assert_eq!(outcome.discarded, vec![0xFF, 0xFF]);
        assert_eq!(outcome.rest, &[0x07]);
    }

    #[test]
    fn test_scan_for_marker_immediate_match() {
        let outcome = scan_for_marker(&[0x03], 0x03);
        assert!(outcome.matched);
        assert!(outcome.discarded.is_empty());
        assert!(outcome.rest.is_empty());
    }

    #[test]
    fn test_scan_for_marker_no_match() {
        let outcome = scan_for_marker(&[0xAA, 0xBB], 0x02);
        assert!(!outcome.matched);
        assert_eq!(outcome.discarded, vec![0xAA, 0xBB]);
        assert!(outcome.rest.is_empty());
    }

    #[test]
    fn test_decode_encoder_payload() {
        let payload = [
            0x00, 0x00, 0x00, 0x01, // 1
            0xFF, 0xFF, 0xFF, 0xFF, // -1
            0x00, 0x00, 0x00, 0x00, // 0
            0x00, 0x00, 0x00, 0x0A, // 10
        ];
        assert_eq!(decode_encoder_payload(&payload).unwrap(), [1, -1, 0, 10]);
    }

    #[test]
    fn test_decode_encoder_payload_short_is_hard_failure() {
        let result = decode_encoder_payload(&[0x00; 15]);
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidLength {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0xFF, 0x01, 0x0A]), "ff 01 0a");
        assert_eq!(hex_dump(&[]), "");
    }
}
