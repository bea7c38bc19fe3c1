//! 命令与响应类型定义
//!
//! 命令为封闭的枚举类型（四种命令各自携带负载字段），
//! 编解码通过 `control`/`feedback` 模块中的 match 分发，而非虚函数。

use crate::ids::{CommandId, MOTOR_COUNT};
use std::time::Duration;

/// 默认响应超时
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

/// 命令种类
///
/// 每个变体携带自己的负载字段，构造后不可变。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// 查询 ECU 协议版本
    GetApiVersion,
    /// 设置单个电机转速（RPM）
    SetMotorSpeed { motor_id: u8, speed_rpm: i32 },
    /// 设置全部电机转速（RPM，按电机顺序）
    SetAllMotorsSpeed { speeds: [i32; MOTOR_COUNT] },
    /// 读取全部编码器增量
    GetAllEncoders,
}

impl CommandKind {
    /// 命令对应的线上 ID
    pub fn id(&self) -> CommandId {
        match self {
            CommandKind::GetApiVersion => CommandId::GetApiVersion,
            CommandKind::SetMotorSpeed { .. } => CommandId::SetMotorSpeed,
            CommandKind::SetAllMotorsSpeed { .. } => CommandId::SetAllMotorsSpeed,
            CommandKind::GetAllEncoders => CommandId::GetAllEncoders,
        }
    }
}

/// 带超时的命令
///
/// 由调用方构造、入队后被 worker 消费恰好一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// 命令种类及负载
    pub kind: CommandKind,
    /// 响应超时（从发送完成起计）
    pub timeout: Duration,
}

impl Command {
    /// 使用默认超时创建命令
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    /// 使用自定义超时创建命令
    pub fn with_timeout(kind: CommandKind, timeout: Duration) -> Self {
        Self { kind, timeout }
    }
}

/// 响应中解码出的负载
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseData {
    /// GetApiVersion 响应：ECU 协议版本号
    ApiVersion(u8),
    /// GetAllEncoders 响应：四个编码器自上次轮询以来的增量
    EncoderDeltas([i32; MOTOR_COUNT]),
}

/// 命令执行结果
///
/// `execute` 总是产生一个 Response，从不缺省，也从不跨边界抛出异常。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub success: bool,
    pub data: Option<ResponseData>,
    pub error_message: String,
}

impl Response {
    /// 成功（无负载）
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error_message: String::new(),
        }
    }

    /// 成功（带解码负载）
    pub fn ok_with(data: ResponseData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_message: String::new(),
        }
    }

    /// 失败
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error_message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_default_timeout() {
        let cmd = Command::new(CommandKind::GetAllEncoders);
        assert_eq!(cmd.timeout, DEFAULT_RESPONSE_TIMEOUT);
    }

    #[test]
    fn test_command_kind_id() {
        let kind = CommandKind::SetMotorSpeed {
            motor_id: 2,
            speed_rpm: 50,
        };
        assert_eq!(kind.id(), CommandId::SetMotorSpeed);
        assert_eq!(CommandKind::GetAllEncoders.id(), CommandId::GetAllEncoders);
    }

    #[test]
    fn test_response_constructors() {
        let ok = Response::ok_with(ResponseData::ApiVersion(7));
        assert!(ok.success);
        assert_eq!(ok.data, Some(ResponseData::ApiVersion(7)));

        let err = Response::err("timeout");
        assert!(!err.success);
        assert_eq!(err.error_message, "timeout");
        assert!(err.data.is_none());
    }
}
