//! # ECU Transport Layer
//!
//! 字节级传输抽象层：不含任何协议知识，只负责带截止时间的字节搬运。
//!
//! - [`StreamTransport`]: 流式连接抽象（命令/响应链路）
//! - [`TcpTransport`]: TCP 实现
//! - [`TelemetrySocket`]: UDP 遥测收包端点
//!
//! ## 失败语义
//!
//! 所有传输失败都是局部的：公开接口返回 `false`/`None`，从不跨边界
//! 抛出错误。失败后内部状态翻转为未连接，后续调用快速失败，
//! 不会重复尝试 I/O。失败原因通过 `tracing` 记录。

use std::time::Duration;
use thiserror::Error;

pub mod tcp;
pub mod udp;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use tcp::TcpTransport;
pub use udp::TelemetrySocket;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;

/// 传输层内部错误类型
///
/// 仅在 crate 内部流转并用于日志归因；公开接口以 `bool`/`Option` 表达失败。
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not resolve address: {0}")]
    Resolve(String),

    #[error("Connection refused by {0}")]
    Refused(String),

    #[error("Connect to {0} timed out")]
    ConnectTimeout(String),
}

/// 流式传输抽象
///
/// worker 线程独占持有该连接；所有方法在失败时就地返回，从不 panic。
pub trait StreamTransport: Send {
    /// 建立连接，禁用小包合并（Nagle），返回是否成功。
    /// 拒绝、解析失败、超时都返回 false，并记录区分原因的日志。
    fn connect(&mut self, host: &str, port: u16) -> bool;

    /// 关闭并释放连接；幂等，未连接时调用也安全。
    fn disconnect(&mut self);

    /// 发送完整缓冲区；任何写失败返回 false 并标记为未连接。
    fn send(&mut self, data: &[u8]) -> bool;

    /// 读取恰好 `size` 字节，循环处理部分读，整体截止时间从调用起算。
    /// 截止时间到期或对端关闭（零字节读）返回 None；对端关闭同时标记未连接。
    fn receive(&mut self, size: usize, timeout: Duration) -> Option<Vec<u8>>;

    /// 非阻塞地取走 socket 上立即可得的字节；没有数据时返回空而不阻塞。
    /// 仅作为恢复辅助手段使用。
    fn receive_available(&mut self) -> Vec<u8>;

    /// 当前连接状态（不做任何 I/O）。
    fn is_connected(&self) -> bool;
}
