//! 链路层错误类型

use ecu_transport::udp::BindError;
use thiserror::Error;

/// 链路层错误
///
/// 命令执行失败不走该类型（以 [`Response`](ecu_protocol::Response) 表达），
/// 这里只覆盖资源性失败：绑定端口、创建线程。
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Telemetry socket error: {0}")]
    Bind(#[from] BindError),

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },
}
