//! UDP 遥测收包端点
//!
//! 遥测是尽力而为的带外通道：绑定本地端口被动收包，
//! 读超时设为 100ms，持有线程得以及时观察停止标志。

use std::net::UdpSocket;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// 收包轮询间隔（读超时）
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 单个遥测数据报的最大长度
const MAX_DATAGRAM_LEN: usize = 2048;

/// 遥测端点绑定错误
#[derive(Error, Debug)]
pub enum BindError {
    #[error("UDP bind failed on port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },
}

/// UDP 遥测 socket
///
/// 仅由遥测监听线程持有，不与命令链路共享。
pub struct TelemetrySocket {
    socket: UdpSocket,
}

impl TelemetrySocket {
    /// 绑定本地端口并进入收包状态
    pub fn bind_and_listen(local_port: u16) -> Result<Self, BindError> {
        let socket = UdpSocket::bind(("0.0.0.0", local_port))
            .and_then(|s| {
                s.set_read_timeout(Some(POLL_INTERVAL))?;
                Ok(s)
            })
            .map_err(|source| BindError::Bind {
                port: local_port,
                source,
            })?;

        debug!("Telemetry socket listening on UDP port {}", local_port);
        Ok(Self { socket })
    }

    /// 实际绑定到的本地端口（绑定 0 时由系统分配）
    pub fn local_port(&self) -> Option<u16> {
        self.socket.local_addr().ok().map(|addr| addr.port())
    }

    /// 收取一个数据报；轮询超时返回 None
    pub fn recv(&self) -> Option<Vec<u8>> {
        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        match self.socket.recv_from(&mut buf) {
            Ok((len, _peer)) => Some(buf[..len].to_vec()),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                None
            },
            Err(e) => {
                warn!("Telemetry recv failed: {}", e);
                None
            },
        }
    }
}
