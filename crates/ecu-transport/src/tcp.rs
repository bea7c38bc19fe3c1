//! TCP 流传输实现
//!
//! 命令字节需要及时上线，连接建立后立即 `set_nodelay(true)` 禁用合并。
//! `receive` 的整体截止时间通过逐段 `set_read_timeout` 实现。

use crate::{StreamTransport, TransportError};
use ecu_protocol::hex_dump;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// 默认连接超时
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// TCP 流传输
pub struct TcpTransport {
    stream: Option<TcpStream>,
    connected: bool,
    connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            stream: None,
            connected: false,
            connect_timeout,
        }
    }

    /// 解析并建连，失败时返回结构化原因
    fn try_connect(&self, host: &str, port: u16) -> Result<TcpStream, TransportError> {
        let target = format!("{}:{}", host, port);
        let addrs: Vec<SocketAddr> = target
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve(host.to_string()))?
            .collect();

        let addr = addrs
            .first()
            .ok_or_else(|| TransportError::Resolve(host.to_string()))?;

        let stream = TcpStream::connect_timeout(addr, self.connect_timeout).map_err(|e| {
            match e.kind() {
                ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                    TransportError::ConnectTimeout(target.clone())
                },
                ErrorKind::ConnectionRefused => TransportError::Refused(target.clone()),
                _ => TransportError::Io(e),
            }
        })?;

        // 禁止发送端合并小写入：命令帧必须立刻上线
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// 失败后翻转状态，后续调用快速失败
    fn mark_disconnected(&mut self) {
        self.connected = false;
        self.stream = None;
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamTransport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> bool {
        // 重复 connect 时先释放旧连接
        self.disconnect();

        match self.try_connect(host, port) {
            Ok(stream) => {
                debug!("TCP connected to {}:{}", host, port);
                self.stream = Some(stream);
                self.connected = true;
                true
            },
            Err(e) => {
                error!("TCP connect failed: {}", e);
                self.mark_disconnected();
                false
            },
        }
    }

    fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            debug!("TCP disconnected");
        }
        self.connected = false;
    }

    fn send(&mut self, data: &[u8]) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        if !self.connected {
            return false;
        }

        trace!("TX [{} bytes]: {}", data.len(), hex_dump(data));
        match stream.write_all(data) {
            Ok(()) => true,
            Err(e) => {
                error!("TCP send failed: {}", e);
                self.mark_disconnected();
                false
            },
        }
    }

    fn receive(&mut self, size: usize, timeout: Duration) -> Option<Vec<u8>> {
        if !self.connected {
            return None;
        }

        let deadline = Instant::now() + timeout;
        let mut buf = vec![0u8; size];
        let mut filled = 0usize;

        while filled < size {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                trace!(
                    "TCP receive deadline expired: got {}/{} bytes",
                    filled, size
                );
                return None;
            }

            let stream = self.stream.as_mut()?;
            if stream.set_read_timeout(Some(remaining)).is_err() {
                self.mark_disconnected();
                return None;
            }

            match stream.read(&mut buf[filled..]) {
                // 零字节读 = 对端关闭
                Ok(0) => {
                    warn!("TCP connection closed by peer during read");
                    self.mark_disconnected();
                    return None;
                },
                Ok(n) => filled += n,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    // 分段超时，回到循环头重新检查整体截止时间
                    continue;
                },
                Err(e) => {
                    error!("TCP receive failed: {}", e);
                    self.mark_disconnected();
                    return None;
                },
            }
        }

        trace!("RX [{} bytes]: {}", buf.len(), hex_dump(&buf));
        Some(buf)
    }

    fn receive_available(&mut self) -> Vec<u8> {
        let mut drained = Vec::new();
        let Some(stream) = self.stream.as_mut() else {
            return drained;
        };

        if stream.set_nonblocking(true).is_err() {
            return drained;
        }

        let mut chunk = [0u8; 256];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    warn!("TCP connection closed by peer during drain");
                    self.mark_disconnected();
                    return drained;
                },
                Ok(n) => drained.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!("TCP drain failed: {}", e);
                    self.mark_disconnected();
                    return drained;
                },
            }
        }

        let _ = stream.set_nonblocking(false);
        if !drained.is_empty() {
            trace!("RX drain [{} bytes]: {}", drained.len(), hex_dump(&drained));
        }
        drained
    }

    fn is_connected(&self) -> bool {
        self.connected && self.stream.is_some()
    }
}
