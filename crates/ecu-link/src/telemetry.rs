//! 遥测接收线程
//!
//! 与命令链路完全独立的尽力而为通道：绑定 UDP 端口被动收包，
//! 解码成功的样本同步分发给注册的回调，畸形包丢弃并记日志。
//! 收不到包不算失败，不影响命令链路的任何状态。

use crate::error::LinkError;
use crate::hooks::{TelemetryCallback, TelemetryRegistry};
use ecu_protocol::TelemetrySample;
use ecu_transport::TelemetrySocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace};

/// UDP 遥测接收器
///
/// `start` 绑定端口并启动监听线程，`stop`（以及 Drop）置停止标志并等待
/// 线程退出；监听线程每个收包轮询周期（100ms）检查一次停止标志。
pub struct TelemetryIngestor {
    callbacks: Arc<TelemetryRegistry>,
    stop: Arc<AtomicBool>,
    listener: Option<JoinHandle<()>>,
    local_port: Option<u16>,
}

impl TelemetryIngestor {
    pub fn new() -> Self {
        Self {
            callbacks: Arc::new(TelemetryRegistry::new()),
            stop: Arc::new(AtomicBool::new(false)),
            listener: None,
            local_port: None,
        }
    }

    /// 注册遥测样本回调（在监听线程上同步触发）
    pub fn register_callback(&self, callback: Arc<dyn TelemetryCallback>) {
        self.callbacks.add(callback);
    }

    /// 绑定本地端口并启动监听线程，返回实际绑定的端口（传 0 时由系统分配）
    ///
    /// 已在运行时幂等返回当前端口。
    pub fn start(&mut self, local_port: u16) -> Result<u16, LinkError> {
        if self.listener.is_some() {
            return Ok(self.local_port.unwrap_or(local_port));
        }

        let socket = TelemetrySocket::bind_and_listen(local_port)?;
        let bound = socket.local_port().unwrap_or(local_port);

        self.stop.store(false, Ordering::Release);
        let stop = Arc::clone(&self.stop);
        let callbacks = Arc::clone(&self.callbacks);
        let handle = thread::Builder::new()
            .name("ecu-telemetry".into())
            .spawn(move || listen_loop(socket, stop, callbacks))
            .map_err(|source| LinkError::Spawn {
                name: "ecu-telemetry",
                source,
            })?;

        self.listener = Some(handle);
        self.local_port = Some(bound);
        Ok(bound)
    }

    /// 停止监听线程；最多阻塞一个收包轮询周期
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.listener.take() {
            if handle.join().is_err() {
                error!("Telemetry listener thread panicked");
            }
        }
        self.local_port = None;
    }

    pub fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    /// 当前绑定的本地端口（未运行时为 None）
    pub fn local_port(&self) -> Option<u16> {
        self.local_port
    }
}

impl Default for TelemetryIngestor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TelemetryIngestor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn listen_loop(socket: TelemetrySocket, stop: Arc<AtomicBool>, callbacks: Arc<TelemetryRegistry>) {
    info!("Telemetry listener started");

    while !stop.load(Ordering::Acquire) {
        let Some(datagram) = socket.recv() else {
            continue;
        };

        match TelemetrySample::decode(&datagram) {
            Some(sample) => {
                trace!(
                    "Telemetry sample: source {} seq {} ({} values)",
                    sample.source_id,
                    sample.sequence,
                    sample.values.len()
                );
                callbacks.notify_sample(&sample);
            },
            None => {
                debug!(
                    "Dropped malformed telemetry datagram ({} bytes)",
                    datagram.len()
                );
            },
        }
    }

    info!("Telemetry listener stopped");
}
