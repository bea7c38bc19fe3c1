//! 链路 worker
//!
//! [`EcuLink`] 持有命令队列与流式传输；worker 线程是唯一触碰
//! 流 socket 的执行者，循环从队列取命令、编码发送、重同步读响应。
//! 队列为空时休眠 1ms 再查，不忙等。
//!
//! ## 失败与重连
//!
//! 每条命令的结果计入统计；连续失败达到阈值后执行一轮
//! 断开 → 等待 → 按缓存的 (host, port) 重连。重连成功清零失败计数，
//! 失败则保持计数，下一次命令失败立即再次触发。

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::hooks::{CallbackRegistry, LinkCallback};
use crate::queue::{CommandQueue, PRIORITY_URGENT};
use ecu_protocol::{
    decode_encoder_payload, encode_request, hex_dump, Command, CommandId, CommandKind, Response,
    ResponseData, ENCODER_PAYLOAD_LEN, MOTOR_COUNT,
};
use ecu_transport::StreamTransport;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// worker 线程与调用方共享的链路状态
struct LinkShared<T: StreamTransport> {
    transport: Mutex<T>,
    queue: CommandQueue,
    callbacks: CallbackRegistry,
    config: LinkConfig,
    running: AtomicBool,
    connected: AtomicBool,
    total_commands: AtomicU64,
    failed_commands: AtomicU64,
    /// 最近一次 connect 的目标，重连时复用
    endpoint: Mutex<Option<(String, u16)>>,
}

/// ECU 命令链路
///
/// 公开接口只做入队和状态读取，真正的 I/O 全部发生在 worker 线程上。
/// 入队接口从不阻塞、从不报错：worker 未运行时命令被静默丢弃。
pub struct EcuLink<T: StreamTransport + 'static> {
    shared: Arc<LinkShared<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: StreamTransport + 'static> EcuLink<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, LinkConfig::default())
    }

    pub fn with_config(transport: T, config: LinkConfig) -> Self {
        Self {
            shared: Arc::new(LinkShared {
                transport: Mutex::new(transport),
                queue: CommandQueue::new(),
                callbacks: CallbackRegistry::new(),
                config,
                running: AtomicBool::new(false),
                connected: AtomicBool::new(false),
                total_commands: AtomicU64::new(0),
                failed_commands: AtomicU64::new(0),
                endpoint: Mutex::new(None),
            }),
            worker: None,
        }
    }

    /// 注册链路事件回调（在 worker 线程上同步触发）
    pub fn register_callback(&self, callback: Arc<dyn LinkCallback>) {
        self.shared.callbacks.add(callback);
    }

    /// 连接 ECU 并缓存目标地址供重连使用
    pub fn connect(&self, host: &str, port: u16) -> bool {
        *self.shared.endpoint.lock() = Some((host.to_string(), port));
        let ok = self.shared.transport.lock().connect(host, port);
        self.shared.connected.store(ok, Ordering::Relaxed);
        ok
    }

    /// 停止 worker 并断开连接
    pub fn disconnect(&mut self) {
        self.stop();
        self.shared.transport.lock().disconnect();
        self.shared.connected.store(false, Ordering::Relaxed);
    }

    /// 启动 worker 线程；重复调用是幂等的
    pub fn start(&mut self) -> Result<(), LinkError> {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("ecu-link-worker".into())
            .spawn(move || worker_loop(shared))
            .map_err(|source| {
                self.shared.running.store(false, Ordering::Release);
                LinkError::Spawn {
                    name: "ecu-link-worker",
                    source,
                }
            })?;
        self.worker = Some(handle);
        Ok(())
    }

    /// 停止 worker 线程
    ///
    /// 最多阻塞一条在途命令的剩余接收截止时间。
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Link worker thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// 链路可用状态：worker 运行中且传输已连接
    ///
    /// Relaxed 读取连接标志，允许与 worker 的视角短暂不一致。
    pub fn is_connected(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
            && self.shared.connected.load(Ordering::Relaxed)
    }

    fn enqueue(&self, kind: CommandKind, priority: u8) {
        if !self.is_running() {
            debug!("Dropped {:?}: link worker not running", kind.id());
            return;
        }
        self.shared.queue.push(
            Command::with_timeout(kind, self.shared.config.response_timeout),
            priority,
        );
    }

    pub fn enqueue_get_api_version(&self, priority: u8) {
        self.enqueue(CommandKind::GetApiVersion, priority);
    }

    pub fn enqueue_motor_speed(&self, motor_id: u8, speed_rpm: i32, priority: u8) {
        self.enqueue(CommandKind::SetMotorSpeed { motor_id, speed_rpm }, priority);
    }

    /// 入队全电机速度命令；长度不为 4 时拒绝入队
    pub fn enqueue_all_motor_speeds(&self, speeds: &[i32], priority: u8) {
        let Ok(speeds) = <[i32; MOTOR_COUNT]>::try_from(speeds) else {
            warn!(
                "Rejected set_all_motors_speed: expected {} speeds, got {}",
                MOTOR_COUNT,
                speeds.len()
            );
            return;
        };
        self.enqueue(CommandKind::SetAllMotorsSpeed { speeds }, priority);
    }

    pub fn enqueue_get_all_encoders(&self, priority: u8) {
        self.enqueue(CommandKind::GetAllEncoders, priority);
    }

    /// 急停：清空待执行队列，再以最高优先级下发全零速度
    pub fn emergency_stop(&self) {
        let dropped = self.shared.queue.clear();
        if dropped > 0 {
            warn!("Emergency stop dropped {} queued commands", dropped);
        }
        self.enqueue(
            CommandKind::SetAllMotorsSpeed {
                speeds: [0; MOTOR_COUNT],
            },
            PRIORITY_URGENT,
        );
    }

    /// 原子地清空队列，返回被丢弃的命令数
    pub fn clear_queue(&self) -> usize {
        self.shared.queue.clear()
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    /// (已执行命令数, 失败命令数)；Relaxed 读取，容忍撕裂快照
    pub fn command_stats(&self) -> (u64, u64) {
        (
            self.shared.total_commands.load(Ordering::Relaxed),
            self.shared.failed_commands.load(Ordering::Relaxed),
        )
    }

    pub fn reset_command_stats(&self) {
        self.shared.total_commands.store(0, Ordering::Relaxed);
        self.shared.failed_commands.store(0, Ordering::Relaxed);
    }
}

impl<T: StreamTransport + 'static> Drop for EcuLink<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop<T: StreamTransport>(shared: Arc<LinkShared<T>>) {
    info!("Link worker started");
    let mut consecutive_failures: u32 = 0;

    while shared.running.load(Ordering::Acquire) {
        let Some(command) = shared.queue.pop() else {
            spin_sleep::sleep(shared.config.idle_sleep);
            continue;
        };

        shared.total_commands.fetch_add(1, Ordering::Relaxed);
        let response = {
            let mut transport = shared.transport.lock();
            let response = execute_command(&mut *transport, &command, &shared.config);
            shared
                .connected
                .store(transport.is_connected(), Ordering::Relaxed);
            response
        };

        if response.success {
            consecutive_failures = 0;
            if let Some(ResponseData::EncoderDeltas(deltas)) = &response.data {
                shared.callbacks.notify_encoders(deltas);
            }
            let status = match &response.data {
                Some(ResponseData::ApiVersion(version)) => {
                    info!("ECU reports api version {}", version);
                    format!("ECU api version {}", version)
                },
                _ => format!(
                    "Command 0x{:02x} acknowledged",
                    u8::from(command.kind.id())
                ),
            };
            shared.callbacks.notify_status(&status);
        } else {
            shared.failed_commands.fetch_add(1, Ordering::Relaxed);
            consecutive_failures += 1;
            warn!(
                "Command {:?} failed ({} consecutive): {}",
                command.kind.id(),
                consecutive_failures,
                response.error_message
            );
            shared.callbacks.notify_error(&response.error_message);

            if consecutive_failures >= shared.config.failure_threshold {
                if reconnect(&shared) {
                    consecutive_failures = 0;
                }
                // 重连失败时计数保持在阈值之上，下次失败立即重试
            }
        }
    }

    info!("Link worker stopped");
}

/// 一轮断开 → 等待 → 重连
fn reconnect<T: StreamTransport>(shared: &LinkShared<T>) -> bool {
    let Some((host, port)) = shared.endpoint.lock().clone() else {
        error!("Link degraded but no cached endpoint to reconnect to");
        return false;
    };

    warn!(
        "Link degraded after {} consecutive failures, reconnecting to {}:{}",
        shared.config.failure_threshold, host, port
    );
    shared
        .callbacks
        .notify_error("Link degraded, attempting reconnect");

    shared.transport.lock().disconnect();
    shared.connected.store(false, Ordering::Relaxed);

    spin_sleep::sleep(shared.config.reconnect_delay);

    let ok = shared.transport.lock().connect(&host, port);
    shared.connected.store(ok, Ordering::Relaxed);
    if ok {
        info!("Reconnected to {}:{}", host, port);
        shared.callbacks.notify_status("Reconnected");
    } else {
        error!("Reconnect to {}:{} failed", host, port);
    }
    ok
}

/// 确认帧匹配策略
#[derive(Clone, Copy, PartialEq, Eq)]
enum AckPolicy {
    /// 必须收到回显的命令 ID
    Strict,
    /// 截止时间内收到过任何字节即视为成功（部分固件不回显 0x03）
    Lenient,
}

/// 执行单条命令：编码、发送、读响应；总是产生一个 Response
fn execute_command<T: StreamTransport>(
    transport: &mut T,
    command: &Command,
    config: &LinkConfig,
) -> Response {
    let frame = encode_request(&command.kind);
    if !transport.send(&frame) {
        return Response::err(format!("Failed to send {:?} request", command.kind.id()));
    }

    match &command.kind {
        CommandKind::GetApiVersion => read_version(transport, command.timeout, config),
        CommandKind::SetMotorSpeed { .. } => await_ack(
            transport,
            CommandId::SetMotorSpeed,
            command.timeout,
            config,
            AckPolicy::Strict,
        ),
        CommandKind::SetAllMotorsSpeed { .. } => await_ack(
            transport,
            CommandId::SetAllMotorsSpeed,
            command.timeout,
            config,
            AckPolicy::Lenient,
        ),
        CommandKind::GetAllEncoders => read_encoders(transport, command.timeout, config),
    }
}

/// 逐字节扫描响应流直到命中期望的命令 ID，或整体截止时间到期
///
/// 单字节读用短超时，让扫描循环频繁回到整体截止时间检查点。
fn resync_stream<T: StreamTransport>(
    transport: &mut T,
    marker: u8,
    timeout: Duration,
    byte_timeout: Duration,
) -> (bool, Vec<u8>) {
    let deadline = Instant::now() + timeout;
    let mut discarded = Vec::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || !transport.is_connected() {
            return (false, discarded);
        }

        match transport.receive(1, remaining.min(byte_timeout)) {
            Some(bytes) if bytes[0] == marker => return (true, discarded),
            Some(bytes) => discarded.push(bytes[0]),
            // 单字节超时，回到循环头检查整体截止时间
            None => continue,
        }
    }
}

fn read_version<T: StreamTransport>(
    transport: &mut T,
    timeout: Duration,
    config: &LinkConfig,
) -> Response {
    // ID 读和版本字节读共用一个命令截止时间
    let deadline = Instant::now() + timeout;
    let marker = u8::from(CommandId::GetApiVersion);
    let (matched, discarded) = resync_stream(transport, marker, timeout, config.resync_byte_timeout);
    if !discarded.is_empty() {
        warn!(
            "Discarded {} stray bytes while waiting for version response: {}",
            discarded.len(),
            hex_dump(&discarded)
        );
    }
    if !matched {
        return Response::err("No version response before deadline");
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    match transport.receive(1, remaining) {
        Some(version) => Response::ok_with(ResponseData::ApiVersion(version[0])),
        None => Response::err("Version response truncated after id byte"),
    }
}

fn await_ack<T: StreamTransport>(
    transport: &mut T,
    id: CommandId,
    timeout: Duration,
    config: &LinkConfig,
    policy: AckPolicy,
) -> Response {
    let marker = u8::from(id);
    let (matched, discarded) = resync_stream(transport, marker, timeout, config.resync_byte_timeout);

    if matched {
        if !discarded.is_empty() {
            warn!(
                "Discarded {} stray bytes before 0x{:02x} acknowledgement: {}",
                discarded.len(),
                marker,
                hex_dump(&discarded)
            );
        }
        return Response::ok();
    }

    match policy {
        AckPolicy::Strict => Response::err(format!(
            "No 0x{:02x} acknowledgement before deadline; discarded [{}]",
            marker,
            hex_dump(&discarded)
        )),
        AckPolicy::Lenient => {
            if discarded.is_empty() {
                Response::err("No acknowledgement bytes before deadline")
            } else {
                warn!(
                    "Acknowledgement id mismatch for 0x{:02x} (got [{}]), accepting anyway",
                    marker,
                    hex_dump(&discarded)
                );
                Response::ok()
            }
        },
    }
}

fn read_encoders<T: StreamTransport>(
    transport: &mut T,
    timeout: Duration,
    config: &LinkConfig,
) -> Response {
    // ID 读和负载读共用一个命令截止时间
    let deadline = Instant::now() + timeout;
    let expected = u8::from(CommandId::GetAllEncoders);
    let Some(first) = transport.receive(1, timeout) else {
        return Response::err("No encoder response before deadline");
    };

    let payload = if first[0] == expected {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match transport.receive(ENCODER_PAYLOAD_LEN, remaining) {
            Some(payload) => payload,
            None => return Response::err("Encoder payload truncated"),
        }
    } else if first[0] == 0x00 {
        // 上电残留的 0x00 填充：先等一个短周期让剩余字节到齐，再非阻塞清空
        warn!("Spurious 0x00 before encoder response, attempting burst recovery");
        let mut burst = Vec::new();
        if let Some(head) = transport.receive(1, config.resync_byte_timeout) {
            burst.extend_from_slice(&head);
        }
        burst.extend(transport.receive_available());

        if burst.len() == ENCODER_PAYLOAD_LEN + 1 {
            if burst[0] != expected {
                warn!(
                    "Recovered burst leads with 0x{:02x} instead of 0x{:02x}",
                    burst[0], expected
                );
            }
            burst.split_off(1)
        } else if burst.len() == ENCODER_PAYLOAD_LEN {
            // 固件偶尔省略前导 ID，整块即是负载
            burst
        } else {
            return Response::err(format!(
                "Encoder recovery failed: {} bytes after padding [{}]",
                burst.len(),
                hex_dump(&burst)
            ));
        }
    } else {
        return Response::err(format!(
            "Unexpected response id 0x{:02x} for get_all_encoders",
            first[0]
        ));
    };

    match decode_encoder_payload(&payload) {
        Ok(deltas) => {
            debug!("Encoder deltas: {:?}", deltas);
            Response::ok_with(ResponseData::EncoderDeltas(deltas))
        },
        Err(e) => Response::err(format!("Encoder payload decode failed: {}", e)),
    }
}
