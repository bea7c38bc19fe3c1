//! 回环集成测试
//!
//! 在本机起一个模拟 ECU 的 TCP 服务端，走真实的 TcpTransport
//! 验证整条链路：连接、入队、响应解析、回调分发、统计。

use crossbeam_channel::{unbounded, Receiver, Sender};
use ecu_link::{EcuLink, LinkCallback, PRIORITY_NORMAL};
use ecu_transport::TcpTransport;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Debug, Clone, PartialEq)]
enum LinkEvent {
    Status(String),
    Error(String),
    Encoders([i32; 4]),
}

struct RecordingCallback {
    tx: Sender<LinkEvent>,
}

impl LinkCallback for RecordingCallback {
    fn on_status(&self, message: &str) {
        let _ = self.tx.send(LinkEvent::Status(message.to_string()));
    }

    fn on_error(&self, message: &str) {
        let _ = self.tx.send(LinkEvent::Error(message.to_string()));
    }

    fn on_encoders(&self, deltas: &[i32; 4]) {
        let _ = self.tx.send(LinkEvent::Encoders(*deltas));
    }
}

/// 模拟 ECU：应答四种命令，并把收到的每个请求帧上报给测试线程
fn spawn_ecu_server() -> (u16, Receiver<Vec<u8>>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (request_tx, request_rx) = unbounded();

    let handle = thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        stream
            .set_read_timeout(Some(Duration::from_millis(100)))
            .ok();

        loop {
            let mut id = [0u8; 1];
            match stream.read_exact(&mut id) {
                Ok(()) => {},
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                },
                // 客户端断开，退出
                Err(_) => return,
            }

            let payload_len = match id[0] {
                0x01 => 1,
                0x02 => 5,
                0x03 => 16,
                0x05 => 0,
                _ => return,
            };
            let mut payload = vec![0u8; payload_len];
            if payload_len > 0 && stream.read_exact(&mut payload).is_err() {
                return;
            }

            let mut frame = vec![id[0]];
            frame.extend_from_slice(&payload);
            let _ = request_tx.send(frame);

            let response = match id[0] {
                0x01 => vec![0x01, 0x07],
                0x02 => vec![0x02],
                0x03 => vec![0x03],
                0x05 => {
                    let mut resp = vec![0x05];
                    for delta in [1i32, -1, 0, 10] {
                        resp.extend_from_slice(&delta.to_be_bytes());
                    }
                    resp
                },
                _ => unreachable!(),
            };
            if stream.write_all(&response).is_err() {
                return;
            }
        }
    });

    (port, request_rx, handle)
}

fn recv_event(rx: &Receiver<LinkEvent>) -> LinkEvent {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("no link event within deadline")
}

#[test]
fn test_end_to_end_command_cycle() {
    init_tracing();
    let (port, request_rx, server) = spawn_ecu_server();

    let mut link = EcuLink::new(TcpTransport::new());
    let (tx, event_rx) = unbounded();
    link.register_callback(Arc::new(RecordingCallback { tx }));

    assert!(link.connect("127.0.0.1", port));
    link.start().unwrap();
    // 可用 = worker 运行中且传输已连接
    assert!(link.is_connected());

    link.enqueue_get_api_version(PRIORITY_NORMAL);
    link.enqueue_all_motor_speeds(&[10, -20, 0, 100], PRIORITY_NORMAL);
    link.enqueue_get_all_encoders(PRIORITY_NORMAL);

    assert_eq!(recv_event(&event_rx), LinkEvent::Status("ECU api version 7".into()));
    assert_eq!(
        recv_event(&event_rx),
        LinkEvent::Status("Command 0x03 acknowledged".into())
    );
    assert_eq!(recv_event(&event_rx), LinkEvent::Encoders([1, -1, 0, 10]));

    // 服务端看到的请求帧：版本请求带驱动版本号，速度为 RPM x 100 大端
    let version_req = request_rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(version_req, vec![0x01, 0x01]);

    let speeds_req = request_rx.recv_timeout(Duration::from_secs(1)).unwrap();
    let mut expected = vec![0x03];
    for rpm in [10i32, -20, 0, 100] {
        expected.extend_from_slice(&(rpm * 100).to_be_bytes());
    }
    assert_eq!(speeds_req, expected);

    let encoders_req = request_rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(encoders_req, vec![0x05]);

    assert_eq!(link.command_stats(), (3, 0));

    link.disconnect();
    server.join().unwrap();
}

#[test]
fn test_emergency_stop_sends_zero_speeds() {
    init_tracing();
    let (port, request_rx, server) = spawn_ecu_server();

    let mut link = EcuLink::new(TcpTransport::new());
    assert!(link.connect("127.0.0.1", port));
    link.start().unwrap();

    link.emergency_stop();

    // 急停帧：0x03 + 4 个全零速度
    let frame = request_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(frame, vec![0x03, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

    link.disconnect();
    server.join().unwrap();
}

#[test]
fn test_commands_dropped_after_stop() {
    init_tracing();
    let (port, _request_rx, server) = spawn_ecu_server();

    let mut link = EcuLink::new(TcpTransport::new());
    assert!(link.connect("127.0.0.1", port));
    link.start().unwrap();
    link.stop();

    link.enqueue_get_all_encoders(PRIORITY_NORMAL);
    assert_eq!(link.queue_len(), 0);
    assert_eq!(link.command_stats(), (0, 0));

    link.disconnect();
    server.join().unwrap();
}
