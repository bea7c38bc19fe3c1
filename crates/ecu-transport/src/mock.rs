//! 脚本化 Mock 传输
//!
//! 无网络依赖的 [`StreamTransport`] 实现：预置 RX 字节、记录 TX 帧、
//! 可注入连接/发送失败。状态放在 `Arc<Mutex<_>>` 里并实现 `Clone`，
//! 测试线程保留一个句柄即可在 worker 线程持有传输的同时检查交互。

use crate::StreamTransport;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    connected: bool,
    rx: VecDeque<u8>,
    tx: Vec<Vec<u8>>,
    fail_connect: bool,
    fail_sends_remaining: usize,
    connect_calls: usize,
    disconnect_calls: usize,
}

/// 脚本化 Mock 传输
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    /// 预置后续 `receive` 将读到的字节
    pub fn push_rx(&self, bytes: &[u8]) {
        self.state().rx.extend(bytes.iter().copied());
    }

    /// 已发送的帧（每次 `send` 调用一帧）
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.state().tx.clone()
    }

    /// 让接下来 `n` 次 `send` 失败
    pub fn fail_next_sends(&self, n: usize) {
        self.state().fail_sends_remaining = n;
    }

    /// 让后续 `connect` 失败
    pub fn set_fail_connect(&self, fail: bool) {
        self.state().fail_connect = fail;
    }

    pub fn connect_calls(&self) -> usize {
        self.state().connect_calls
    }

    pub fn disconnect_calls(&self) -> usize {
        self.state().disconnect_calls
    }
}

impl StreamTransport for MockTransport {
    fn connect(&mut self, _host: &str, _port: u16) -> bool {
        let mut state = self.state();
        state.connect_calls += 1;
        if state.fail_connect {
            state.connected = false;
            false
        } else {
            state.connected = true;
            true
        }
    }

    fn disconnect(&mut self) {
        let mut state = self.state();
        state.disconnect_calls += 1;
        state.connected = false;
    }

    fn send(&mut self, data: &[u8]) -> bool {
        let mut state = self.state();
        if !state.connected {
            return false;
        }
        if state.fail_sends_remaining > 0 {
            state.fail_sends_remaining -= 1;
            state.connected = false;
            return false;
        }
        state.tx.push(data.to_vec());
        true
    }

    fn receive(&mut self, size: usize, _timeout: Duration) -> Option<Vec<u8>> {
        let mut state = self.state();
        if !state.connected || state.rx.len() < size {
            // 脚本字节不足视为截止时间到期
            return None;
        }
        Some(state.rx.drain(..size).collect())
    }

    fn receive_available(&mut self) -> Vec<u8> {
        let mut state = self.state();
        state.rx.drain(..).collect()
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }
}
