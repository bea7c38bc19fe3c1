//! 优先级命令队列
//!
//! 以 `(priority, sequence)` 为键的无界优先级队列：
//! priority 数值越小越先出队，同优先级按入队顺序（FIFO）。
//! sequence 来自单调递增的原子计数器，保证同优先级下排序稳定。

use ecu_protocol::Command;
use parking_lot::Mutex;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};

/// 紧急命令优先级（急停使用）
pub const PRIORITY_URGENT: u8 = 0;

/// 常规命令默认优先级
pub const PRIORITY_NORMAL: u8 = 5;

struct QueueEntry {
    priority: u8,
    sequence: u64,
    command: Command,
}

// BinaryHeap 是大顶堆，比较取反得到 (priority, sequence) 最小者先出队
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (other.priority, other.sequence).cmp(&(self.priority, self.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueueEntry {}

/// 线程安全的优先级命令队列
///
/// 生产者是任意调用方线程，消费者是唯一的 worker 线程。
pub struct CommandQueue {
    heap: Mutex<BinaryHeap<QueueEntry>>,
    next_sequence: AtomicU64,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// 入队；队列无界，永不阻塞
    pub fn push(&self, command: Command, priority: u8) {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.heap.lock().push(QueueEntry {
            priority,
            sequence,
            command,
        });
    }

    /// 非阻塞出队；空队列返回 None
    pub fn pop(&self) -> Option<Command> {
        self.heap.lock().pop().map(|entry| entry.command)
    }

    /// 原子地清空队列，返回被丢弃的命令数
    pub fn clear(&self) -> usize {
        let mut heap = self.heap.lock();
        let dropped = heap.len();
        heap.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.lock().is_empty()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
