//! 回调注册与分发
//!
//! 回调在 worker / 遥测线程上同步触发，实现方必须保持轻量：
//! 做耗时处理请自行转发到别的线程。

use ecu_protocol::{TelemetrySample, MOTOR_COUNT};
use parking_lot::RwLock;
use std::sync::Arc;

/// 命令链路事件回调
///
/// 所有方法都有空默认实现，按需覆盖。
pub trait LinkCallback: Send + Sync {
    /// 命令成功执行后的状态通知
    fn on_status(&self, _message: &str) {}

    /// 命令失败或链路异常通知
    fn on_error(&self, _message: &str) {}

    /// 收到编码器增量（按电机顺序）
    fn on_encoders(&self, _deltas: &[i32; MOTOR_COUNT]) {}
}

/// 遥测样本回调
pub trait TelemetryCallback: Send + Sync {
    fn on_sample(&self, sample: &TelemetrySample);
}

/// 链路回调注册表
///
/// 注册只增不减；触发时逐个同步调用。
pub struct CallbackRegistry {
    callbacks: RwLock<Vec<Arc<dyn LinkCallback>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, callback: Arc<dyn LinkCallback>) {
        self.callbacks.write().push(callback);
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }

    pub fn notify_status(&self, message: &str) {
        for callback in self.callbacks.read().iter() {
            callback.on_status(message);
        }
    }

    pub fn notify_error(&self, message: &str) {
        for callback in self.callbacks.read().iter() {
            callback.on_error(message);
        }
    }

    pub fn notify_encoders(&self, deltas: &[i32; MOTOR_COUNT]) {
        for callback in self.callbacks.read().iter() {
            callback.on_encoders(deltas);
        }
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 遥测回调注册表
pub struct TelemetryRegistry {
    callbacks: RwLock<Vec<Arc<dyn TelemetryCallback>>>,
}

impl TelemetryRegistry {
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, callback: Arc<dyn TelemetryCallback>) {
        self.callbacks.write().push(callback);
    }

    pub fn notify_sample(&self, sample: &TelemetrySample) {
        for callback in self.callbacks.read().iter() {
            callback.on_sample(sample);
        }
    }
}

impl Default for TelemetryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCallback {
        status_count: AtomicUsize,
        error_count: AtomicUsize,
        encoder_count: AtomicUsize,
    }

    impl LinkCallback for CountingCallback {
        fn on_status(&self, _message: &str) {
            self.status_count.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, _message: &str) {
            self.error_count.fetch_add(1, Ordering::SeqCst);
        }

        fn on_encoders(&self, _deltas: &[i32; MOTOR_COUNT]) {
            self.encoder_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_notify_fans_out_to_all_callbacks() {
        let registry = CallbackRegistry::new();
        let first = Arc::new(CountingCallback::default());
        let second = Arc::new(CountingCallback::default());
        registry.add(first.clone());
        registry.add(second.clone());

        registry.notify_status("connected");
        registry.notify_encoders(&[1, -1, 0, 10]);

        assert_eq!(first.status_count.load(Ordering::SeqCst), 1);
        assert_eq!(second.status_count.load(Ordering::SeqCst), 1);
        assert_eq!(first.encoder_count.load(Ordering::SeqCst), 1);
        assert_eq!(second.error_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_registry_notify_is_noop() {
        let registry = CallbackRegistry::new();
        assert!(registry.is_empty());
        registry.notify_error("nobody listens");
    }
}
