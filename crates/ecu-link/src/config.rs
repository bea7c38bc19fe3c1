//! 链路配置

use ecu_protocol::DEFAULT_RESPONSE_TIMEOUT;
use std::time::Duration;

/// 链路配置
///
/// 纯数据结构，构造后只读；worker 与测试共用同一份默认值。
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkConfig {
    /// 命令响应整体超时
    pub response_timeout: Duration,
    /// 重同步扫描中单字节读超时
    pub resync_byte_timeout: Duration,
    /// 队列为空时 worker 的休眠时长
    pub idle_sleep: Duration,
    /// 触发重连的连续失败次数
    pub failure_threshold: u32,
    /// 断开到重连之间的等待时长
    pub reconnect_delay: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            resync_byte_timeout: Duration::from_millis(50),
            idle_sleep: Duration::from_millis(1),
            failure_threshold: 5,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}
