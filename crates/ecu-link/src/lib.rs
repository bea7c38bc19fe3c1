//! # ECU Link
//!
//! 巡检车 ECU 链路层：命令下发与遥测接收。
//!
//! ## 架构
//!
//! - [`EcuLink`]: 命令链路。调用方把命令入队，唯一的 worker 线程
//!   按 (优先级, 入队顺序) 出队执行；执行结果通过回调与统计暴露。
//! - [`TelemetryIngestor`]: 遥测链路。独立 UDP 通道，收包解码后
//!   分发给回调，与命令链路互不影响。
//!
//! ## 失败语义
//!
//! 入队接口从不阻塞、从不抛错；命令失败体现在统计与错误回调中。
//! 连续失败达到阈值后 worker 自动执行一轮断开重连。
//!
//! ## 示例
//!
//! ```no_run
//! use ecu_link::{EcuLink, PRIORITY_NORMAL};
//! use ecu_transport::TcpTransport;
//!
//! let mut link = EcuLink::new(TcpTransport::new());
//! assert!(link.connect("192.168.1.10", 6000));
//! link.start().unwrap();
//!
//! link.enqueue_all_motor_speeds(&[10, 10, 10, 10], PRIORITY_NORMAL);
//! link.enqueue_get_all_encoders(PRIORITY_NORMAL);
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod queue;
pub mod telemetry;
pub mod worker;

pub use config::LinkConfig;
pub use error::LinkError;
pub use hooks::{CallbackRegistry, LinkCallback, TelemetryCallback, TelemetryRegistry};
pub use queue::{CommandQueue, PRIORITY_NORMAL, PRIORITY_URGENT};
pub use telemetry::TelemetryIngestor;
pub use worker::EcuLink;
