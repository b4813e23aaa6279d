//! # Locator
//!
//! 共享定位传感器仲裁模块。
//!
//! 负责：
//! - 维护活跃请求队列（传感器请求 / IP 查询分队列）
//! - 每次队列变化后重新计算最严格的传感器配置，仅在变化时下发
//! - 授权门控：不足时请求授权，拒绝提示的请求直接失败
//! - 每个请求独立超时
//! - 将传感器事件分发给所有活跃请求
//!
//! ## 使用示例
//!
//! ```ignore
//! use locator::Locator;
//! use contracts::{Accuracy, LocatorConfig, RequestOptions};
//!
//! let locator = Locator::new(sensor, LocatorConfig::default());
//! let handle = locator.submit(RequestOptions::new(Accuracy::House))?;
//! let reading = handle.result().await?;
//! ```

mod actor;
pub mod authorization;
pub mod dispatcher;
mod engine;
pub mod handle;
pub mod ip_lookup;
pub mod metrics;
pub mod queue;
pub mod reconciler;
pub mod request;
pub mod timeout;

pub use authorization::{AuthorizationGate, GateDecision};
pub use contracts::{LocatorConfig, LocatorError, Reading, RequestOptions, Sensor};
pub use engine::{LocatorSnapshot, LookupSummary, RequestSummary};
pub use dispatcher::{dispatch_failure, dispatch_readings, most_recent, DispatchReport, Resolved};
pub use handle::{Locator, RequestHandle, Subscription};
pub use metrics::{LocatorMetrics, MetricsSnapshot};
pub use queue::{QueueMember, RequestQueue};
pub use reconciler::{reconcile, SettingsReconciler};
pub use request::{Delivery, LocationRequest, LocationResult, RequestState};
pub use timeout::{Expiry, TimeoutManager};
