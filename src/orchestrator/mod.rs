//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用生命周期
//! - 加载配置与个人信息
//! - 管理浏览器资源（Browser、ChromePort）
//! - 输出最终报告
//!
//! ### `retry_controller` - 重试控制器
//! - 持有工作集
//! - 每轮提交、分类、更新工作集
//! - 自动化错误时重新驱动会话，等待期间响应取消
//!
//! ## 层次关系
//!
//! ```text
//! app
//!     ↓
//! retry_controller (处理 WorkingSet)
//!     ↓
//! workflow::RegistrationSession (驱动页面，提交一批 CRN)
//!     ↓
//! services (能力层：classifier / review_writer)
//!     ↓
//! infrastructure (基础设施：AutomationPort / ChromePort)
//! ```

pub mod app;
pub mod retry_controller;

pub use app::App;
pub use retry_controller::{ControllerSettings, RetryController};
