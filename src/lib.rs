//! # Class Sniper
//!
//! 一个用于自动抢课的 Rust 应用程序：反复提交 CRN，直到名额空出或被确认无效
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `AutomationPort` - 页面驱动能力的抽象
//! - `ChromePort` - 基于 chromiumoxide 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单条错误文本
//! - `ErrorClassifier` - 错误文本 → 带类型的结果
//! - `ReviewWriter` - 写 review.txt 能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次提交"的完整页面流程
//! - `RegistrationSession` - 登录 → 选学期 → 填 CRN → 提交
//! - `SubmissionDriver` - 编排层看到的会话契约
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/retry_controller` - 工作集与多轮重试
//! - `orchestrator/app` - 管理浏览器资源和运行生命周期
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{connect_to_browser_and_page, launch_browser};
pub use config::Config;
pub use error::{ConfigError, PortError, SnipeError, SnipeResult};
pub use infrastructure::{AutomationPort, ChromePort};
pub use models::{Crn, OutcomeCategory, Profile, RunStatus, TerminalReport, WorkingSet};
pub use orchestrator::{App, ControllerSettings, RetryController};
pub use services::ErrorClassifier;
pub use workflow::{RegistrationSession, SubmissionDriver};
