//! 应用生命周期 - 编排层
//!
//! 1. **初始化**：加载个人信息、获取浏览器、创建 ChromePort
//! 2. **运行**：组装注册会话和重试控制器，执行到结束
//! 3. **收尾**：打印最终报告，按需保持浏览器打开直到 Ctrl-C

use anyhow::{Context, Result};
use chromiumoxide::{Browser, Page};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::browser;
use crate::config::{BrowserMode, Config};
use crate::infrastructure::ChromePort;
use crate::models::{load_profile, Profile, TerminalReport};
use crate::orchestrator::retry_controller::{ControllerSettings, RetryController};
use crate::services::{ErrorClassifier, ReviewWriter};
use crate::utils::logging::{init_review_file, log_startup, print_final_report};
use crate::workflow::RegistrationSession;

/// 应用主结构
pub struct App {
    config: Config,
    profile: Profile,
    _browser: Browser,
    page: Page,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let profile = load_profile(&config.profile_path)
            .await
            .with_context(|| format!("无法加载个人信息: {}", config.profile_path.display()))?;

        init_review_file(&config.review_file)
            .with_context(|| format!("无法写入复查文件: {}", config.review_file.display()))?;

        let (browser, page) = match &config.browser {
            BrowserMode::Connect { port } => {
                browser::connect_to_browser_and_page(*port, Some("StudentRegistrationSSB")).await?
            }
            BrowserMode::Launch {
                executable,
                headless,
            } => browser::launch_browser(executable.as_deref(), *headless).await?,
        };

        Ok(Self {
            config,
            profile,
            _browser: browser,
            page,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(self, cancel: CancellationToken) -> Result<TerminalReport> {
        let working = self.profile.working_set();
        info!("📋 待抢课程: {}", working);

        let session = RegistrationSession::new(ChromePort::new(self.page.clone()), &self.config, &self.profile);
        let classifier = ErrorClassifier::with_extra_rules(self.profile.reasons.iter().cloned());

        let mut controller = RetryController::new(
            session,
            classifier,
            ControllerSettings::from(&self.config),
            cancel.clone(),
        )
        .with_review_writer(ReviewWriter::with_path(&self.config.review_file));

        let report = controller.run(working).await;
        print_final_report(&report);

        if self.config.hold_open {
            if cancel.is_cancelled() {
                warn!("已取消，不再保持浏览器打开");
            } else {
                info!("🖥️ 浏览器保持打开，按 Ctrl-C 退出");
                cancel.cancelled().await;
            }
        }

        info!("\n复查记录已保存至: {}", self.config.review_file.display());
        Ok(report)
    }
}
