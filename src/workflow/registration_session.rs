//! 注册会话 - 流程层
//!
//! 核心职责：把一个登录会话从登录页驱动到 CRN 表单，并提交一批 CRN
//!
//! 流程顺序：
//! 1. 打开注册入口 → 输入 netid / 密码 → 提交
//! 2. 选择学期 → 进入 "Enter CRNs" 标签页
//! 3. 每组最多 `crn_slots` 个 CRN：填写 → 加入列表 → 读取错误 → 最终提交 → 读取错误
//! 4. 关闭通知浮层，回到 CRN 表单

use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::{Config, Selectors};
use crate::error::{PortError, SnipeError, SnipeResult};
use crate::infrastructure::AutomationPort;
use crate::models::{Credentials, Crn, Profile, RawOutcome};
use crate::services::outcome_crn;
use crate::workflow::driver::SubmissionDriver;
use crate::workflow::session_state::SessionState;

/// 等待登录表单或学期选择出现时的轮询间隔
const LOGIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 注册会话
///
/// - 唯一持有自动化端口
/// - 只产出原始错误文本，不做分类
/// - 每个页面步骤遇到可恢复错误时重试一次
pub struct RegistrationSession<P: AutomationPort> {
    port: P,
    credentials: Credentials,
    registration_url: String,
    selectors: Selectors,
    wait_timeout: Duration,
    settle_delay: Duration,
    crn_slots: usize,
    state: SessionState,
    unconfirmed: Vec<Crn>,
}

impl<P: AutomationPort> RegistrationSession<P> {
    pub fn new(port: P, config: &Config, profile: &Profile) -> Self {
        Self {
            port,
            credentials: profile.credentials.clone(),
            registration_url: config.registration_url.clone(),
            selectors: profile.selectors.clone(),
            wait_timeout: config.wait_timeout,
            settle_delay: config.settle_delay,
            crn_slots: config.crn_slots.max(1),
            state: SessionState::Unauthenticated,
            unconfirmed: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    // ========== 页面步骤（各重试一次） ==========

    async fn step_navigate(&self, url: &str) -> Result<(), PortError> {
        let port = &self.port;
        retry_once("打开注册页面", move || port.navigate(url)).await
    }

    async fn step_click(&self, selector: &str) -> Result<(), PortError> {
        let port = &self.port;
        retry_once(&format!("点击 {}", selector), move || port.click(selector)).await
    }

    async fn step_type(&self, selector: &str, text: &str) -> Result<(), PortError> {
        let port = &self.port;
        retry_once(&format!("输入 {}", selector), move || port.type_text(selector, text)).await
    }

    async fn step_wait(&self, selector: &str) -> Result<P::Element, PortError> {
        let port = &self.port;
        let timeout = self.wait_timeout;
        retry_once(&format!("等待 {}", selector), move || {
            port.wait_visible(selector, timeout)
        })
        .await
    }

    /// 等待元素可见后点击
    async fn step_wait_and_click(&self, selector: &str) -> Result<(), PortError> {
        let element = self.step_wait(selector).await?;
        let port = &self.port;
        let element = &element;
        retry_once(&format!("点击 {}", selector), move || port.click_element(element)).await
    }

    async fn step_query(&self, selector: &str) -> Result<Vec<P::Element>, PortError> {
        let port = &self.port;
        retry_once(&format!("查询 {}", selector), move || port.query_all(selector)).await
    }

    /// 读取错误列表中的全部文本
    async fn step_read_errors(&self) -> Result<Vec<String>, PortError> {
        let port = &self.port;
        let selector = self.selectors.error_messages.as_str();
        retry_once("读取错误列表", move || async move {
            let elements = port.query_all(selector).await?;
            let mut texts = Vec::with_capacity(elements.len());
            for element in &elements {
                texts.push(port.element_text(element).await?);
            }
            Ok::<_, PortError>(texts)
        })
        .await
    }

    /// 轮询直到 `first` 或 `second` 可见，`first` 先出现时返回 true
    async fn wait_for_either(&self, first: &str, second: &str) -> Result<bool, PortError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            if self.first_displayed(first).await {
                return Ok(true);
            }
            if self.first_displayed(second).await {
                return Ok(false);
            }
            if Instant::now() >= deadline {
                return Err(PortError::timeout(
                    format!("{} | {}", first, second),
                    self.wait_timeout.as_secs(),
                ));
            }
            sleep(LOGIN_POLL_INTERVAL).await;
        }
    }

    /// 第一个匹配的元素是否可见，查询失败视为不可见
    async fn first_displayed(&self, selector: &str) -> bool {
        let Ok(elements) = self.port.query_all(selector).await else {
            return false;
        };
        match elements.first() {
            Some(element) => self.port.is_displayed(element).await.unwrap_or(false),
            None => false,
        }
    }

    // ========== 驱动到 CRN 表单 ==========

    async fn drive_to_submission_form(&mut self) -> SnipeResult<()> {
        self.authenticate().await?;
        self.select_term().await?;
        Ok(())
    }

    async fn authenticate(&mut self) -> SnipeResult<()> {
        self.state = SessionState::Authenticating;
        info!("🔐 正在登录: {}", self.credentials.netid);

        self.step_navigate(&self.registration_url).await?;
        self.step_click(&self.selectors.register_link).await?;

        // 注册入口跳转完成前两者都不可见，页面加载慢不算登录失败
        let needs_login = self
            .wait_for_either(&self.selectors.netid_input, &self.selectors.term_dropdown)
            .await?;

        if needs_login {
            self.step_type(&self.selectors.netid_input, &self.credentials.netid)
                .await?;
            self.step_type(&self.selectors.password_input, &self.credentials.password)
                .await?;
            let port = &self.port;
            let password_input = self.selectors.password_input.as_str();
            retry_once("提交登录表单", move || port.submit_form(password_input)).await?;
        } else {
            debug!("未出现登录表单，沿用现有登录状态");
        }

        if let Err(e) = self.step_wait(&self.selectors.term_dropdown).await {
            if self.first_displayed(&self.selectors.login_error).await {
                return Err(SnipeError::authentication("登录页面提示凭据错误"));
            }
            if e.is_timeout() {
                return Err(SnipeError::authentication(format!(
                    "登录后连续两次未能进入学期选择: {}",
                    e
                )));
            }
            return Err(e.into());
        }

        self.state = SessionState::AtTermSelect;
        info!("✓ 登录成功");
        Ok(())
    }

    async fn select_term(&mut self) -> SnipeResult<()> {
        let s = &self.selectors;
        self.step_click(&s.term_dropdown).await?;
        self.step_wait_and_click(&s.term_result).await?;
        self.step_click(&s.term_go).await?;
        self.step_wait_and_click(&s.enter_crns_tab).await?;
        self.step_wait(&s.crn_form).await?;

        self.state = SessionState::AtSubmissionForm;
        info!("✓ 已进入 CRN 表单");
        Ok(())
    }

    // ========== 提交 ==========

    async fn submit_chunk(&mut self, chunk: &[Crn]) -> SnipeResult<Vec<RawOutcome>> {
        self.fill_slots(chunk).await?;
        self.step_click(&self.selectors.add_crn_button).await?;
        self.state = SessionState::Submitted;

        let mut outcomes = self.collect_outcomes().await?;
        self.dismiss_notifications().await;

        // 同一个 CRN 可能有多条错误，按 CRN 判断是否全部被拒绝
        let rejected: HashSet<Crn> = outcomes.iter().filter_map(outcome_crn).collect();
        if !chunk.iter().all(|crn| rejected.contains(crn)) {
            self.step_wait_and_click(&self.selectors.save_button).await?;
            self.unconfirmed.extend_from_slice(chunk);
            outcomes.extend(self.collect_outcomes().await?);
            self.dismiss_notifications().await;
        } else {
            debug!("本组 CRN 全部在加入列表时被拒绝，跳过最终提交");
        }

        self.state = SessionState::AtSubmissionForm;
        Ok(outcomes)
    }

    async fn fill_slots(&self, chunk: &[Crn]) -> SnipeResult<()> {
        for (i, crn) in chunk.iter().enumerate() {
            let slot = i + 1;
            self.step_type(&self.selectors.crn_input(slot), &crn.to_string())
                .await?;
            if slot < chunk.len() {
                self.step_click(&self.selectors.add_another_crn).await?;
            }
        }

        // 上一轮留下的输入框必须清空，否则会被重复提交
        for slot in chunk.len() + 1..=self.crn_slots {
            let selector = self.selectors.crn_input(slot);
            if !self.step_query(&selector).await?.is_empty() {
                self.step_type(&selector, "").await?;
            }
        }
        Ok(())
    }

    async fn collect_outcomes(&self) -> SnipeResult<Vec<RawOutcome>> {
        if !self.settle_delay.is_zero() {
            sleep(self.settle_delay).await;
        }

        let texts = self.step_read_errors().await?;
        let mut outcomes = Vec::with_capacity(texts.len());
        for text in &texts {
            let text = text.trim();
            if !text.is_empty() {
                debug!("错误文本: {}", text);
                outcomes.push(RawOutcome::new(text));
            }
        }
        Ok(outcomes)
    }

    /// 关闭错误列表和通知中心浮层
    ///
    /// 浮层不是结果，关闭失败只记录日志
    async fn dismiss_notifications(&self) {
        let buttons = match self.port.query_all(&self.selectors.error_dismiss_buttons).await {
            Ok(buttons) => buttons,
            Err(e) => {
                warn!("⚠️ 查询通知关闭按钮失败: {}", e);
                return;
            }
        };

        for button in &buttons {
            if let Err(e) = self.port.click_element(button).await {
                warn!("⚠️ 关闭通知失败: {}", e);
                continue;
            }
            if self.first_displayed(&self.selectors.notification_anchor).await {
                if let Err(e) = self.port.click(&self.selectors.notification_anchor).await {
                    warn!("⚠️ 关闭通知中心失败: {}", e);
                }
            }
        }
    }
}

#[async_trait]
impl<P: AutomationPort> SubmissionDriver for RegistrationSession<P> {
    fn is_at_submission_form(&self) -> bool {
        self.state == SessionState::AtSubmissionForm
    }

    async fn ensure_on_submission_page(&mut self) -> SnipeResult<()> {
        if self.state.is_terminal() {
            return Err(SnipeError::authentication("会话已因登录失败终止"));
        }

        if self.state == SessionState::AtSubmissionForm {
            if self.first_displayed(&self.selectors.crn_form).await {
                debug!("已在 CRN 表单");
                return Ok(());
            }
            warn!("⚠️ 页面已离开 CRN 表单，重新进入");
        }

        self.state = SessionState::Unauthenticated;
        match self.drive_to_submission_form().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = match &e {
                    SnipeError::Authentication { .. } => SessionState::Failed,
                    _ => SessionState::Unauthenticated,
                };
                Err(e)
            }
        }
    }

    async fn submit_batch(&mut self, crns: &[Crn]) -> SnipeResult<Vec<RawOutcome>> {
        self.unconfirmed.clear();
        if crns.is_empty() {
            return Ok(Vec::new());
        }

        self.ensure_on_submission_page().await?;

        let total_chunks = crns.len().div_ceil(self.crn_slots);
        let mut outcomes = Vec::new();
        for (index, chunk) in crns.chunks(self.crn_slots).enumerate() {
            info!(
                "📤 提交第 {}/{} 组 CRN: {:?}",
                index + 1,
                total_chunks,
                chunk.iter().map(|c| c.get()).collect::<Vec<_>>()
            );
            outcomes.extend(self.submit_chunk(chunk).await?);
        }

        self.unconfirmed.clear();
        Ok(outcomes)
    }

    fn invalidate(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Unauthenticated;
        }
    }

    fn unconfirmed(&self) -> Vec<Crn> {
        self.unconfirmed.clone()
    }
}

/// 执行一个页面步骤，失败时重试一次
async fn retry_once<T, F, Fut>(step: &str, mut op: F) -> Result<T, PortError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PortError>>,
{
    match op().await {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("⚠️ {} 失败: {}，重试一次", step, e);
            op().await
        }
    }
}
