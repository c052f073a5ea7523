//! 测试用的脚本化页面
//!
//! 模拟 Banner 注册页面的最小行为：点击显示下一步的元素、CRN 输入框、
//! 错误列表和通知浮层。所有操作立即返回，不做真实等待。

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use class_sniper::config::{Config, RetryPolicy, Selectors};
use class_sniper::error::PortError;
use class_sniper::infrastructure::{AutomationPort, PortResult};
use class_sniper::models::{ClassEntry, Credentials, Crn, Profile};

/// 登录表单提交后显示的元素
const SUBMIT_KEY: &str = "<submit>";

#[derive(Debug, Clone)]
pub struct FakeElement {
    selector: String,
    index: usize,
}

#[derive(Default)]
struct PageState {
    visible: HashSet<String>,
    /// 点击某个元素后显示的元素
    reveals: HashMap<String, Vec<String>>,
    slot_count: usize,
    slot_values: HashMap<usize, String>,
    errors: Vec<String>,
    add_responses: VecDeque<Vec<String>>,
    save_responses: VecDeque<Vec<String>>,
    notification_after_dismiss: bool,
    click_failures: HashMap<String, usize>,
    /// 元素出现前需要被检查的次数（只作用于第一次显示）
    reveal_delays: HashMap<String, usize>,
    pending_reveals: HashMap<String, usize>,
    /// 每次最终提交后读取错误列表连续失败的次数
    collect_failure_plan: VecDeque<usize>,
    collect_failures: usize,

    navigations: usize,
    clicks: Vec<String>,
    typed: Vec<(String, String)>,
    submitted_batches: Vec<Vec<String>>,
}

pub struct FakePort {
    selectors: Selectors,
    state: Mutex<PageState>,
}

impl FakePort {
    /// 一切正常的注册页面
    pub fn new() -> Self {
        let s = Selectors::default();
        let mut state = PageState::default();
        let reveals = [
            (s.register_link.clone(), vec![s.netid_input.clone(), s.password_input.clone()]),
            (SUBMIT_KEY.to_string(), vec![s.term_dropdown.clone()]),
            (s.term_dropdown.clone(), vec![s.term_result.clone()]),
            (s.term_result.clone(), vec![s.term_go.clone()]),
            (s.term_go.clone(), vec![s.enter_crns_tab.clone()]),
            (
                s.enter_crns_tab.clone(),
                vec![
                    s.crn_form.clone(),
                    s.add_another_crn.clone(),
                    s.add_crn_button.clone(),
                    s.save_button.clone(),
                ],
            ),
        ];
        state.reveals = reveals.into_iter().collect();

        Self {
            selectors: s,
            state: Mutex::new(state),
        }
    }

    fn state_mut(&mut self) -> &mut PageState {
        self.state.get_mut().unwrap()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap()
    }

    /// 每次点击 "Add to Summary" 后依次出现的错误文本
    pub fn with_add_responses(mut self, responses: &[&[&str]]) -> Self {
        self.state_mut().add_responses = to_queue(responses);
        self
    }

    /// 每次点击最终提交后依次出现的错误文本
    pub fn with_save_responses(mut self, responses: &[&[&str]]) -> Self {
        self.state_mut().save_responses = to_queue(responses);
        self
    }

    /// 浏览器里已经有登录状态，点击注册入口直接进入学期选择
    pub fn already_logged_in(mut self) -> Self {
        let term = self.selectors.term_dropdown.clone();
        let link = self.selectors.register_link.clone();
        self.state_mut().reveals.insert(link, vec![term]);
        self
    }

    /// 登录表单提交后显示凭据错误
    pub fn rejecting_login(mut self) -> Self {
        let login_error = self.selectors.login_error.clone();
        self.state_mut()
            .reveals
            .insert(SUBMIT_KEY.to_string(), vec![login_error]);
        self
    }

    /// 登录表单提交后页面没有任何反应
    pub fn never_showing_terms(mut self) -> Self {
        self.state_mut().reveals.insert(SUBMIT_KEY.to_string(), Vec::new());
        self
    }

    /// 关闭错误列表后弹出通知中心
    pub fn with_notification_overlay(mut self) -> Self {
        self.state_mut().notification_after_dismiss = true;
        self
    }

    /// 前 `times` 次点击 `selector` 失败
    pub fn failing_clicks(mut self, selector: &str, times: usize) -> Self {
        self.state_mut()
            .click_failures
            .insert(selector.to_string(), times);
        self
    }

    /// 前 `saves` 次最终提交之后读取错误列表一直失败，直到重新打开页面
    pub fn failing_collect_after_save(mut self, saves: usize) -> Self {
        self.state_mut()
            .collect_failure_plan
            .extend(std::iter::repeat(usize::MAX).take(saves));
        self
    }

    /// 第一次最终提交之后读取错误列表失败 `times` 次
    pub fn flaky_collect_after_save(mut self, times: usize) -> Self {
        self.state_mut().collect_failure_plan.push_back(times);
        self
    }

    /// 元素第一次显示时，需要被检查 `checks` 次才真正可见
    pub fn delaying_reveal(mut self, selector: &str, checks: usize) -> Self {
        self.state_mut()
            .reveal_delays
            .insert(selector.to_string(), checks);
        self
    }

    /// 模拟页面被跳转走（例如会话过期），CRN 表单不再显示
    pub fn leave_submission_form(&self) {
        let crn_form = self.selectors.crn_form.clone();
        self.lock().visible.remove(&crn_form);
    }

    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    pub fn navigations(&self) -> usize {
        self.lock().navigations
    }

    pub fn clicks_on(&self, selector: &str) -> usize {
        self.lock().clicks.iter().filter(|c| *c == selector).count()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.lock().typed.clone()
    }

    /// 每次点击 "Add to Summary" 时输入框中的 CRN
    pub fn submitted_batches(&self) -> Vec<Vec<String>> {
        self.lock().submitted_batches.clone()
    }

    pub fn is_visible(&self, selector: &str) -> bool {
        self.lock().visible.contains(selector)
    }

    fn slot_of(&self, selector: &str) -> Option<usize> {
        selector
            .strip_prefix(self.selectors.crn_input_prefix.as_str())
            .and_then(|rest| rest.parse().ok())
    }

    fn click_selector(&self, selector: &str) -> PortResult<()> {
        let s = &self.selectors;
        let mut st = self.lock();
        st.clicks.push(selector.to_string());

        if let Some(remaining) = st.click_failures.get_mut(selector) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(PortError::browser("点击", "injected failure"));
            }
        }

        if selector == s.error_dismiss_buttons {
            if st.errors.is_empty() {
                return Err(PortError::element_not_found(selector));
            }
            st.errors.clear();
            if st.notification_after_dismiss {
                st.visible.insert(s.notification_anchor.clone());
            }
            return Ok(());
        }

        if !st.visible.contains(selector) {
            return Err(PortError::element_not_found(selector));
        }

        if selector == s.notification_anchor {
            st.visible.remove(selector);
        } else if selector == s.add_another_crn {
            st.slot_count += 1;
        } else if selector == s.add_crn_button {
            let batch: Vec<String> = (1..=st.slot_count)
                .filter_map(|slot| st.slot_values.get(&slot))
                .filter(|v| !v.is_empty())
                .cloned()
                .collect();
            st.submitted_batches.push(batch);
            st.errors = st.add_responses.pop_front().unwrap_or_default();
        } else if selector == s.save_button {
            st.errors = st.save_responses.pop_front().unwrap_or_default();
            st.collect_failures = st.collect_failure_plan.pop_front().unwrap_or(0);
        }

        reveal(&mut st, selector);
        Ok(())
    }
}

impl Default for FakePort {
    fn default() -> Self {
        Self::new()
    }
}

fn reveal(st: &mut PageState, key: &str) {
    let Some(shown) = st.reveals.get(key).cloned() else {
        return;
    };
    for selector in shown {
        match st.reveal_delays.remove(&selector) {
            Some(checks) if checks > 0 => {
                st.pending_reveals.insert(selector, checks);
            }
            _ => {
                st.visible.insert(selector);
            }
        }
    }
}

/// 检查一次延迟显示的元素
fn check_pending(st: &mut PageState, selector: &str) {
    let Some(remaining) = st.pending_reveals.get_mut(selector) else {
        return;
    };
    *remaining -= 1;
    if *remaining == 0 {
        st.pending_reveals.remove(selector);
        st.visible.insert(selector.to_string());
    }
}

fn to_queue(responses: &[&[&str]]) -> VecDeque<Vec<String>> {
    responses
        .iter()
        .map(|lines| lines.iter().map(|l| l.to_string()).collect())
        .collect()
}

#[async_trait]
impl AutomationPort for FakePort {
    type Element = FakeElement;

    async fn navigate(&self, _url: &str) -> PortResult<()> {
        let mut st = self.lock();
        st.navigations += 1;
        st.visible = [self.selectors.register_link.clone()].into_iter().collect();
        st.slot_count = 1;
        st.slot_values.clear();
        st.errors.clear();
        st.pending_reveals.clear();
        st.collect_failures = 0;
        Ok(())
    }

    async fn click(&self, selector: &str) -> PortResult<()> {
        self.click_selector(selector)
    }

    async fn type_text(&self, selector: &str, text: &str) -> PortResult<()> {
        let slot = self.slot_of(selector);
        let mut st = self.lock();
        match slot {
            Some(slot) if slot >= 1 && slot <= st.slot_count => {
                st.slot_values.insert(slot, text.to_string());
            }
            Some(_) => return Err(PortError::element_not_found(selector)),
            None if st.visible.contains(selector) => {}
            None => return Err(PortError::element_not_found(selector)),
        }
        st.typed.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> PortResult<FakeElement> {
        let mut st = self.lock();
        check_pending(&mut st, selector);
        if st.visible.contains(selector) {
            Ok(FakeElement {
                selector: selector.to_string(),
                index: 0,
            })
        } else {
            Err(PortError::timeout(selector, timeout.as_secs()))
        }
    }

    async fn query_all(&self, selector: &str) -> PortResult<Vec<FakeElement>> {
        let s = &self.selectors;
        let slot = self.slot_of(selector);
        let mut st = self.lock();
        check_pending(&mut st, selector);

        let count = if selector == s.error_messages {
            if st.collect_failures > 0 {
                st.collect_failures -= 1;
                return Err(PortError::browser("读取错误列表", "page reloaded"));
            }
            st.errors.len()
        } else if selector == s.error_dismiss_buttons {
            usize::from(!st.errors.is_empty())
        } else if let Some(slot) = slot {
            usize::from(slot >= 1 && slot <= st.slot_count)
        } else {
            usize::from(st.visible.contains(selector))
        };

        Ok((0..count)
            .map(|index| FakeElement {
                selector: selector.to_string(),
                index,
            })
            .collect())
    }

    async fn element_text(&self, element: &FakeElement) -> PortResult<String> {
        let st = self.lock();
        if element.selector == self.selectors.error_messages {
            return st
                .errors
                .get(element.index)
                .cloned()
                .ok_or_else(|| PortError::element_not_found(&element.selector));
        }
        Ok(String::new())
    }

    async fn is_displayed(&self, element: &FakeElement) -> PortResult<bool> {
        let st = self.lock();
        Ok(st.visible.contains(&element.selector)
            || element.selector == self.selectors.error_messages
            || element.selector == self.selectors.error_dismiss_buttons)
    }

    async fn click_element(&self, element: &FakeElement) -> PortResult<()> {
        self.click_selector(&element.selector)
    }

    async fn submit_form(&self, selector: &str) -> PortResult<()> {
        let mut st = self.lock();
        if !st.visible.contains(selector) {
            return Err(PortError::element_not_found(selector));
        }
        reveal(&mut st, SUBMIT_KEY);
        Ok(())
    }
}

pub fn crn(v: u32) -> Crn {
    Crn::new(v).unwrap()
}

pub fn profile(crns: &[u32]) -> Profile {
    Profile {
        credentials: Credentials {
            netid: "jdoe2".to_string(),
            password: "hunter2".to_string(),
        },
        classes: crns.iter().map(|&v| ClassEntry::Crn(crn(v))).collect(),
        reasons: Vec::new(),
        selectors: Selectors::default(),
    }
}

/// 不做任何等待的测试配置
pub fn test_config(crn_slots: usize) -> Config {
    Config {
        retry: RetryPolicy::fixed(Duration::ZERO),
        wait_timeout: Duration::from_secs(1),
        settle_delay: Duration::ZERO,
        crn_slots,
        max_recovery_attempts: 2,
        ..Config::default()
    }
}
