//! Chrome 自动化端口 - 基础设施层
//!
//! 持有唯一的 page 资源，通过 CDP 实现 `AutomationPort`

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use super::automation::{AutomationPort, PortResult};
use crate::error::PortError;

/// 轮询元素可见性的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const IS_DISPLAYED_JS: &str = r#"function() {
    const style = window.getComputedStyle(this);
    const hasBox = !!(this.offsetWidth || this.offsetHeight || this.getClientRects().length);
    return hasBox && style.visibility !== 'hidden' && style.display !== 'none';
}"#;

const CLEAR_VALUE_JS: &str = r#"function() {
    if ('value' in this) { this.value = ''; }
    return true;
}"#;

/// Chrome 自动化端口
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 把 CDP 错误映射为 `PortError`
/// - 不认识 CRN / 注册流程
pub struct ChromePort {
    page: Page,
}

impl ChromePort {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 表达式并反序列化结果
    async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> PortResult<T> {
        let result = self
            .page
            .evaluate(js_code.into())
            .await
            .map_err(|e| PortError::browser("evaluate", e))?;
        result
            .into_value()
            .map_err(|e| PortError::browser("evaluate", e))
    }

    async fn find(&self, selector: &str) -> PortResult<Element> {
        self.page.find_element(selector).await.map_err(|e| {
            debug!("查找元素 {} 失败: {}", selector, e);
            PortError::element_not_found(selector)
        })
    }
}

#[async_trait]
impl AutomationPort for ChromePort {
    type Element = Element;

    async fn navigate(&self, url: &str) -> PortResult<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| PortError::browser(format!("goto {}", url), e))?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> PortResult<()> {
        let element = self.find(selector).await?;
        self.click_element(&element).await
    }

    async fn type_text(&self, selector: &str, text: &str) -> PortResult<()> {
        let element = self.find(selector).await?;
        element
            .call_js_fn(CLEAR_VALUE_JS, false)
            .await
            .map_err(|e| PortError::browser(format!("clear {}", selector), e))?;
        element
            .click()
            .await
            .map_err(|e| PortError::browser(format!("focus {}", selector), e))?;
        element
            .type_str(text)
            .await
            .map_err(|e| PortError::browser(format!("type {}", selector), e))?;
        Ok(())
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> PortResult<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                if self.is_displayed(&element).await.unwrap_or(false) {
                    return Ok(element);
                }
            }
            if Instant::now() >= deadline {
                return Err(PortError::timeout(selector, timeout.as_secs()));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn query_all(&self, selector: &str) -> PortResult<Vec<Element>> {
        self.page
            .find_elements(selector)
            .await
            .map_err(|e| PortError::browser(format!("query {}", selector), e))
    }

    async fn element_text(&self, element: &Element) -> PortResult<String> {
        let text = element
            .inner_text()
            .await
            .map_err(|e| PortError::browser("inner_text", e))?;
        Ok(text.unwrap_or_default())
    }

    async fn is_displayed(&self, element: &Element) -> PortResult<bool> {
        let returns = element
            .call_js_fn(IS_DISPLAYED_JS, false)
            .await
            .map_err(|e| PortError::browser("is_displayed", e))?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn click_element(&self, element: &Element) -> PortResult<()> {
        element
            .click()
            .await
            .map_err(|e| PortError::browser("click", e))?;
        Ok(())
    }

    async fn submit_form(&self, selector: &str) -> PortResult<()> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                const form = el.form || el.closest('form');
                if (!form) return false;
                if (form.requestSubmit) {{ form.requestSubmit(); }} else {{ form.submit(); }}
                return true;
            }})()
            "#,
            serde_json::to_string(selector).map_err(|e| PortError::browser("submit", e))?
        );

        if self.eval_as::<bool>(js_code).await? {
            Ok(())
        } else {
            Err(PortError::element_not_found(selector))
        }
    }
}
