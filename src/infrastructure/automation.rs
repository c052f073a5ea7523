//! 自动化端口 - 基础设施层
//!
//! 页面驱动能力的抽象：导航、点击、输入、等待元素、查询元素。
//! 会话只依赖这个 trait，浏览器实现和测试替身都在它后面。

use async_trait::async_trait;
use std::time::Duration;

use crate::error::PortError;

pub type PortResult<T> = Result<T, PortError>;

/// 页面驱动能力
///
/// 所有操作都可能以 `ElementNotFound` 或 `Timeout` 失败
#[async_trait]
pub trait AutomationPort: Send + Sync {
    /// 页面元素句柄
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> PortResult<()>;

    async fn click(&self, selector: &str) -> PortResult<()>;

    /// 清空输入框后输入文本
    async fn type_text(&self, selector: &str, text: &str) -> PortResult<()>;

    /// 等待元素出现并可见
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> PortResult<Self::Element>;

    /// 查询所有匹配的元素，没有匹配时返回空列表
    async fn query_all(&self, selector: &str) -> PortResult<Vec<Self::Element>>;

    async fn element_text(&self, element: &Self::Element) -> PortResult<String>;

    async fn is_displayed(&self, element: &Self::Element) -> PortResult<bool>;

    async fn click_element(&self, element: &Self::Element) -> PortResult<()>;

    /// 提交包含该元素的表单
    async fn submit_form(&self, selector: &str) -> PortResult<()>;
}
