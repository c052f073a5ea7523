//! 提交驱动契约
//!
//! 重试控制器只通过这个 trait 驱动注册会话

use async_trait::async_trait;

use crate::error::SnipeResult;
use crate::models::{Crn, RawOutcome};

#[async_trait]
pub trait SubmissionDriver: Send {
    /// 会话是否认为自己停在 CRN 表单
    fn is_at_submission_form(&self) -> bool;

    /// 确保停在 CRN 表单，已在表单时不做任何事
    async fn ensure_on_submission_page(&mut self) -> SnipeResult<()>;

    /// 提交一批 CRN，返回所有原始错误文本
    async fn submit_batch(&mut self, crns: &[Crn]) -> SnipeResult<Vec<RawOutcome>>;

    /// 丢弃当前页面状态，下次 `ensure_on_submission_page` 从头驱动
    fn invalidate(&mut self);

    /// 最近一次 `submit_batch` 中已经点击最终提交、但结果没能读取的 CRN
    fn unconfirmed(&self) -> Vec<Crn>;
}
