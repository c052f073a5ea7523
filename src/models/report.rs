use serde::Serialize;
use std::collections::BTreeSet;

use super::crn::Crn;
use super::outcome::OutcomeCategory;

/// 运行结束状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason")]
pub enum RunStatus {
    /// 工作集已清空
    Completed,
    /// 用户取消（Ctrl-C）
    Cancelled,
    /// 达到最大轮数
    RoundsExhausted,
    /// 致命错误中止（登录失败或恢复次数用尽）
    Aborted(String),
}

/// 被永久移除的 CRN
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedEntry {
    pub identifier: Crn,
    pub reason: OutcomeCategory,
    pub message: String,
}

/// 最终报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalReport {
    pub status: RunStatus,
    /// 已完成的轮数
    pub rounds: usize,
    pub succeeded: BTreeSet<Crn>,
    /// 达到最大轮数时仍然满员的 CRN
    pub closed_retry_exhausted: BTreeSet<Crn>,
    pub dropped: Vec<DroppedEntry>,
    /// 中止或取消时仍未处理完的 CRN（按优先级顺序）
    pub pending: Vec<Crn>,
    /// 无法对应到 CRN 的原始错误文本
    pub unattributed: Vec<String>,
}

impl TerminalReport {
    pub fn new() -> Self {
        Self {
            status: RunStatus::Completed,
            rounds: 0,
            succeeded: BTreeSet::new(),
            closed_retry_exhausted: BTreeSet::new(),
            dropped: Vec::new(),
            pending: Vec::new(),
            unattributed: Vec::new(),
        }
    }

    /// 运行是否因致命错误中止
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted(_))
    }

    pub fn dropped_ids(&self) -> Vec<Crn> {
        self.dropped.iter().map(|d| d.identifier).collect()
    }
}

impl Default for TerminalReport {
    fn default() -> Self {
        Self::new()
    }
}

/// 单轮处理结果（用于每轮输出）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub round: usize,
    pub succeeded: Vec<Crn>,
    pub dropped: Vec<DroppedEntry>,
    /// 满员，留待下一轮
    pub closed: Vec<Crn>,
    pub unattributed: Vec<String>,
}
