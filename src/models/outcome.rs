use serde::{Deserialize, Serialize};
use std::fmt;

use super::crn::Crn;

/// 注册系统返回的原始错误文本（每条描述一个问题）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawOutcome(String);

impl RawOutcome {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RawOutcome {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for RawOutcome {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for RawOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 结果分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeCategory {
    /// 注册成功（没有任何错误文本）
    Success,
    /// 名额已满，可重试
    ClosedSection,
    /// CRN 不存在或本学期未开设
    InvalidIdentifier,
    /// 已经注册过
    DuplicateRequest,
    /// 无法识别的原因
    Unknown,
}

impl OutcomeCategory {
    /// 具体程度，用于同一 CRN 多条结果时的取舍
    pub fn specificity(self) -> u8 {
        match self {
            OutcomeCategory::Unknown => 0,
            OutcomeCategory::Success => 1,
            OutcomeCategory::ClosedSection
            | OutcomeCategory::InvalidIdentifier
            | OutcomeCategory::DuplicateRequest => 2,
        }
    }

    /// 本轮出现该结果后 CRN 是否还留在工作集中
    pub fn is_retryable(self) -> bool {
        self == OutcomeCategory::ClosedSection
    }
}

impl fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutcomeCategory::Success => "Success",
            OutcomeCategory::ClosedSection => "ClosedSection",
            OutcomeCategory::InvalidIdentifier => "InvalidIdentifier",
            OutcomeCategory::DuplicateRequest => "DuplicateRequest",
            OutcomeCategory::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// 分类后的结果
///
/// `identifier` 为 None 表示错误文本里的 CRN 无法解析，需要人工查看
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedOutcome {
    pub identifier: Option<Crn>,
    pub category: OutcomeCategory,
    pub message: String,
}

impl ClassifiedOutcome {
    pub fn new(identifier: Option<Crn>, category: OutcomeCategory, message: impl Into<String>) -> Self {
        Self {
            identifier,
            category,
            message: message.into(),
        }
    }
}

/// 原因前缀到分类的映射规则
///
/// 前缀与原因文本开头做大小写不敏感匹配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonRule {
    pub prefix: String,
    pub category: OutcomeCategory,
}

impl ReasonRule {
    pub fn new(prefix: impl Into<String>, category: OutcomeCategory) -> Self {
        Self {
            prefix: prefix.into(),
            category,
        }
    }
}
