use serde::Deserialize;
use std::fmt;

use super::crn::{Crn, WorkingSet};
use super::outcome::ReasonRule;
use crate::config::Selectors;

/// 登录凭据
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub netid: String,
    pub password: String,
}

// 不在日志中输出密码
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("netid", &self.netid)
            .field("password", &"******")
            .finish()
    }
}

/// 课程条目：可以只写 CRN，也可以带上课程信息
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClassEntry {
    Crn(Crn),
    Detailed {
        #[serde(rename = "CRN", alias = "crn")]
        crn: Crn,
        #[serde(rename = "Subject", alias = "subject", default)]
        subject: Option<String>,
        #[serde(rename = "Number", alias = "number", default)]
        number: Option<NumberField>,
    },
}

/// 课程编号（如 `225` 或 `"225"`）
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberField {
    Int(u32),
    Text(String),
}

impl fmt::Display for NumberField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberField::Int(n) => write!(f, "{}", n),
            NumberField::Text(s) => f.write_str(s),
        }
    }
}

impl ClassEntry {
    pub fn crn(&self) -> Crn {
        match self {
            ClassEntry::Crn(crn) => *crn,
            ClassEntry::Detailed { crn, .. } => *crn,
        }
    }

    /// 用于日志的课程名，如 `CS 225`
    pub fn label(&self) -> Option<String> {
        match self {
            ClassEntry::Detailed {
                subject: Some(subject),
                number: Some(number),
                ..
            } => Some(format!("{} {}", subject, number)),
            ClassEntry::Detailed {
                subject: Some(subject),
                ..
            } => Some(subject.clone()),
            _ => None,
        }
    }
}

/// 个人信息文件（personal_info.json / .toml）
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub classes: Vec<ClassEntry>,
    /// 追加到默认原因表之后的规则
    #[serde(default)]
    pub reasons: Vec<ReasonRule>,
    #[serde(default)]
    pub selectors: Selectors,
}

impl Profile {
    /// 按文件中的顺序构建初始工作集
    pub fn working_set(&self) -> WorkingSet {
        self.classes.iter().map(ClassEntry::crn).collect()
    }
}
