use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// 课程节次编号（CRN）
///
/// 学期内唯一标识一个课程节次的正整数，0 视为非法
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Crn(u32);

impl Crn {
    /// 创建 CRN，0 返回 None
    pub fn new(value: u32) -> Option<Self> {
        (value > 0).then_some(Crn(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Crn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CRN 解析错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("无效的 CRN: '{0}'")]
pub struct ParseCrnError(pub String);

impl FromStr for Crn {
    type Err = ParseCrnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Crn::new)
            .ok_or_else(|| ParseCrnError(s.to_string()))
    }
}

// 配置文件里的 CRN 既可能是数字也可能是字符串
impl<'de> Deserialize<'de> for Crn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};

        struct CrnVisitor;

        impl<'de> Visitor<'de> for CrnVisitor {
            type Value = Crn;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a positive integer or numeric string CRN")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: Error,
            {
                u32::try_from(value)
                    .ok()
                    .and_then(Crn::new)
                    .ok_or_else(|| E::custom(ParseCrnError(value.to_string())))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: Error,
            {
                u32::try_from(value)
                    .ok()
                    .and_then(Crn::new)
                    .ok_or_else(|| E::custom(ParseCrnError(value.to_string())))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(CrnVisitor)
    }
}

/// 工作集：仍在尝试注册的 CRN
///
/// 顺序即用户给定的优先级，除删除外各轮之间保持不变，且不含重复项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    crns: Vec<Crn>,
}

impl WorkingSet {
    pub fn new(crns: impl IntoIterator<Item = Crn>) -> Self {
        let mut set = Self::default();
        for crn in crns {
            if set.contains(crn) {
                warn!("⚠️ CRN {} 重复出现，忽略后面的重复项", crn);
                continue;
            }
            set.crns.push(crn);
        }
        set
    }

    pub fn as_slice(&self) -> &[Crn] {
        &self.crns
    }

    pub fn len(&self) -> usize {
        self.crns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crns.is_empty()
    }

    pub fn contains(&self, crn: Crn) -> bool {
        self.crns.contains(&crn)
    }

    /// 只保留满足条件的 CRN，保持原有顺序
    pub fn retain(&mut self, keep: impl FnMut(&Crn) -> bool) {
        self.crns.retain(keep);
    }

    /// 清空工作集并按顺序返回剩余的 CRN
    pub fn drain(&mut self) -> Vec<Crn> {
        std::mem::take(&mut self.crns)
    }

    pub fn iter(&self) -> impl Iterator<Item = Crn> + '_ {
        self.crns.iter().copied()
    }
}

impl FromIterator<Crn> for WorkingSet {
    fn from_iter<I: IntoIterator<Item = Crn>>(iter: I) -> Self {
        WorkingSet::new(iter)
    }
}

impl fmt::Display for WorkingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.crns.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", items.join(", "))
    }
}
