//! 错误分类服务 - 业务能力层
//!
//! 把注册系统返回的错误文本解析为带类型的结果
//!
//! ## 文法
//!
//! ```text
//! <marker> <ordinal> <identifier>: <reason text>
//! ```
//!
//! 例如 `Error 1 12345: Closed Section`。`<ordinal>` 必须存在，否则像
//! `Error 1: Closed Section` 这样的文本会把序号误当成 CRN。
//! 原因文本按前缀查表（大小写不敏感），查不到的归为 `Unknown`。

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::models::{ClassifiedOutcome, Crn, OutcomeCategory, RawOutcome, ReasonRule};

static OUTCOME_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<marker>\S+)\s+(?P<ordinal>\d+)\s+(?P<id>[^\s:]+)\s*:\s*(?P<reason>.*?)\s*$")
        .expect("outcome grammar must compile")
});

/// 原因前缀查找表
#[derive(Debug, Clone)]
pub struct ReasonTable {
    /// (小写且折叠空白后的前缀, 分类)
    rules: Vec<(String, OutcomeCategory)>,
}

impl ReasonTable {
    /// 使用给定规则创建查找表，`Closed Section` 规则总是存在
    pub fn new(rules: impl IntoIterator<Item = ReasonRule>) -> Self {
        let mut table = Self { rules: Vec::new() };
        table.extend(rules);
        if table.lookup("Closed Section") != OutcomeCategory::ClosedSection {
            table.push(ReasonRule::new("Closed Section", OutcomeCategory::ClosedSection));
        }
        table
    }

    /// 追加规则（例如来自个人信息文件）
    pub fn extend(&mut self, rules: impl IntoIterator<Item = ReasonRule>) {
        for rule in rules {
            self.push(rule);
        }
    }

    fn push(&mut self, rule: ReasonRule) {
        let prefix = normalize(&rule.prefix);
        if prefix.is_empty() {
            return;
        }
        self.rules.push((prefix, rule.category));
    }

    /// 按前缀查表
    ///
    /// 多条规则同时匹配时，具体分类优先于 `Unknown`，同等具体程度取最长前缀
    pub fn lookup(&self, reason: &str) -> OutcomeCategory {
        let reason = normalize(reason);
        self.rules
            .iter()
            .filter(|(prefix, _)| reason.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, category)| (category.specificity(), prefix.len()))
            .map(|(_, category)| *category)
            .unwrap_or(OutcomeCategory::Unknown)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ReasonTable {
    fn default() -> Self {
        use OutcomeCategory::*;
        Self::new([
            ReasonRule::new("Closed Section", ClosedSection),
            ReasonRule::new("CRN does not exist", InvalidIdentifier),
            ReasonRule::new("Invalid CRN", InvalidIdentifier),
            ReasonRule::new("Course not offered", InvalidIdentifier),
            ReasonRule::new("Not available for registration", InvalidIdentifier),
            ReasonRule::new("Duplicate CRN", DuplicateRequest),
            ReasonRule::new("Already registered", DuplicateRequest),
            ReasonRule::new("You are already registered", DuplicateRequest),
        ])
    }
}

/// 错误分类器
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    table: ReasonTable,
}

impl ErrorClassifier {
    pub fn new(table: ReasonTable) -> Self {
        Self { table }
    }

    /// 默认规则加上额外规则
    pub fn with_extra_rules(rules: impl IntoIterator<Item = ReasonRule>) -> Self {
        let mut table = ReasonTable::default();
        table.extend(rules);
        Self::new(table)
    }

    /// 分类一条错误文本，永不失败
    ///
    /// 文本不符合文法或 CRN 无法解析时返回 `identifier = None` 的 `Unknown`
    pub fn classify(&self, raw: &RawOutcome) -> ClassifiedOutcome {
        let message = raw.as_str().trim().to_string();

        let Some((crn, reason)) = parse(raw.as_str()) else {
            debug!("错误文本无法对应到 CRN: {:?}", message);
            return ClassifiedOutcome::new(None, OutcomeCategory::Unknown, message);
        };

        let reason =
            reason.trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
        let category = self.table.lookup(reason);

        debug!("CRN {} -> {} ({:?})", crn, category, reason);
        ClassifiedOutcome::new(Some(crn), category, message)
    }

    pub fn classify_all(&self, raws: &[RawOutcome]) -> Vec<ClassifiedOutcome> {
        raws.iter().map(|raw| self.classify(raw)).collect()
    }
}

/// 错误文本中的 CRN，不符合文法或无法解析时返回 None
///
/// 与 `ErrorClassifier::classify` 使用同一文法，不查原因表
pub fn outcome_crn(raw: &RawOutcome) -> Option<Crn> {
    parse(raw.as_str()).map(|(crn, _)| crn)
}

fn parse(text: &str) -> Option<(Crn, &str)> {
    let caps = OUTCOME_GRAMMAR.captures(text)?;
    let crn = caps.name("id")?.as_str().parse::<Crn>().ok()?;
    let reason = caps.name("reason").map_or("", |m| m.as_str());
    Some((crn, reason))
}

/// 小写并折叠连续空白
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> ClassifiedOutcome {
        ErrorClassifier::default().classify(&RawOutcome::from(text))
    }

    fn crn(v: u32) -> Option<Crn> {
        Crn::new(v)
    }

    #[test]
    fn test_closed_section() {
        let outcome = classify("Error 1 12345: Closed Section");
        assert_eq!(outcome.identifier, crn(12345));
        assert_eq!(outcome.category, OutcomeCategory::ClosedSection);
        assert_eq!(outcome.message, "Error 1 12345: Closed Section");
    }

    #[test]
    fn test_invalid_identifier() {
        let outcome = classify("Error 2 99999: CRN does not exist");
        assert_eq!(outcome.identifier, crn(99999));
        assert_eq!(outcome.category, OutcomeCategory::InvalidIdentifier);
    }

    #[test]
    fn test_unrecognized_reason_is_unknown_with_identifier() {
        let outcome = classify("Error 3 55555: Banner is feeling moody");
        assert_eq!(outcome.identifier, crn(55555));
        assert_eq!(outcome.category, OutcomeCategory::Unknown);
    }

    #[test]
    fn test_tolerates_whitespace_and_punctuation() {
        let outcome = classify("   Error   4   31415 :   closed   SECTION!!.  ");
        assert_eq!(outcome.identifier, crn(31415));
        assert_eq!(outcome.category, OutcomeCategory::ClosedSection);

        let outcome = classify("Error 5 27182:Duplicate CRN.");
        assert_eq!(outcome.category, OutcomeCategory::DuplicateRequest);
    }

    #[test]
    fn test_missing_ordinal_is_unattributed() {
        for text in [
            "Error 1: Closed Section",
            "Error 12345: Closed Section - 0 seats remain",
        ] {
            let outcome = classify(text);
            assert_eq!(outcome.identifier, None, "{text:?}");
            assert_eq!(outcome.category, OutcomeCategory::Unknown, "{text:?}");
            assert_eq!(outcome.message, text);
        }
    }

    #[test]
    fn test_outcome_crn_matches_classify() {
        assert_eq!(
            outcome_crn(&"Error 2 11111: Closed Section - 0 seats remain".into()),
            crn(11111)
        );
        assert_eq!(outcome_crn(&"Error 1: Closed Section".into()), None);
        assert_eq!(outcome_crn(&"Registration updated".into()), None);
    }

    #[test]
    fn test_unparseable_identifier_drops_binding() {
        for text in [
            "Error 1 ABCDE: Closed Section",
            "Error 1 0: Closed Section",
            "Error 1 99999999999: Closed Section",
            "something went wrong",
            "",
        ] {
            let outcome = classify(text);
            assert_eq!(outcome.identifier, None, "{text:?}");
            assert_eq!(outcome.category, OutcomeCategory::Unknown, "{text:?}");
        }
    }

    #[test]
    fn test_specific_rule_beats_unknown_and_longest_prefix_wins() {
        let table = ReasonTable::new([
            ReasonRule::new("Closed", OutcomeCategory::Unknown),
            ReasonRule::new("Closed Section", OutcomeCategory::ClosedSection),
            ReasonRule::new("Closed Section - Waitlist", OutcomeCategory::InvalidIdentifier),
        ]);
        assert_eq!(table.lookup("Closed Section"), OutcomeCategory::ClosedSection);
        assert_eq!(
            table.lookup("Closed Section - Waitlist full"),
            OutcomeCategory::InvalidIdentifier
        );
        assert_eq!(table.lookup("Closed for the day"), OutcomeCategory::Unknown);
    }

    #[test]
    fn test_closed_section_rule_always_present() {
        let table = ReasonTable::new(Vec::new());
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("Closed Section"), OutcomeCategory::ClosedSection);
    }

    #[test]
    fn test_extra_rules_from_profile() {
        let classifier = ErrorClassifier::with_extra_rules([ReasonRule::new(
            "Time Conflict",
            OutcomeCategory::InvalidIdentifier,
        )]);
        let outcome = classifier.classify(&"Error 1 11111: Time conflict with CRN 22222".into());
        assert_eq!(outcome.category, OutcomeCategory::InvalidIdentifier);
    }

    #[test]
    fn test_every_default_rule_round_trips_through_grammar() {
        let table = ReasonTable::default();
        let classifier = ErrorClassifier::new(table.clone());
        for (prefix, category) in &table.rules {
            let outcome = classifier.classify(&RawOutcome::new(format!("Error 1 10101: {prefix}")));
            assert_eq!(outcome.category, *category, "{prefix}");
        }
    }
}
