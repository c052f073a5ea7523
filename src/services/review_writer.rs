//! 人工复查写入服务 - 业务能力层
//!
//! 只负责"把需要人工查看的错误文本写入文件"，不关心流程

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::ClassifiedOutcome;

/// 人工复查写入服务
///
/// 无法识别的原因可能意味着原因表缺了一条规则，写下来方便之后补充
pub struct ReviewWriter {
    review_file_path: PathBuf,
}

impl ReviewWriter {
    pub fn new() -> Self {
        Self::with_path("review.txt")
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            review_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.review_file_path
    }

    /// 追加一条需要复查的结果
    pub fn write(&self, round: usize, outcome: &ClassifiedOutcome) -> Result<()> {
        let crn = outcome
            .identifier
            .map(|crn| crn.to_string())
            .unwrap_or_else(|| "?".to_string());

        debug!("写入复查文件: 第 {} 轮 | CRN {} | {}", round, crn, outcome.message);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.review_file_path)?;

        let line = format!(
            "[{}] 第 {} 轮 | CRN {} | {} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            round,
            crn,
            outcome.category,
            outcome.message
        );

        file.write_all(line.as_bytes())?;

        Ok(())
    }
}

impl Default for ReviewWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Crn, OutcomeCategory};

    #[test]
    fn test_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReviewWriter::with_path(dir.path().join("review.txt"));

        let moody = ClassifiedOutcome::new(
            Crn::new(55555),
            OutcomeCategory::Unknown,
            "Error 3 55555: Banner is feeling moody",
        );
        let garbled = ClassifiedOutcome::new(None, OutcomeCategory::Unknown, "???");

        writer.write(1, &moody).unwrap();
        writer.write(2, &garbled).unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("CRN 55555 | Unknown | Error 3 55555: Banner is feeling moody"));
        assert!(lines[1].contains("第 2 轮 | CRN ? | Unknown | ???"));
    }
}
