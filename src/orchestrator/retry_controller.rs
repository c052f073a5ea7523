//! 重试控制器 - 编排层
//!
//! ## 职责
//!
//! 持有工作集，反复执行"提交 → 分类 → 更新工作集"，直到工作集清空、
//! 被取消、达到最大轮数或遇到致命错误。
//!
//! ## 每轮规则
//!
//! - `InvalidIdentifier` / `DuplicateRequest` / 有 CRN 的 `Unknown` → 永久移除
//! - `ClosedSection` → 保留到下一轮
//! - 没有任何错误文本的 CRN → 视为成功
//!
//! ## 恢复
//!
//! 自动化层错误会让会话失效并立即重做本轮，每轮最多 `max_recovery_attempts` 次；
//! 登录失败直接中止。

use std::collections::{BTreeSet, HashMap};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, RetryPolicy};
use crate::error::{SnipeError, SnipeResult};
use crate::models::{
    ClassifiedOutcome, Crn, DroppedEntry, OutcomeCategory, RawOutcome, RoundSummary, RunStatus,
    TerminalReport, WorkingSet,
};
use crate::services::{ErrorClassifier, ReviewWriter};
use crate::utils::logging::{log_round_start, log_round_summary};
use crate::workflow::SubmissionDriver;

/// 控制器参数
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub retry: RetryPolicy,
    pub max_rounds: Option<usize>,
    pub max_recovery_attempts: usize,
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            retry: config.retry,
            max_rounds: config.max_rounds,
            max_recovery_attempts: config.max_recovery_attempts,
        }
    }
}

/// 一轮提交失败的原因
#[derive(Debug, thiserror::Error)]
enum RoundFailure {
    #[error("{0}")]
    Fatal(SnipeError),
    #[error("恢复 {attempts} 次后仍然失败: {last}")]
    RecoveryExhausted { attempts: usize, last: SnipeError },
    #[error("恢复过程中收到取消信号")]
    Cancelled,
}

/// 重试控制器
pub struct RetryController<D: SubmissionDriver> {
    driver: D,
    classifier: ErrorClassifier,
    review_writer: Option<ReviewWriter>,
    settings: ControllerSettings,
    cancel: CancellationToken,
    /// 中断前已经最终提交、结果未知的 CRN
    unconfirmed: BTreeSet<Crn>,
}

impl<D: SubmissionDriver> RetryController<D> {
    pub fn new(
        driver: D,
        classifier: ErrorClassifier,
        settings: ControllerSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            driver,
            classifier,
            review_writer: None,
            settings,
            cancel,
            unconfirmed: BTreeSet::new(),
        }
    }

    /// 把需要人工查看的结果写入文件
    pub fn with_review_writer(mut self, writer: ReviewWriter) -> Self {
        self.review_writer = Some(writer);
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// 运行直到结束，返回最终报告
    pub async fn run(&mut self, initial: WorkingSet) -> TerminalReport {
        let mut working = initial;
        let mut report = TerminalReport::new();

        loop {
            if working.is_empty() {
                return finish(report, &mut working, RunStatus::Completed);
            }
            if self.cancel.is_cancelled() {
                warn!("🛑 收到取消信号，停止抢课");
                return finish(report, &mut working, RunStatus::Cancelled);
            }

            let round = report.rounds + 1;
            log_round_start(round, &working);

            let raws = match self.submit_round(&working).await {
                Ok(raws) => raws,
                Err(RoundFailure::Cancelled) => {
                    warn!("🛑 收到取消信号，停止抢课");
                    return finish(report, &mut working, RunStatus::Cancelled);
                }
                Err(failure) => {
                    error!("❌ 第 {} 轮失败，中止运行: {}", round, failure);
                    return finish(report, &mut working, RunStatus::Aborted(failure.to_string()));
                }
            };

            report.rounds = round;
            let summary = self.apply_outcomes(round, &mut working, &raws, &mut report);
            log_round_summary(&summary, &working);

            if working.is_empty() {
                return finish(report, &mut working, RunStatus::Completed);
            }

            if self.settings.max_rounds.is_some_and(|max| round >= max) {
                warn!("🔁 已达到最大轮数 {}，停止重试", round);
                report.closed_retry_exhausted.extend(working.drain());
                return finish(report, &mut working, RunStatus::RoundsExhausted);
            }

            let delay = self.settings.retry.delay_after(round);
            info!(
                "⏳ {} 个 CRN 满员，{:?} 后开始第 {} 轮",
                working.len(),
                delay,
                round + 1
            );
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    warn!("🛑 等待期间收到取消信号，停止抢课");
                    return finish(report, &mut working, RunStatus::Cancelled);
                }
                _ = sleep(delay) => {}
            }
        }
    }

    /// 提交一轮，自动化层错误时重新驱动会话
    async fn submit_round(&mut self, working: &WorkingSet) -> Result<Vec<RawOutcome>, RoundFailure> {
        let mut attempts = 0;
        loop {
            match self.try_submit(working).await {
                Ok(raws) => {
                    return Ok(raws);
                }
                Err(e) => {
                    self.unconfirmed.extend(self.driver.unconfirmed());

                    if !e.is_recoverable() {
                        return Err(RoundFailure::Fatal(e));
                    }
                    if attempts >= self.settings.max_recovery_attempts {
                        return Err(RoundFailure::RecoveryExhausted { attempts, last: e });
                    }
                    if self.cancel.is_cancelled() {
                        return Err(RoundFailure::Cancelled);
                    }

                    attempts += 1;
                    warn!(
                        "⚠️ 自动化步骤失败 ({}/{})，重新进入注册页面: {}",
                        attempts, self.settings.max_recovery_attempts, e
                    );
                    self.driver.invalidate();
                }
            }
        }
    }

    async fn try_submit(&mut self, working: &WorkingSet) -> SnipeResult<Vec<RawOutcome>> {
        if !self.driver.is_at_submission_form() {
            self.driver.ensure_on_submission_page().await?;
        }
        self.driver.submit_batch(working.as_slice()).await
    }

    /// 分类本轮结果并更新工作集
    fn apply_outcomes(
        &mut self,
        round: usize,
        working: &mut WorkingSet,
        raws: &[RawOutcome],
        report: &mut TerminalReport,
    ) -> RoundSummary {
        let mut summary = RoundSummary {
            round,
            ..Default::default()
        };

        // 每个 CRN 只保留一条结果，具体分类优先
        let mut by_crn: HashMap<Crn, ClassifiedOutcome> = HashMap::new();
        for outcome in self.classifier.classify_all(raws) {
            let Some(crn) = outcome.identifier else {
                warn!("⚠️ 无法识别 CRN，需要人工查看: {}", outcome.message);
                self.write_review(round, &outcome);
                summary.unattributed.push(outcome.message.clone());
                report.unattributed.push(outcome.message);
                continue;
            };
            if !working.contains(crn) {
                warn!("⚠️ 错误文本中的 CRN {} 不在工作集中，忽略: {}", crn, outcome.message);
                continue;
            }
            match by_crn.get(&crn) {
                Some(existing)
                    if existing.category.specificity() >= outcome.category.specificity() => {}
                _ => {
                    by_crn.insert(crn, outcome);
                }
            }
        }

        let unconfirmed = std::mem::take(&mut self.unconfirmed);
        let mut to_review = Vec::new();

        working.retain(|crn| {
            let Some(outcome) = by_crn.get(crn) else {
                summary.succeeded.push(*crn);
                return false;
            };

            match outcome.category {
                OutcomeCategory::ClosedSection => {
                    summary.closed.push(*crn);
                    true
                }
                OutcomeCategory::Success => {
                    summary.succeeded.push(*crn);
                    false
                }
                OutcomeCategory::DuplicateRequest if unconfirmed.contains(crn) => {
                    info!("✓ CRN {} 在中断的一轮中已经注册成功", crn);
                    summary.succeeded.push(*crn);
                    false
                }
                category => {
                    if category == OutcomeCategory::Unknown {
                        warn!("⚠️ CRN {} 原因无法识别，已移除，请人工查看: {}", crn, outcome.message);
                        to_review.push(outcome.clone());
                    }
                    summary.dropped.push(DroppedEntry {
                        identifier: *crn,
                        reason: category,
                        message: outcome.message.clone(),
                    });
                    false
                }
            }
        });

        for outcome in &to_review {
            self.write_review(round, outcome);
        }

        report.succeeded.extend(summary.succeeded.iter().copied());
        report.dropped.extend(summary.dropped.iter().cloned());
        summary
    }

    fn write_review(&self, round: usize, outcome: &ClassifiedOutcome) {
        if let Some(writer) = &self.review_writer {
            if let Err(e) = writer.write(round, outcome) {
                warn!("⚠️ 写入复查文件失败 ({}): {}", writer.path().display(), e);
            }
        }
    }
}

fn finish(mut report: TerminalReport, working: &mut WorkingSet, status: RunStatus) -> TerminalReport {
    report.pending = working.drain();
    report.status = status;
    report
}
