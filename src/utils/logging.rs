use anyhow::Result;
/// 日志工具模块
///
/// 提供每轮输出和最终报告的格式化
use std::fs::OpenOptions;
use std::io::Write;
use std::borrow::Borrow;
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::{BrowserMode, Config};
use crate::models::{Crn, RoundSummary, RunStatus, TerminalReport, WorkingSet};

/// 在复查文件中追加本次运行的标题
///
/// # 参数
/// - `review_file_path`: 复查文件路径
pub fn init_review_file(review_file_path: &Path) -> Result<()> {
    let header = format!(
        "{}\n抢课复查日志 - {}\n{}\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(review_file_path)?;
    file.write_all(header.as_bytes())?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 抢课模式");
    match &config.browser {
        BrowserMode::Connect { port } => info!("🌐 浏览器: 连接调试端口 {}", port),
        BrowserMode::Launch { headless, .. } => {
            info!("🌐 浏览器: 自行启动 (无头: {})", headless)
        }
    }
    info!(
        "⏱️ 重试间隔: {:?} ({:?}, 上限 {:?})",
        config.retry.interval, config.retry.backoff, config.retry.max_interval
    );
    match config.max_rounds {
        Some(max) => info!("🔁 最大轮数: {}", max),
        None => info!("🔁 最大轮数: 不限"),
    }
    info!("{}", "=".repeat(60));
}

/// 记录一轮开始
///
/// # 参数
/// - `round`: 轮次（从 1 开始）
/// - `working`: 本轮提交的工作集
pub fn log_round_start(round: usize, working: &WorkingSet) {
    info!("\n{}", "─".repeat(60));
    info!("📦 第 {} 轮: 提交 {} 个 CRN {}", round, working.len(), working);
}

/// 记录一轮结果：成功、移除（含原因）、仍在等待
pub fn log_round_summary(summary: &RoundSummary, remaining: &WorkingSet) {
    if !summary.succeeded.is_empty() {
        info!(
            "✅ 第 {} 轮成功: {}",
            summary.round,
            join_crns(&summary.succeeded)
        );
    }
    for entry in &summary.dropped {
        info!(
            "🗑️ 移除 CRN {} ({}): {}",
            entry.identifier,
            entry.reason,
            truncate_text(&entry.message, 80)
        );
    }
    for message in &summary.unattributed {
        warn!("⚠️ 无法对应到 CRN 的错误: {}", truncate_text(message, 80));
    }
    if remaining.is_empty() {
        info!("✓ 第 {} 轮后没有待处理的 CRN", summary.round);
    } else {
        info!("⏳ 仍在等待名额: {}", remaining);
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终报告
pub fn print_final_report(report: &TerminalReport) {
    info!("\n{}", "=".repeat(60));
    info!("📊 运行结束统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    match &report.status {
        RunStatus::Completed => info!("状态: 全部处理完成 ({} 轮)", report.rounds),
        RunStatus::Cancelled => warn!("状态: 已取消 ({} 轮)", report.rounds),
        RunStatus::RoundsExhausted => warn!("状态: 达到最大轮数 ({} 轮)", report.rounds),
        RunStatus::Aborted(reason) => error!("状态: 已中止 ({} 轮): {}", report.rounds, reason),
    }
    info!("✅ 成功: {}", join_crns(report.succeeded.iter().copied()));
    info!(
        "🔒 满员未抢到: {}",
        join_crns(report.closed_retry_exhausted.iter().copied())
    );
    info!("🗑️ 移除: {}", report.dropped.len());
    for entry in &report.dropped {
        info!("   CRN {} - {} ({})", entry.identifier, entry.reason, entry.message);
    }
    info!("⏳ 未处理: {}", join_crns(report.pending.iter().copied()));
    if !report.unattributed.is_empty() {
        warn!("⚠️ 需人工查看: {} 条", report.unattributed.len());
        for message in &report.unattributed {
            warn!("   {}", message);
        }
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

fn join_crns<I, C>(crns: I) -> String
where
    I: IntoIterator<Item = C>,
    C: Borrow<Crn>,
{
    let items: Vec<String> = crns
        .into_iter()
        .map(|c| c.borrow().to_string())
        .collect();
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
