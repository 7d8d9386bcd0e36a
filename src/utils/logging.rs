use anyhow::{Context, Result};
/// 日志工具模块
///
/// 提供日志文件和统计输出的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::RunSummary;

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
/// - `term`: 本次处理的学期
pub fn init_log_file(log_file_path: &str, term: &str) -> Result<()> {
    let log_header = format!(
        "{}\n讲课监控补录日志 - {} - {}\n{}\n\n",
        "=".repeat(60),
        term,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 讲课监控补录");
    info!("📅 学期: {}", config.term);
    info!("🏫 校区: {}", config.campuses.join(", "));
    info!("⏱ 每行冷却: {} ms", config.cooldown_ms);
    if config.continue_on_error {
        info!("💡 某个校区失败时继续处理下一个校区");
    }
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `summary`: 运行汇总
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(summary: &RunSummary, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    match &summary.aborted {
        Some(cause) => warn!("❌ 运行已终止: {}", cause),
        None => info!("✅ 全部处理完成"),
    }
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    for campus in &summary.campuses {
        info!(
            "🏫 {}: 补录 {} 个班级，{} 页，失败 {} 行",
            campus.campus,
            campus.total_remediated,
            campus.pages_visited,
            campus.failures.len()
        );
    }
    for failure in &summary.failed_campuses {
        warn!("⚠️ {}: 未完成 ({})", failure.campus, failure.cause);
    }
    info!("补录班级总数: {}", summary.total_classes);
    info!("处理校区数: {}", summary.campuses_processed);
    info!("失败行数: {}", summary.failed_rows());
    info!("学期: {}", summary.term);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 将运行汇总以 JSON 追加到日志文件
pub fn append_summary(log_file_path: &str, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    writeln!(file, "{}", json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CampusResult;

    fn temp_log(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("lecture_monitor_{}_{}.txt", name, std::process::id()))
            .to_string_lossy()
            .to_string()
    }

    #[test]
    fn test_log_file_header_then_summary() {
        let path = temp_log("summary");
        init_log_file(&path, "2025, Even Semester").unwrap();

        let mut summary = RunSummary::new("2025, Even Semester");
        let mut campus = CampusResult::new("Binus Kemanggisan", "2025, Even Semester");
        campus.total_remediated = 3;
        summary.add_campus(campus);
        append_summary(&path, &summary).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("讲课监控补录日志 - 2025, Even Semester"));
        let json_start = content.find('{').unwrap();
        let parsed: RunSummary = serde_json::from_str(content[json_start..].trim()).unwrap();
        assert_eq!(parsed, summary);

        let _ = fs::remove_file(&path);
    }
}
