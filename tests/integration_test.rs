use std::time::Duration;

use lecture_monitor::config::Config;
use lecture_monitor::infrastructure::{cancel_pair, CancelSignal, FakeDriver};
use lecture_monitor::logger;
use lecture_monitor::services::Paginator;
use lecture_monitor::utils::logging;
use lecture_monitor::{
    run_campuses, AppError, CampusProcessor, RemediationExecutor, RunPlan, RunReport,
};
use tokio_test::assert_ok;

const TERM: &str = "2025, Even Semester";
const KEMANGGISAN: &str = "Binus Kemanggisan";
const ALAM_SUTERA: &str = "Binus Alam Sutera";

fn processor() -> CampusProcessor {
    CampusProcessor::from_parts(
        RemediationExecutor::with_cooldown(Duration::ZERO),
        Paginator::with_timing(Duration::from_millis(200), Duration::from_millis(20)),
        Duration::ZERO,
    )
}

fn plan(continue_on_error: bool) -> RunPlan {
    RunPlan {
        term: TERM.to_string(),
        campuses: vec![KEMANGGISAN.to_string(), ALAM_SUTERA.to_string()],
        continue_on_error,
    }
}

async fn run(driver: &FakeDriver, continue_on_error: bool) -> RunReport {
    let plan = plan(continue_on_error);
    run_campuses(driver, &processor(), &plan, &CancelSignal::never()).await
}

#[tokio::test]
async fn test_two_campuses_sum_into_summary() {
    let driver = FakeDriver::new()
        .with_campus(KEMANGGISAN, vec![vec!["100.00%", "12.00%", "", "50.00%"]])
        .with_campus(ALAM_SUTERA, vec![vec!["100.00%"; 3]]);

    let report = run(&driver, false).await;
    assert!(report.is_complete());
    let summary = report.summary;

    assert_eq!(summary.total_classes, 3);
    assert_eq!(summary.campuses_processed, 2);
    assert_eq!(summary.campuses[0].campus, KEMANGGISAN);
    assert_eq!(summary.campuses[0].total_remediated, 3);
    assert_eq!(summary.campuses[1].total_remediated, 0);
    assert!(summary.failed_campuses.is_empty());
}

#[tokio::test]
async fn test_executor_runs_once_per_incomplete_row_across_pages() {
    let mut first = vec!["100.00%"; 10];
    first[4] = "0.00%";
    first[9] = "";
    let driver = FakeDriver::new()
        .with_campus(KEMANGGISAN, vec![first, vec!["100.00%", "33.33%"]])
        .with_campus(ALAM_SUTERA, vec![vec!["100.00%"]]);

    let report = run(&driver, false).await;
    assert!(report.is_complete());
    let summary = report.summary;

    let opened: Vec<(String, usize, usize)> = driver.opened_rows();
    assert_eq!(
        opened,
        vec![
            (KEMANGGISAN.to_string(), 1, 4),
            (KEMANGGISAN.to_string(), 1, 9),
            (KEMANGGISAN.to_string(), 2, 1),
        ]
    );
    assert_eq!(summary.campuses[0].pages_visited, 2);
    assert_eq!(summary.total_classes, 3);
}

#[tokio::test]
async fn test_filter_failure_skips_campus_when_continuing() {
    let driver = FakeDriver::new()
        .with_campus(KEMANGGISAN, vec![vec!["5.00%"]])
        .fail_filter(KEMANGGISAN)
        .with_campus(ALAM_SUTERA, vec![vec!["5.00%", "100.00%"]]);

    let report = run(&driver, true).await;
    assert!(report.is_complete());
    let summary = report.summary;

    assert_eq!(summary.campuses_processed, 1);
    assert_eq!(summary.total_classes, 1);
    assert_eq!(summary.failed_campuses.len(), 1);
    assert_eq!(summary.failed_campuses[0].campus, KEMANGGISAN);
}

#[tokio::test]
async fn test_filter_failure_aborts_by_default() {
    let driver = FakeDriver::new()
        .with_campus(KEMANGGISAN, vec![vec!["5.00%"]])
        .fail_filter(KEMANGGISAN)
        .with_campus(ALAM_SUTERA, vec![vec!["5.00%"]]);

    let report = run(&driver, false).await;

    assert!(matches!(report.aborted, Some(AppError::FilterApplication { .. })));
    assert!(driver.opened_rows().is_empty());
    assert_eq!(report.summary.campuses_processed, 0);
}

#[tokio::test]
async fn test_abort_still_reports_finished_campuses() {
    let driver = FakeDriver::new()
        .with_campus(KEMANGGISAN, vec![vec!["1.00%", "2.00%", "100.00%", ""]])
        .with_campus(ALAM_SUTERA, vec![vec!["5.00%"]])
        .fail_filter(ALAM_SUTERA);

    let report = run(&driver, false).await;

    assert!(matches!(report.aborted, Some(AppError::FilterApplication { .. })));
    let summary = report.summary;
    assert_eq!(summary.total_classes, 3);
    assert_eq!(summary.campuses_processed, 1);
    assert_eq!(summary.campuses[0].campus, KEMANGGISAN);
    assert_eq!(summary.campuses[0].total_remediated, 3);
    assert_eq!(summary.failed_campuses[0].campus, ALAM_SUTERA);
    assert!(summary.aborted.is_some());
}

#[tokio::test]
async fn test_aborted_run_summary_is_written_to_log() {
    let driver = FakeDriver::new()
        .with_campus(KEMANGGISAN, vec![vec!["1.00%", "2.00%", "3.00%"]])
        .with_campus(ALAM_SUTERA, vec![vec!["5.00%"]])
        .fail_filter(ALAM_SUTERA);
    let report = run(&driver, false).await;

    let path = std::env::temp_dir()
        .join(format!("lecture_monitor_abort_{}.txt", std::process::id()))
        .to_string_lossy()
        .to_string();
    assert_ok!(logging::init_log_file(&path, TERM));
    assert_ok!(logging::append_summary(&path, &report.summary));

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"total_classes\": 3"));
    assert!(content.contains("筛选失败"));
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_session_loss_aborts_even_when_continuing() {
    let driver = FakeDriver::new()
        .with_campus(KEMANGGISAN, vec![vec!["5.00%", "6.00%"]])
        .lose_session_at(KEMANGGISAN, 1, 1)
        .with_campus(ALAM_SUTERA, vec![vec!["5.00%"]]);

    let report = run(&driver, true).await;

    assert!(matches!(report.aborted, Some(AppError::Session(_))));
    assert_eq!(driver.opened_rows().len(), 1);
    // 会话失效前已保存的一行仍然计入
    assert_eq!(report.summary.total_classes, 1);
    assert_eq!(report.summary.campuses[0].campus, KEMANGGISAN);
}

#[tokio::test]
async fn test_cancel_before_run_stops_immediately() {
    let driver = FakeDriver::new()
        .with_campus(KEMANGGISAN, vec![vec!["5.00%"]])
        .with_campus(ALAM_SUTERA, vec![vec!["5.00%"]]);
    let (handle, signal) = cancel_pair();
    handle.cancel();

    let report = run_campuses(&driver, &processor(), &plan(true), &signal).await;

    assert!(matches!(report.aborted, Some(AppError::Cancelled)));
    assert!(driver.opened_rows().is_empty());
}

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env();

    let (_browser, page, _handle) = lecture_monitor::browser::connect_to_browser(
        config.browser_debug_port,
        &config.app_host(),
    )
    .await
    .expect("连接浏览器失败");

    let url = page.url().await.expect("读取页面地址失败");
    println!("当前页面: {:?}", url);
}
