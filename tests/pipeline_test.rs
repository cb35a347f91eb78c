//! 完整流程集成测试（Mock 浏览器，无需 Chrome）

use chrono::NaiveDate;
use research_bee::browser::{MockBrowser, MockResponse};
use research_bee::config::{AppConfig, TimeoutsSection};
use research_bee::outline::SectionTitle;
use research_bee::{run_research, RunOutcome};
use tempfile::TempDir;

const SOURDOUGH_OUTLINE: &str = "\
Sure! Here is a detailed outline.

## Introduction: What makes sourdough special
Wild yeast and lactobacilli.
---
## Step 1: Feed the starter
Equal parts flour and water.
---
## Step 2: Bulk fermentation
Stretch and fold every 30 minutes.
---
## Conclusion: Bake and enjoy
Let it cool before slicing.
---
";

fn config_in(dir: &TempDir) -> AppConfig {
    let mut cfg = AppConfig {
        timeouts: TimeoutsSection::default().without_settle_delays(),
        ..AppConfig::default()
    };
    cfg.app.research_dir = dir.path().join("article_research");
    cfg
}

fn started_at() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 30, 0)
        .unwrap()
}

#[tokio::test]
async fn test_sourdough_run_with_one_timed_out_section() {
    let dir = TempDir::new().unwrap();
    let cfg = config_in(&dir);
    let browser = MockBrowser::new(|prompt| {
        if prompt.starts_with("Topic: ") {
            MockResponse::Text(SOURDOUGH_OUTLINE.to_string())
        } else if prompt.contains("'Step 2'") {
            MockResponse::Timeout
        } else {
            let title = prompt.split('\'').nth(1).unwrap_or("?");
            MockResponse::Text(format!("Findings about {}.", title))
        }
    });

    let report = run_research(&browser, "Sourdough Bread", &cfg, started_at())
        .await
        .unwrap();

    let name = report.output_path.file_name().unwrap().to_string_lossy().to_string();
    assert_eq!(name, "article_research_Sourdough_Bread_20240501_123000.txt");

    match &report.outcome {
        RunOutcome::Completed(summary) => {
            assert_eq!(summary.total(), 4);
            assert_eq!(summary.researched, 3);
            assert_eq!(summary.failed, vec![SectionTitle::Step(2)]);
        }
        other => panic!("Expected Completed, got {other:?}"),
    }

    let content = std::fs::read_to_string(&report.output_path).unwrap();
    assert_eq!(content.matches("\n\n==================== ").count(), 4);
    for heading in ["INTRODUCTION", "STEP 1", "STEP 2", "CONCLUSION"] {
        assert!(content.contains(&format!("==================== {} ====================", heading)));
    }
    assert!(content.contains("Findings about Introduction."));
    assert!(content.contains("Findings about Step 1."));
    assert!(content.contains("Findings about Conclusion."));
    assert!(content.contains("--- ERROR DURING RESEARCH FOR: Step 2 ---\nDetails: no response generated within 15 minutes"));

    let step2 = content.find("= STEP 2 =").unwrap();
    let conclusion = content.find("= CONCLUSION =").unwrap();
    assert!(step2 < conclusion);

    // 大纲 1 页 + 每节 1 页，全部关闭
    let log = browser.log();
    assert_eq!(log.opened, 5);
    assert_eq!(log.closed, 5);
    assert!(report.describe().contains("failed: Step 2"));
}

#[tokio::test]
async fn test_outline_without_sections_runs_no_sessions() {
    let dir = TempDir::new().unwrap();
    let cfg = config_in(&dir);
    let browser = MockBrowser::new(|_| MockResponse::Text("I cannot help with that.".into()));

    let report = run_research(&browser, "Anything", &cfg, started_at()).await.unwrap();

    assert!(matches!(report.outcome, RunOutcome::NoSections));
    assert_eq!(browser.log().opened, 1);
    assert!(!report.output_path.exists());
}

#[tokio::test]
async fn test_outline_failure_skips_research() {
    let dir = TempDir::new().unwrap();
    let cfg = config_in(&dir);
    let browser = MockBrowser::new(|_| MockResponse::Empty);

    let report = run_research(&browser, "AI & ML: 2024!", &cfg, started_at()).await.unwrap();

    assert!(matches!(report.outcome, RunOutcome::OutlineFailed(_)));
    assert!(report
        .output_path
        .to_string_lossy()
        .contains("article_research_AI__ML_2024_"));
    assert!(cfg.app.research_dir.is_dir());
    assert!(!report.output_path.exists());
    assert!(report.describe().contains("research step was skipped"));
}
