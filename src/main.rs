//! Research Bee - 文章调研机器人
//!
//! 入口：初始化日志、读取主题、启动浏览器，生成大纲并逐节调研，结果追加写入 article_research/。

use std::io::{BufRead, Write};

use anyhow::Context;
use research_bee::{
    browser::ChromeSession, config::load_config, observability, research::topic_from_line, run_research,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;

    let line = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => read_topic().context("Failed to read topic")?,
    };
    let Some(topic) = topic_from_line(&line) else {
        println!("No topic provided. Exiting.");
        return Ok(());
    };

    let started_at = chrono::Local::now().naive_local();

    tracing::info!("launching browser");
    // 浏览器会话由这里持有，Drop 时关闭
    let session = ChromeSession::launch(&cfg.browser).context("Failed to launch browser")?;

    let report = run_research(&session, topic, &cfg, started_at)
        .await
        .context("Research run failed")?;
    drop(session);

    println!("\n{}", "=".repeat(50));
    println!("{}", report.describe());
    println!("Task completed. Browser closed.");
    Ok(())
}

/// 从标准输入读取一行主题
fn read_topic() -> std::io::Result<String> {
    print!("Enter the main topic for the article: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
