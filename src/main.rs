use anyhow::{Context, Result};
use chat_stats::analyzer::{AnalysisContext, ChatAnalyzer};
use chat_stats::config::Config;
use env_logger::Env;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[tokio::main]
async fn main() -> Result<()> {
    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    // 設定ファイル生成モード
    if args.len() > 1 && args[1] == "--generate-config" {
        let config_path: &str = if args.len() > 2 {
            &args[2]
        } else {
            "config.toml"
        };
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    // 設定ファイルのパス
    let config_path: &str = if args.len() > 1 && !args[1].starts_with("--") {
        &args[1]
    } else {
        "config.toml"
    };

    // 設定を読み込み
    let config = Config::load_or_default(config_path)?;

    // ロガーを初期化
    env_logger::Builder::from_env(Env::default().default_filter_or(config.output.log_level.as_str()))
        .format_timestamp(None)
        .init();

    log::info!("chat-stats を起動します");
    log::debug!("設定: {:?}", config);

    // Ctrl+C ハンドラを設定
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        log::info!("停止シグナルを受信しました...");
        running_clone.store(false, Ordering::SeqCst);
    })?;

    let pretty = config.output.pretty;
    let context = AnalysisContext::from_config(config).context("解析の初期化に失敗")?;
    let analyzer = ChatAnalyzer::new(context).with_running_flag(running);

    let report = analyzer
        .analyze_configured_input()
        .await
        .context("解析に失敗")?;

    // JSON形式で出力
    println!("{}", report.to_json(pretty)?);

    for line in report.summary_lines() {
        log::info!("{}", line);
    }

    log::info!("chat-stats を終了しました");

    Ok(())
}
