//! chat-stats - チャットエクスポートの期間別・送信者別統計
//!
//! このクレートは、チャットのエクスポート（JSON）を読み込み、
//! 時間バケット毎・送信者毎のメッセージ数、単語数、頻出語を集計します。
//! 音声メッセージは事前に作成された文字起こしテキストから単語を数えます。
//!
//! # 主な機能
//!
//! - **バケット分割**: 暦日、または最初のメッセージから固定幅の期間毎
//! - **トークン化**: 小文字化、ストップワード除去、レンマ化、内容語（名詞・動詞・形容詞）の抽出
//! - **音声メッセージ**: `voice_messages_txt` の文字起こしを並行に読み込んでマージ
//! - **頻出語ランキング**: バケット毎の上位K語（同頻度は初出順）
//! - **欠損カウンタ**: 日時不正、送信者不明、文字起こしなしの件数をレポートに含める
//! - **グラフ用系列** (ライブラリのみ): [`report::Report::series`] で送信者毎の時系列に変換。
//!   バイナリのJSON出力には含めない
//!
//! # アーキテクチャ
//!
//! ```text
//! [result.json] → [input::classify] → [Bucketer]
//!                                         ↓
//!                              ┌──────────┴──────────┐
//!                              │                     │
//!                         [Tokenizer]       [TranscriptResolver] ×N
//!                              │                     │ (並行・メッセージ順にマージ)
//!                              ↓                     ↓
//!                           [Aggregator] ←───────────┘
//!                              ↓
//!                        [ranker::top_k]
//!                              ↓
//!                       [ReportAssembler] → [Report (JSON)]
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use chat_stats::analyzer::{AnalysisContext, ChatAnalyzer};
//! use chat_stats::config::Config;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load_or_default("config.toml")?;
//! let analyzer = ChatAnalyzer::new(AnalysisContext::from_config(config)?);
//! let report = analyzer.analyze_configured_input().await?;
//! println!("{}", report.to_json(true)?);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod bucketer;
pub mod config;
pub mod input;
pub mod linguistics;
pub mod ranker;
pub mod report;
pub mod tokenizer;
pub mod transcript;
pub mod types;
