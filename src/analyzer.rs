use crate::aggregator::Aggregator;
use crate::bucketer::Bucketer;
use crate::config::Config;
use crate::input::{classify, ChatExport, Classified};
use crate::linguistics::LinguisticResources;
use crate::ranker::top_k;
use crate::report::{Report, ReportAssembler};
use crate::tokenizer::Tokenizer;
use crate::transcript::{FsTranscriptResolver, TranscriptResolver};
use crate::types::{BucketKey, Message, MessageContent, RunCounters};
use anyhow::Result;
use futures_util::stream::{FuturesOrdered, StreamExt};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

/// 中断フラグの確認間隔
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 1回の解析実行に必要なものをまとめたコンテキスト
///
/// プロセス全体の状態は持たず、実行毎に作成して各コンポーネントに渡す。
pub struct AnalysisContext {
    pub config: Config,
    pub tokenizer: Tokenizer,
    pub resolver: Box<dyn TranscriptResolver>,
}

impl AnalysisContext {
    pub fn new(
        config: Config,
        resources: LinguisticResources,
        resolver: Box<dyn TranscriptResolver>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tokenizer: Tokenizer::new(resources)?,
            resolver,
            config,
        })
    }

    /// 設定からリソースとファイルシステムの文字起こしリゾルバを用意
    pub fn from_config(config: Config) -> Result<Self> {
        let resources = LinguisticResources::load(&config.linguistics);
        let resolver = Box::new(FsTranscriptResolver::new(&config.transcripts));
        Self::new(config, resources, resolver)
    }
}

/// 文字起こし待ちの音声メッセージ
///
/// 取り込み時点のバケットと送信者を保持する。
struct VoiceJob {
    bucket: BucketKey,
    sender: String,
    reference: String,
}

/// チャット解析パイプライン
///
/// 1. 全メッセージを分類し、日時の不正なものを除外してカウント
/// 2. 日時で安定ソートし、バケットを割り当て
/// 3. 取り込みフェーズ: メッセージ数を記録し、インラインテキストは即座にトークン化して記録。
///    音声メッセージは文字起こしの解決を予約する
/// 4. マージフェーズ: 予約した解決を並行に待ち、元のメッセージ順に記録する
/// 5. バケット毎の頻出語を求め、レポートを組み立てる
///
/// ```text
/// [messages] → classify → sort → [Bucketer] → [Aggregator] ← tokens ← [Tokenizer]
///                                     │              ↑
///                                     └→ [TranscriptResolver] ×N (並行)
///                                                    ↓
///                                 [Snapshot] → [top_k] → [ReportAssembler]
/// ```
pub struct ChatAnalyzer {
    context: AnalysisContext,
    running: Arc<AtomicBool>,
}

impl ChatAnalyzer {
    pub fn new(context: AnalysisContext) -> Self {
        Self {
            context,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// 外部から中断できるよう実行フラグを共有する
    ///
    /// フラグが `false` になると、マージフェーズで未解決の文字起こしを破棄する。
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// 設定された入力ファイルを解析
    pub async fn analyze_configured_input(&self) -> Result<Report> {
        let path = self.context.config.input.path.clone();
        self.analyze_file(path).await
    }

    /// チャットエクスポートのファイルを解析
    pub async fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<Report> {
        log::info!("チャットエクスポートを読み込みます: {:?}", path.as_ref());
        let export = ChatExport::from_file(path).await?;
        self.analyze(export).await
    }

    /// チャットエクスポートを解析
    pub async fn analyze(&self, export: ChatExport) -> Result<Report> {
        let mut counters = RunCounters {
            total_messages: export.messages.len() as u64,
            ..RunCounters::default()
        };

        let mut messages = Vec::with_capacity(export.messages.len());
        for raw in &export.messages {
            match classify(raw) {
                Classified::Accepted { message, issues } => {
                    for issue in issues {
                        counters.record_issue(issue);
                    }
                    messages.push(message);
                }
                Classified::Rejected(issue) => counters.record_issue(issue),
            }
        }
        counters.analyzed_messages = messages.len() as u64;

        if counters.unparsable_dates > 0 {
            log::warn!(
                "日時を解析できないメッセージ {} 件を除外しました",
                counters.unparsable_dates
            );
        }

        // 同時刻のメッセージは元の順序を保つ
        messages.sort_by_key(|message| message.timestamp);

        let Some(first) = messages.first() else {
            log::warn!("集計対象のメッセージがありません");
            return Ok(Report::empty(export.name, counters));
        };
        let mut bucketer = Bucketer::from_config(&self.context.config.bucketing, first.timestamp)?;

        let mut aggregator = Aggregator::new();
        let jobs = self.ingest(&messages, &mut bucketer, &mut aggregator);
        log::info!(
            "取り込み完了: {} 件 ({} バケット), 文字起こし待ち {} 件",
            messages.len(),
            aggregator.bucket_count(),
            jobs.len()
        );

        counters.unrecognized_voice += self.merge_transcripts(jobs, &mut aggregator).await;

        let snapshot = aggregator.into_snapshot();
        let k = self.context.config.analysis.top_words;
        let rankings: BTreeMap<BucketKey, _> = snapshot
            .buckets()
            .map(|(key, _)| (*key, top_k(&snapshot.bucket_tokens(key), k)))
            .collect();

        Ok(ReportAssembler::new(&bucketer, export.name, counters).assemble(&snapshot, rankings))
    }

    /// 取り込みフェーズ
    ///
    /// 同期的に全メッセージを1回だけ走査する。音声メッセージは解決を予約して返す。
    fn ingest(
        &self,
        messages: &[Message],
        bucketer: &mut Bucketer,
        aggregator: &mut Aggregator,
    ) -> Vec<VoiceJob> {
        let mut jobs = Vec::new();

        for message in messages {
            let bucket = bucketer.assign(message.timestamp);
            let sender = message.sender_name();
            aggregator.record_message(bucket, sender);

            match &message.content {
                MessageContent::VoiceReference(reference) => jobs.push(VoiceJob {
                    bucket,
                    sender: sender.to_string(),
                    reference: reference.clone(),
                }),
                MessageContent::UnresolvableVoice => {}
                content => {
                    if let Some(tokens) = self.context.tokenizer.tokenize_content(content) {
                        aggregator.record_tokens(bucket, sender, tokens);
                    }
                }
            }
        }

        jobs
    }

    /// マージフェーズ
    ///
    /// すべての解決を並行に進め、結果は予約した順に1件ずつ記録する。
    /// 文字起こしが得られなかった件数（中断で破棄した分を含む）を返す。
    async fn merge_transcripts(&self, jobs: Vec<VoiceJob>, aggregator: &mut Aggregator) -> u64 {
        let resolver = self.context.resolver.as_ref();
        let timeout = self
            .context
            .config
            .transcripts
            .timeout_seconds
            .map(Duration::from_secs);

        let mut pending = FuturesOrdered::new();
        for job in jobs {
            pending.push_back(async move {
                let text = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, resolver.resolve(&job.reference)).await {
                        Ok(text) => text,
                        Err(_) => {
                            log::warn!("文字起こしの読み込みがタイムアウトしました: {}", job.reference);
                            None
                        }
                    },
                    None => resolver.resolve(&job.reference).await,
                };
                (job, text)
            });
        }

        let mut unrecognized = 0u64;
        loop {
            if !self.running.load(Ordering::SeqCst) {
                let abandoned = pending.len() as u64;
                if abandoned > 0 {
                    log::warn!("中断しました: 未解決の文字起こし {} 件を破棄します", abandoned);
                }
                unrecognized += abandoned;
                break;
            }

            tokio::select! {
                next = pending.next() => {
                    let Some((job, text)) = next else {
                        break;
                    };
                    match text {
                        Some(text) => {
                            let tokens = self.context.tokenizer.tokenize(&text);
                            aggregator.record_tokens(job.bucket, &job.sender, tokens);
                        }
                        None => {
                            log::debug!("文字起こしがありません: {}", job.reference);
                            unrecognized += 1;
                        }
                    }
                }
                _ = tokio::time::sleep(CANCEL_POLL_INTERVAL) => {
                    // タイムアウト: ループを継続して running をチェック
                }
            }
        }

        if unrecognized > 0 {
            log::info!("文字起こしのない音声メッセージ {} 件を無視しました", unrecognized);
        }
        unrecognized
    }
}
