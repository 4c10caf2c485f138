use crate::aggregator::Snapshot;
use crate::bucketer::Bucketer;
use crate::types::{BucketKey, RunCounters, TopWordsEntry};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// 1バケット分のレポート
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BucketReport {
    pub key: BucketKey,
    /// 表示用ラベル（日付または期間の開始日）
    pub label: String,
    /// 送信者 → メッセージ数
    pub message_counts: BTreeMap<String, u64>,
    /// 送信者 → 単語数
    pub word_counts: BTreeMap<String, u64>,
    /// 頻出語（頻度降順）
    pub top_words: Vec<TopWordsEntry>,
}

/// 送信者毎の全期間合計
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SenderTotals {
    pub messages: u64,
    pub words: u64,
}

/// 解析結果のレポート
///
/// 可視化・テキストレポートなど外部の利用者に渡す唯一の構造。
/// JSON出力例:
///
/// ```json
/// {
///   "chat_name": "Чат",
///   "buckets": [
///     {
///       "key": { "kind": "day", "value": "2024-01-01" },
///       "label": "2024-01-01",
///       "message_counts": { "A": 1 },
///       "word_counts": { "A": 2 },
///       "top_words": [ { "token": "привет", "frequency": 1 } ]
///     }
///   ],
///   "sender_totals": { "A": { "messages": 1, "words": 2 } },
///   "counters": { "total_messages": 1, "analyzed_messages": 1, ... }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    pub chat_name: Option<String>,
    pub buckets: Vec<BucketReport>,
    pub sender_totals: BTreeMap<String, SenderTotals>,
    pub counters: RunCounters,
}

/// グラフ描画向けの系列データ
///
/// `labels[i]` に対応する値が各送信者の `messages[i]` / `words[i]`。
/// そのバケットに登場しない送信者は0で埋める。
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivitySeries {
    pub labels: Vec<String>,
    pub senders: BTreeMap<String, SenderSeries>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SenderSeries {
    pub messages: Vec<u64>,
    pub words: Vec<u64>,
}

/// スナップショットと頻出語ランキングからレポートを組み立てる
///
/// 値の再配置のみを行い、集計はしない。
pub struct ReportAssembler<'a> {
    bucketer: &'a Bucketer,
    chat_name: Option<String>,
    counters: RunCounters,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(bucketer: &'a Bucketer, chat_name: Option<String>, counters: RunCounters) -> Self {
        Self {
            bucketer,
            chat_name,
            counters,
        }
    }

    pub fn assemble(
        self,
        snapshot: &Snapshot,
        mut rankings: BTreeMap<BucketKey, Vec<TopWordsEntry>>,
    ) -> Report {
        let mut sender_totals: BTreeMap<String, SenderTotals> = BTreeMap::new();

        let buckets = snapshot
            .buckets()
            .map(|(key, senders)| {
                let mut message_counts = BTreeMap::new();
                let mut word_counts = BTreeMap::new();
                for (sender, stats) in senders {
                    message_counts.insert(sender.clone(), stats.message_count());
                    word_counts.insert(sender.clone(), stats.word_count());

                    let totals = sender_totals.entry(sender.clone()).or_default();
                    totals.messages += stats.message_count();
                    totals.words += stats.word_count();
                }
                BucketReport {
                    key: *key,
                    label: self.bucketer.label(key),
                    message_counts,
                    word_counts,
                    top_words: rankings.remove(key).unwrap_or_default(),
                }
            })
            .collect();

        Report {
            chat_name: self.chat_name,
            buckets,
            sender_totals,
            counters: self.counters,
        }
    }
}

impl Report {
    /// 空のレポート（集計対象のメッセージが無い場合）
    pub fn empty(chat_name: Option<String>, counters: RunCounters) -> Self {
        Self {
            chat_name,
            buckets: Vec::new(),
            sender_totals: BTreeMap::new(),
            counters,
        }
    }

    /// JSON文字列に変換
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.with_context(|| "レポートのシリアライズに失敗")
    }

    /// 送信者毎の時系列に並べ替え
    ///
    /// 可視化側から呼ぶためのもので、[`Report::to_json`] の出力には含まれない。
    pub fn series(&self) -> ActivitySeries {
        let labels = self.buckets.iter().map(|b| b.label.clone()).collect();
        let senders = self
            .sender_totals
            .keys()
            .map(|sender| {
                let series = SenderSeries {
                    messages: self
                        .buckets
                        .iter()
                        .map(|b| b.message_counts.get(sender).copied().unwrap_or(0))
                        .collect(),
                    words: self
                        .buckets
                        .iter()
                        .map(|b| b.word_counts.get(sender).copied().unwrap_or(0))
                        .collect(),
                };
                (sender.clone(), series)
            })
            .collect();
        ActivitySeries { labels, senders }
    }

    /// テキストサマリ（ログ出力用）
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(name) = &self.chat_name {
            lines.push(format!("チャット: {}", name));
        }
        for (sender, totals) in &self.sender_totals {
            lines.push(format!(
                "{}: {} メッセージ, {} 語",
                sender, totals.messages, totals.words
            ));
        }
        let c = &self.counters;
        lines.push(format!(
            "メッセージ {} 件中 {} 件を集計 (日時不正 {}, 送信者不明 {}, ファイルなし音声 {})",
            c.total_messages, c.analyzed_messages, c.unparsable_dates, c.missing_sender, c.missing_voice_file
        ));
        lines.push(format!("文字起こしのない音声メッセージ: {} 件", c.unrecognized_voice));
        for bucket in &self.buckets {
            let words: Vec<String> = bucket
                .top_words
                .iter()
                .map(|entry| format!("{}({})", entry.token, entry.frequency))
                .collect();
            lines.push(format!("{}: {}", bucket.label, words.join(", ")));
        }
        lines
    }
}
