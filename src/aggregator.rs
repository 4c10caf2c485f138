use crate::types::{BucketKey, SenderBucketStats};
use std::collections::BTreeMap;

type BucketMap = BTreeMap<BucketKey, BTreeMap<String, SenderBucketStats>>;

/// バケット → 送信者 → 統計 の集計状態
///
/// 1回の解析実行の間だけ存在する。変更は [`Aggregator::record_message`] と
/// [`Aggregator::record_tokens`] のみで行い、すべての記録が終わったら
/// [`Aggregator::into_snapshot`] で読み取り専用に切り替える。
///
/// 記録は単一の制御タスクから順に適用されるため、内部ロックは持たない。
/// キーは `BTreeMap` で保持し、バケットは昇順・送信者は名前順に並ぶ。
/// 別途、バケット内で送信者が最初に記録された順序を保持する。
#[derive(Debug, Default)]
pub struct Aggregator {
    buckets: BucketMap,
    sender_order: BTreeMap<BucketKey, Vec<String>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// メッセージ1件を記録
    ///
    /// 有効なメッセージ毎にちょうど1回呼ぶ。レコードが無ければ作成する。
    pub fn record_message(&mut self, bucket: BucketKey, sender: &str) {
        self.stats_mut(bucket, sender).add_message();
    }

    /// トークン列を記録
    ///
    /// インラインテキストのメッセージでは取り込み時に、
    /// 音声メッセージでは文字起こし解決後のマージ時に呼ぶ。
    pub fn record_tokens(&mut self, bucket: BucketKey, sender: &str, tokens: Vec<String>) {
        self.stats_mut(bucket, sender).extend_tokens(tokens);
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// 集計を確定して読み取り専用のスナップショットにする
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            buckets: self.buckets,
            sender_order: self.sender_order,
        }
    }

    fn stats_mut(&mut self, bucket: BucketKey, sender: &str) -> &mut SenderBucketStats {
        let senders = self.buckets.entry(bucket).or_default();
        if !senders.contains_key(sender) {
            self.sender_order
                .entry(bucket)
                .or_default()
                .push(sender.to_string());
        }
        senders.entry(sender.to_string()).or_default()
    }
}

/// 確定済みの集計結果（読み取り専用）
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    buckets: BucketMap,
    sender_order: BTreeMap<BucketKey, Vec<String>>,
}

impl Snapshot {
    /// バケットをキー昇順で走査
    pub fn buckets(&self) -> impl Iterator<Item = (&BucketKey, &BTreeMap<String, SenderBucketStats>)> {
        self.buckets.iter()
    }

    pub fn get(&self, bucket: &BucketKey, sender: &str) -> Option<&SenderBucketStats> {
        self.buckets.get(bucket)?.get(sender)
    }

    /// バケット内の全トークン
    ///
    /// 送信者はバケット内で最初に記録された順、各送信者のトークンは記録順に連結する。
    /// 頻出語の同順位はこの並びの初出位置で決まる。
    pub fn bucket_tokens(&self, bucket: &BucketKey) -> Vec<&str> {
        let (Some(senders), Some(order)) =
            (self.buckets.get(bucket), self.sender_order.get(bucket))
        else {
            return Vec::new();
        };
        order
            .iter()
            .filter_map(|sender| senders.get(sender))
            .flat_map(|stats| stats.tokens().iter().map(String::as_str))
            .collect()
    }
}
