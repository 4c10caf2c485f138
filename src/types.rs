use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// 送信者が特定できないメッセージに割り当てる送信者名
pub const UNKNOWN_SENDER: &str = "Unknown";

/// エクスポートJSONの `date` フィールドの書式（タイムゾーンなし）
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// 音声メッセージを示す `media_type` の値
pub const VOICE_MEDIA_TYPE: &str = "voice_message";

/// リッチテキストの1セグメント
///
/// エクスポートの `text` 配列の要素は、素の文字列か
/// `text` フィールドを持つオブジェクト（リンク、太字など）のどちらか。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextSegment {
    /// 素の文字列
    Literal(String),
    /// オブジェクト要素の `text` フィールド
    Entity(String),
}

impl TextSegment {
    pub fn as_str(&self) -> &str {
        match self {
            TextSegment::Literal(text) | TextSegment::Entity(text) => text,
        }
    }
}

/// メッセージ本文
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageContent {
    /// プレーンテキスト
    PlainText(String),
    /// セグメント列からなるリッチテキスト
    RichText(Vec<TextSegment>),
    /// 音声メッセージ（元の音声ファイルへのパス）
    VoiceReference(String),
    /// `media_type` は音声だが `file` が無いメッセージ
    ///
    /// メッセージ数には数えるが、単語は寄与しない。
    UnresolvableVoice,
}

impl MessageContent {
    /// 音声メッセージかどうか
    pub fn is_voice(&self) -> bool {
        matches!(
            self,
            MessageContent::VoiceReference(_) | MessageContent::UnresolvableVoice
        )
    }
}

/// 取り込み済みのチャットメッセージ
///
/// 分類を通過した（タイムスタンプが有効な）メッセージのみがこの型になる。
/// 取り込み後は変更しない。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// 送信時刻（タイムゾーンなし）
    pub timestamp: NaiveDateTime,

    /// 送信者。`from` が無い、または null の場合は `None`
    pub sender: Option<String>,

    /// 本文
    pub content: MessageContent,
}

impl Message {
    /// 集計に使う送信者名を取得
    ///
    /// 送信者が無い場合は [`UNKNOWN_SENDER`] を返す。
    pub fn sender_name(&self) -> &str {
        self.sender.as_deref().unwrap_or(UNKNOWN_SENDER)
    }
}

/// 1メッセージ単位の異常
///
/// どれも実行全体を止めず、対応するフォールバックに回してカウントする。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageIssue {
    /// `from` が無い: [`UNKNOWN_SENDER`] として集計
    MissingSender,
    /// `date` が解析できない: 全バケット統計から除外
    UnparsableTimestamp,
    /// 音声メッセージに `file` が無い: 文字起こしの解決を行わない
    MissingTranscriptTarget,
}

/// バケットキー
///
/// 同じ実行内では常に同じバリアントだけが生成される。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BucketKey {
    /// 暦日バケット
    Day(NaiveDate),
    /// 固定幅ローリング期間のインデックス（0始まり）
    Period(u64),
}

/// (バケット, 送信者) 毎の統計
///
/// `word_count == tokens.len()` を常に満たす。
/// フィールドは変更メソッド経由でのみ更新する。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SenderBucketStats {
    message_count: u64,
    word_count: u64,
    tokens: Vec<String>,
}

impl SenderBucketStats {
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn word_count(&self) -> u64 {
        self.word_count
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub(crate) fn add_message(&mut self) {
        self.message_count += 1;
    }

    pub(crate) fn extend_tokens(&mut self, tokens: Vec<String>) {
        self.word_count += tokens.len() as u64;
        self.tokens.extend(tokens);
    }
}

/// 頻出語ランキングの1エントリ
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TopWordsEntry {
    pub token: String,
    pub frequency: u64,
}

impl TopWordsEntry {
    pub fn new(token: impl Into<String>, frequency: u64) -> Self {
        Self {
            token: token.into(),
            frequency,
        }
    }
}

/// 実行全体のカウンタ
///
/// 下流の利用者がデータの欠損具合を判断できるよう、レポートに必ず含める。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// 入力ドキュメント中のメッセージ総数
    pub total_messages: u64,
    /// タイムスタンプが有効で集計対象になったメッセージ数
    pub analyzed_messages: u64,
    /// `date` を解析できなかったメッセージ数
    pub unparsable_dates: u64,
    /// 送信者が無く `Unknown` として集計したメッセージ数
    pub missing_sender: u64,
    /// `file` の無い音声メッセージ数
    pub missing_voice_file: u64,
    /// 文字起こしが得られなかった音声メッセージ数
    pub unrecognized_voice: u64,
}

impl RunCounters {
    /// メッセージ単位の異常を対応するカウンタに加算
    pub fn record_issue(&mut self, issue: MessageIssue) {
        match issue {
            MessageIssue::MissingSender => self.missing_sender += 1,
            MessageIssue::UnparsableTimestamp => self.unparsable_dates += 1,
            MessageIssue::MissingTranscriptTarget => self.missing_voice_file += 1,
        }
    }
}
