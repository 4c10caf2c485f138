use crate::types::{
    Message, MessageContent, MessageIssue, TextSegment, DATE_FORMAT, VOICE_MEDIA_TYPE,
};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// チャットエクスポート（`result.json`）
///
/// トップレベルに `messages` 配列が無いドキュメントは解析不能として扱う。
/// 各メッセージは形が不揃いでも実行を止めないよう、生のJSON値のまま保持して
/// [`classify`] で個別に分類する。
#[derive(Debug, Clone, Deserialize)]
pub struct ChatExport {
    /// チャット名
    #[serde(default)]
    pub name: Option<String>,
    pub messages: Vec<Value>,
}

impl ChatExport {
    /// JSON文字列からパース
    ///
    /// # Errors
    ///
    /// JSONとして不正、または `messages` 配列が無い場合にエラーを返す。
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).with_context(|| "チャットエクスポートのパースに失敗")
    }

    /// ファイルから読み込み
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("チャットエクスポートの読み込みに失敗: {:?}", path.as_ref()))?;
        Self::from_json(&content)
            .with_context(|| format!("入力ファイル: {:?}", path.as_ref()))
    }
}

/// メッセージの分類結果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classified {
    /// 集計対象。送信者やファイルの欠落があれば `issues` に記録する
    Accepted {
        message: Message,
        issues: Vec<MessageIssue>,
    },
    /// 集計対象外（タイムスタンプが解析できない）
    Rejected(MessageIssue),
}

/// 1件のメッセージを分類
///
/// - `date` が無い・解析できない → [`MessageIssue::UnparsableTimestamp`] で除外
/// - `from` が無い・文字列でない → [`MessageIssue::MissingSender`]（`Unknown` として集計）
/// - `media_type == "voice_message"` で `file` が無い → [`MessageIssue::MissingTranscriptTarget`]
pub fn classify(raw: &Value) -> Classified {
    let Some(timestamp) = raw
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
    else {
        log::debug!(
            "日時を解析できないメッセージを除外します: id={}",
            raw.get("id").unwrap_or(&Value::Null)
        );
        return Classified::Rejected(MessageIssue::UnparsableTimestamp);
    };

    let mut issues = Vec::new();

    let sender = raw.get("from").and_then(Value::as_str).map(str::to_string);
    if sender.is_none() {
        issues.push(MessageIssue::MissingSender);
    }

    let is_voice = raw.get("media_type").and_then(Value::as_str) == Some(VOICE_MEDIA_TYPE);
    let content = if is_voice {
        match raw.get("file").and_then(Value::as_str) {
            Some(file) => MessageContent::VoiceReference(file.to_string()),
            None => {
                issues.push(MessageIssue::MissingTranscriptTarget);
                MessageContent::UnresolvableVoice
            }
        }
    } else {
        parse_text(raw.get("text"))
    };

    Classified::Accepted {
        message: Message {
            timestamp,
            sender,
            content,
        },
        issues,
    }
}

/// `YYYY-MM-DDTHH:MM:SS` 形式の日時をパース
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATE_FORMAT).ok()
}

/// `text` フィールドを本文に変換
///
/// 文字列ならプレーンテキスト、配列ならリッチテキスト。
/// 配列要素のうち文字列でも `text` 文字列を持つオブジェクトでもないものは無視する。
/// それ以外の形は空テキストとして扱う。
fn parse_text(text: Option<&Value>) -> MessageContent {
    match text {
        Some(Value::String(text)) => MessageContent::PlainText(text.clone()),
        Some(Value::Array(items)) => MessageContent::RichText(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(TextSegment::Literal(text.clone())),
                    Value::Object(entity) => entity
                        .get("text")
                        .and_then(Value::as_str)
                        .map(|text| TextSegment::Entity(text.to_string())),
                    _ => None,
                })
                .collect(),
        ),
        _ => MessageContent::PlainText(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn accepted(raw: Value) -> (Message, Vec<MessageIssue>) {
        match classify(&raw) {
            Classified::Accepted { message, issues } => (message, issues),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_plain_message() {
        let (message, issues) = accepted(json!({
            "id": 1,
            "date": "2024-01-01T10:00:00",
            "from": "A",
            "text": "привет мир"
        }));
        assert!(issues.is_empty());
        assert_eq!(message.sender_name(), "A");
        assert_eq!(
            message.timestamp,
            parse_timestamp("2024-01-01T10:00:00").unwrap()
        );
        assert_eq!(
            message.content,
            MessageContent::PlainText("привет мир".to_string())
        );
    }

    #[test]
    fn test_rich_text() {
        let (message, _) = accepted(json!({
            "date": "2024-01-01T10:00:00",
            "from": "A",
            "text": ["см. ", {"type": "link", "text": "example.com"}, 42, {"type": "bold"}, "ок"]
        }));
        assert_eq!(
            message.content,
            MessageContent::RichText(vec![
                TextSegment::Literal("см. ".to_string()),
                TextSegment::Entity("example.com".to_string()),
                TextSegment::Literal("ок".to_string()),
            ])
        );
    }

    #[test]
    fn test_other_text_shapes_are_empty() {
        let (message, _) = accepted(json!({
            "date": "2024-01-01T10:00:00",
            "from": "A",
            "text": {"unexpected": true}
        }));
        assert_eq!(message.content, MessageContent::PlainText(String::new()));

        let (message, _) = accepted(json!({"date": "2024-01-01T10:00:00", "from": "A"}));
        assert_eq!(message.content, MessageContent::PlainText(String::new()));
    }

    #[test]
    fn test_missing_sender() {
        let (message, issues) = accepted(json!({
            "date": "2024-01-01T10:00:00",
            "type": "service",
            "text": ""
        }));
        assert_eq!(issues, [MessageIssue::MissingSender]);
        assert_eq!(message.sender_name(), "Unknown");

        let (_, issues) = accepted(json!({"date": "2024-01-01T10:00:00", "from": null}));
        assert_eq!(issues, [MessageIssue::MissingSender]);
    }

    #[test]
    fn test_unparsable_timestamp() {
        for raw in [
            json!({"from": "A", "text": "x"}),
            json!({"date": "01.01.2024 10:00", "from": "A"}),
            json!({"date": "2024-01-01T10:00:00+03:00", "from": "A"}),
            json!({"date": 1704103200, "from": "A"}),
            json!("not an object"),
        ] {
            assert_eq!(
                classify(&raw),
                Classified::Rejected(MessageIssue::UnparsableTimestamp)
            );
        }
    }

    #[test]
    fn test_voice_message() {
        let (message, issues) = accepted(json!({
            "date": "2024-01-02T09:00:00",
            "from": "B",
            "media_type": "voice_message",
            "file": "voice_messages/1.ogg",
            "text": ""
        }));
        assert!(issues.is_empty());
        assert_eq!(
            message.content,
            MessageContent::VoiceReference("voice_messages/1.ogg".to_string())
        );
    }

    #[test]
    fn test_voice_message_without_file() {
        let (message, issues) = accepted(json!({
            "date": "2024-01-02T09:00:00",
            "media_type": "voice_message"
        }));
        assert_eq!(
            issues,
            [MessageIssue::MissingSender, MessageIssue::MissingTranscriptTarget]
        );
        assert_eq!(message.content, MessageContent::UnresolvableVoice);
        assert!(message.content.is_voice());
    }

    #[test]
    fn test_other_media_uses_text() {
        let (message, _) = accepted(json!({
            "date": "2024-01-02T09:00:00",
            "from": "B",
            "media_type": "video_file",
            "file": "video_files/1.mp4",
            "text": "смотри"
        }));
        assert_eq!(
            message.content,
            MessageContent::PlainText("смотри".to_string())
        );
    }

    #[test]
    fn test_export_from_json() {
        let export = ChatExport::from_json(
            r#"{"name": "Чат", "type": "personal_chat", "messages": [{"id": 1}, 2]}"#,
        )
        .unwrap();
        assert_eq!(export.name.as_deref(), Some("Чат"));
        assert_eq!(export.messages.len(), 2);

        let export = ChatExport::from_json(r#"{"messages": []}"#).unwrap();
        assert!(export.name.is_none());
    }

    #[test]
    fn test_export_without_messages_is_fatal() {
        assert!(ChatExport::from_json(r#"{"name": "x"}"#).is_err());
        assert!(ChatExport::from_json(r#"{"messages": {}}"#).is_err());
        assert!(ChatExport::from_json("not json").is_err());
    }
}
