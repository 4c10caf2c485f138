use crate::config::TranscriptConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// 音声メッセージのディレクトリ名
const VOICE_DIR: &str = "voice_messages";
/// 文字起こしテキストのディレクトリ名
const TRANSCRIPT_DIR: &str = "voice_messages_txt";

/// 音声ファイルのパスから文字起こしファイルのパスを導出
///
/// `voice_messages` を `voice_messages_txt` に、`.ogg` を `.txt` に置換する。
/// どちらも出現箇所すべてを置換する（既存の文字起こしツールの出力配置と一致させるため）。
///
/// ```
/// # use chat_stats::transcript::derive_transcript_path;
/// assert_eq!(
///     derive_transcript_path("chat/voice_messages/audio_1@01-01-2024_10-00-00.ogg"),
///     "chat/voice_messages_txt/audio_1@01-01-2024_10-00-00.txt"
/// );
/// ```
pub fn derive_transcript_path(reference: &str) -> String {
    reference
        .replace(VOICE_DIR, TRANSCRIPT_DIR)
        .replace(".ogg", ".txt")
}

/// 文字起こしテキストの取得
///
/// 音声メッセージの参照から、事前に作成された文字起こしテキストを返す。
/// ファイルが無い場合はエラーではなく `None` を返す。
/// 各呼び出しは独立しており、並行に待機してよい。
#[async_trait]
pub trait TranscriptResolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> Option<String>;
}

/// ファイルシステム上の文字起こしファイルを読む実装
#[derive(Debug, Clone, Default)]
pub struct FsTranscriptResolver {
    root_dir: Option<PathBuf>,
}

impl FsTranscriptResolver {
    pub fn new(config: &TranscriptConfig) -> Self {
        Self {
            root_dir: config.root_dir.as_ref().map(PathBuf::from),
        }
    }

    /// 参照に対応する文字起こしファイルのパス
    ///
    /// `root_dir` が設定されていれば、相対パスはそこを基準に解決する。
    pub fn transcript_path(&self, reference: &str) -> PathBuf {
        let derived = PathBuf::from(derive_transcript_path(reference));
        match &self.root_dir {
            Some(root) if derived.is_relative() => root.join(derived),
            _ => derived,
        }
    }

    async fn read_transcript(path: &Path) -> Option<String> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => {}
            _ => {
                log::debug!("文字起こしファイルがありません: {:?}", path);
                return None;
            }
        }

        match tokio::fs::read_to_string(path).await {
            Ok(content) => Some(content),
            Err(e) => {
                log::warn!("文字起こしファイルの読み込みに失敗: {:?}: {}", path, e);
                None
            }
        }
    }
}

#[async_trait]
impl TranscriptResolver for FsTranscriptResolver {
    async fn resolve(&self, reference: &str) -> Option<String> {
        let path = self.transcript_path(reference);
        Self::read_transcript(&path).await
    }
}
