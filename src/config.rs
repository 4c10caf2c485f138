use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub bucketing: BucketingConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub linguistics: LinguisticsConfig,
    #[serde(default)]
    pub transcripts: TranscriptConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// 入力設定
///
/// # デフォルト値
///
/// - `path`: "result.json" (チャットエクスポートのJSON)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default = "default_input_path")]
    pub path: String,
}

/// バケット分割の方式
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BucketingPolicy {
    /// 暦日ごと
    CalendarDay,
    /// 最初のメッセージから固定幅の期間ごと
    Rolling,
}

/// バケット分割設定
///
/// # デフォルト値
///
/// - `policy`: "calendar_day"
/// - `period_days`: 30 日 (`rolling` の場合のみ使用)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BucketingConfig {
    #[serde(default = "default_policy")]
    pub policy: BucketingPolicy,
    #[serde(default = "default_period_days")]
    pub period_days: u32,
}

/// 集計設定
///
/// # デフォルト値
///
/// - `top_words`: 5 (バケット毎の頻出語の件数)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_top_words")]
    pub top_words: usize,
}

/// 言語リソース設定
///
/// ストップワード一覧と形態素辞書のパス。
/// どちらも読み込めなくても実行は継続する（警告ログのみ）。
///
/// # デフォルト値
///
/// - `stopwords_path`: "stopwords/russian.txt"
/// - `dictionary_path`: なし (レンマ化せずそのまま通す)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinguisticsConfig {
    #[serde(default = "default_stopwords_path")]
    pub stopwords_path: String,
    /// `語形<TAB>レンマ<TAB>タグ` 形式の辞書ファイル
    pub dictionary_path: Option<String>,
}

/// 文字起こしファイル設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TranscriptConfig {
    /// 相対パスの文字起こしファイルを解決する基準ディレクトリ。
    /// 省略時はカレントディレクトリ
    pub root_dir: Option<String>,
    /// 1ファイルあたりの読み込みタイムアウト（秒）。省略時は無制限
    pub timeout_seconds: Option<u64>,
}

/// 出力設定
///
/// # デフォルト値
///
/// - `log_level`: "info"
/// - `pretty`: true (整形済みJSONで出力)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

// Default functions
fn default_input_path() -> String {
    "result.json".to_string()
}

fn default_policy() -> BucketingPolicy {
    BucketingPolicy::CalendarDay
}

fn default_period_days() -> u32 {
    30
}

fn default_top_words() -> usize {
    5
}

fn default_stopwords_path() -> String {
    "stopwords/russian.txt".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_pretty() -> bool {
    true
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
        }
    }
}

impl Default for BucketingConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            period_days: default_period_days(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_words: default_top_words(),
        }
    }
}

impl Default for LinguisticsConfig {
    fn default() -> Self {
        Self {
            stopwords_path: default_stopwords_path(),
            dictionary_path: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            pretty: default_pretty(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Errors
    ///
    /// ファイルの読み込み・パースに失敗した場合、または設定値が不正な場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use chat_stats::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        config.validate()?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// 既存のファイルは上書きされる。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }

    /// 設定値の整合性を検証
    pub fn validate(&self) -> Result<()> {
        if self.bucketing.policy == BucketingPolicy::Rolling && self.bucketing.period_days == 0 {
            anyhow::bail!("bucketing.period_days は 1 以上である必要があります");
        }
        if self.transcripts.timeout_seconds == Some(0) {
            anyhow::bail!("transcripts.timeout_seconds は 1 以上である必要があります");
        }
        Ok(())
    }
}
