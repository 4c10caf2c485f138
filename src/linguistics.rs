use crate::config::LinguisticsConfig;
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// 品詞
///
/// OpenCorpora形式のタグの先頭グラムマから判定する。
/// 不定詞 (`INFN`) は動詞 (`VERB`) とは別の品詞として扱う。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartOfSpeech {
    /// 名詞 (`NOUN`)
    Noun,
    /// 動詞・人称形 (`VERB`)
    Verb,
    /// 不定詞 (`INFN`)
    Infinitive,
    /// 短形容詞 (`ADJS`)
    ShortAdjective,
    /// 完全形容詞 (`ADJF`)
    FullAdjective,
    /// その他（前置詞、代名詞など）
    Other,
}

impl PartOfSpeech {
    /// タグ文字列から品詞を判定
    ///
    /// `"NOUN,anim,masc sing,nomn"` のようなタグの先頭グラムマを見る。
    pub fn from_tag(tag: &str) -> Self {
        let head = tag
            .split(|c: char| c == ',' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        match head.to_ascii_uppercase().as_str() {
            "NOUN" => PartOfSpeech::Noun,
            "VERB" => PartOfSpeech::Verb,
            "INFN" => PartOfSpeech::Infinitive,
            "ADJS" => PartOfSpeech::ShortAdjective,
            "ADJF" => PartOfSpeech::FullAdjective,
            _ => PartOfSpeech::Other,
        }
    }

    /// 統計対象となる内容語かどうか
    pub fn is_content(self) -> bool {
        matches!(
            self,
            PartOfSpeech::Noun
                | PartOfSpeech::Verb
                | PartOfSpeech::ShortAdjective
                | PartOfSpeech::FullAdjective
        )
    }
}

/// 辞書を引かずに品詞が決まる語
///
/// 数字・ラテン文字・`_` だけから成る語（OpenCorporaの `NUMB` / `LATN` 相当）は
/// [`PartOfSpeech::Other`] に分類する。キリル文字を含む語は `None`。
pub fn script_part_of_speech(word: &str) -> Option<PartOfSpeech> {
    if !word.is_empty() && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some(PartOfSpeech::Other)
    } else {
        None
    }
}

/// 形態素解析の結果
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Analysis {
    /// 辞書形
    pub lemma: String,
    pub pos: PartOfSpeech,
}

/// 形態素解析の共通トレイト
///
/// 単語（小文字化済み）を受け取り、最も確からしい解析結果を返す。
/// 未知語の場合は `None`。
pub trait Morphology: Send + Sync {
    fn analyze(&self, word: &str) -> Option<Analysis>;
}

/// 辞書ファイルに基づく形態素解析
///
/// 1行1語形の TSV (`語形<TAB>レンマ<TAB>タグ`) を読み込む。
/// 同じ語形が複数回現れた場合は最初の行を採用する。
#[derive(Debug, Default)]
pub struct DictionaryMorphology {
    entries: HashMap<String, Analysis>,
}

impl DictionaryMorphology {
    /// 辞書ファイルを読み込み
    ///
    /// 空行と `#` で始まる行は無視する。列数の足りない行は警告を出して読み飛ばす。
    ///
    /// # Errors
    ///
    /// ファイルの読み込みに失敗した場合にエラーを返す。
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("形態素辞書の読み込みに失敗: {:?}", path.as_ref()))?;

        let mut skipped = 0usize;
        let mut rows = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut columns = line.split('\t');
            match (columns.next(), columns.next(), columns.next()) {
                (Some(form), Some(lemma), Some(tag)) if !form.is_empty() && !lemma.is_empty() => {
                    rows.push((form.to_string(), lemma.to_string(), PartOfSpeech::from_tag(tag)));
                }
                _ => {
                    log::debug!("形態素辞書 {}行目を読み飛ばします: {:?}", line_no + 1, line);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            log::warn!(
                "形態素辞書 {:?}: 不正な行 {} 件を読み飛ばしました",
                path.as_ref(),
                skipped
            );
        }

        let dictionary = Self::from_entries(rows);
        log::info!(
            "形態素辞書を読み込みました: {:?} ({} 語形)",
            path.as_ref(),
            dictionary.len()
        );
        Ok(dictionary)
    }

    /// (語形, レンマ, 品詞) の列から作成
    pub fn from_entries<I, F, L>(entries: I) -> Self
    where
        I: IntoIterator<Item = (F, L, PartOfSpeech)>,
        F: Into<String>,
        L: Into<String>,
    {
        let mut map = HashMap::new();
        for (form, lemma, pos) in entries {
            map.entry(form.into().to_lowercase())
                .or_insert_with(|| Analysis {
                    lemma: lemma.into().to_lowercase(),
                    pos,
                });
        }
        Self { entries: map }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Morphology for DictionaryMorphology {
    fn analyze(&self, word: &str) -> Option<Analysis> {
        self.entries.get(word).cloned()
    }
}

/// ストップワード一覧を読み込み
///
/// 1行1語。空行と `#` で始まる行は無視し、小文字化して格納する。
pub fn load_stopwords<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("ストップワードの読み込みに失敗: {:?}", path.as_ref()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect())
}

/// トークナイザに注入する言語リソース
///
/// `morphology` が `None` の場合、トークンはレンマ化せずそのまま通す。
pub struct LinguisticResources {
    pub stopwords: HashSet<String>,
    pub morphology: Option<Box<dyn Morphology>>,
}

impl LinguisticResources {
    pub fn new(stopwords: HashSet<String>, morphology: Option<Box<dyn Morphology>>) -> Self {
        Self {
            stopwords,
            morphology,
        }
    }

    /// ストップワードなし・レンマ化なし
    pub fn empty() -> Self {
        Self::new(HashSet::new(), None)
    }

    /// 設定に従ってリソースを読み込む
    ///
    /// 読み込みに失敗しても実行は止めない。ストップワードは空集合、
    /// 形態素解析はパススルーに縮退し、警告ログを出す。
    pub fn load(config: &LinguisticsConfig) -> Self {
        let stopwords = match load_stopwords(&config.stopwords_path) {
            Ok(words) => {
                log::info!(
                    "ストップワードを読み込みました: {} ({} 語)",
                    config.stopwords_path,
                    words.len()
                );
                words
            }
            Err(e) => {
                log::warn!("ストップワードを使用せずに続行します: {:#}", e);
                HashSet::new()
            }
        };

        let morphology = match &config.dictionary_path {
            Some(path) => match DictionaryMorphology::from_file(path) {
                Ok(dictionary) => Some(Box::new(dictionary) as Box<dyn Morphology>),
                Err(e) => {
                    log::warn!("レンマ化を行わずに続行します: {:#}", e);
                    None
                }
            },
            None => {
                log::info!("形態素辞書が未設定のため、レンマ化を行いません");
                None
            }
        };

        Self::new(stopwords, morphology)
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }
}

impl std::fmt::Debug for LinguisticResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinguisticResources")
            .field("stopwords", &self.stopwords.len())
            .field("morphology", &self.morphology.is_some())
            .finish()
    }
}
