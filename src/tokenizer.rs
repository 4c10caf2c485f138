use crate::linguistics::{script_part_of_speech, LinguisticResources};
use crate::types::{MessageContent, TextSegment};
use anyhow::{Context, Result};
use regex::Regex;

/// 単語候補の抽出パターン（Unicodeの単語構成文字の最長連続）
const WORD_PATTERN: &str = r"\w+";

/// テキストを正規化済みトークン列に変換する
///
/// 1. 小文字化
/// 2. 単語構成文字の連続を候補として抽出
/// 3. ストップワードを除外
/// 4. 形態素解析でレンマと品詞を取得し、名詞・動詞・形容詞（短形/完全形）のみ残す
///
/// 出現順と重複は保持する（頻度集計に使うため）。
/// 数字やラテン文字だけの語は形態素解析の有無にかかわらず除外する。
/// 形態素解析が無い場合は残りの候補をそのまま通し、辞書に無い未知語も同様に通す。
pub struct Tokenizer {
    word_pattern: Regex,
    resources: LinguisticResources,
}

impl Tokenizer {
    pub fn new(resources: LinguisticResources) -> Result<Self> {
        let word_pattern =
            Regex::new(WORD_PATTERN).with_context(|| "単語抽出パターンのコンパイルに失敗")?;
        if resources.morphology.is_none() {
            log::warn!("形態素解析なしで動作します: トークンはレンマ化されません");
        }
        Ok(Self {
            word_pattern,
            resources,
        })
    }

    /// テキストをトークン化
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.word_pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|word| !self.resources.is_stopword(word))
            .filter_map(|word| self.normalize(word))
            .collect()
    }

    /// インラインテキストを持つメッセージ本文をトークン化
    ///
    /// 音声メッセージの場合は `None`（文字起こしの解決後に [`Tokenizer::tokenize`] を使う）。
    pub fn tokenize_content(&self, content: &MessageContent) -> Option<Vec<String>> {
        match content {
            MessageContent::PlainText(text) => Some(self.tokenize(text)),
            MessageContent::RichText(segments) => Some(self.tokenize(&join_segments(segments))),
            MessageContent::VoiceReference(_) | MessageContent::UnresolvableVoice => None,
        }
    }

    fn normalize(&self, word: &str) -> Option<String> {
        if script_part_of_speech(word).is_some_and(|pos| !pos.is_content()) {
            return None;
        }
        let Some(morphology) = &self.resources.morphology else {
            return Some(word.to_string());
        };
        match morphology.analyze(word) {
            Some(analysis) if analysis.pos.is_content() => Some(analysis.lemma),
            Some(_) => None,
            None => Some(word.to_string()),
        }
    }
}

/// リッチテキストのセグメントを半角スペース1つで連結
pub fn join_segments(segments: &[TextSegment]) -> String {
    segments
        .iter()
        .map(TextSegment::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linguistics::{DictionaryMorphology, PartOfSpeech};
    use std::collections::HashSet;

    fn russian_tokenizer() -> Tokenizer {
        let stopwords: HashSet<String> = ["и", "в", "не", "всех"]
            .into_iter()
            .map(String::from)
            .collect();
        let morphology = DictionaryMorphology::from_entries([
            ("привет", "привет", PartOfSpeech::Noun),
            ("мир", "мир", PartOfSpeech::Noun),
            ("миру", "мир", PartOfSpeech::Noun),
            ("кошки", "кошка", PartOfSpeech::Noun),
            ("спят", "спать", PartOfSpeech::Verb),
            ("спать", "спать", PartOfSpeech::Infinitive),
            ("рыжие", "рыжий", PartOfSpeech::FullAdjective),
            ("рад", "рад", PartOfSpeech::ShortAdjective),
            ("очень", "очень", PartOfSpeech::Other),
            ("мой", "мой", PartOfSpeech::Other),
        ]);
        Tokenizer::new(LinguisticResources::new(
            stopwords,
            Some(Box::new(morphology)),
        ))
        .unwrap()
    }

    #[test]
    fn test_tokenize_filters_and_lemmatizes() {
        let tokenizer = russian_tokenizer();
        let tokens = tokenizer.tokenize("Рыжие КОШКИ спят, и очень рад миру!");
        assert_eq!(tokens, ["рыжий", "кошка", "спать", "рад", "мир"]);
    }

    #[test]
    fn test_infinitive_not_retained() {
        let tokenizer = russian_tokenizer();
        assert!(tokenizer.tokenize("спать").is_empty());
    }

    #[test]
    fn test_duplicates_and_order_preserved() {
        let tokenizer = russian_tokenizer();
        let tokens = tokenizer.tokenize("мир привет миру мир");
        assert_eq!(tokens, ["мир", "привет", "мир", "мир"]);
    }

    #[test]
    fn test_unknown_words_pass_through() {
        let tokenizer = russian_tokenizer();
        assert_eq!(tokenizer.tokenize("привет котик_2024"), ["привет", "котик_2024"]);
    }

    #[test]
    fn test_numbers_and_latin_dropped() {
        let tokenizer = russian_tokenizer();
        assert_eq!(tokenizer.tokenize("кошки 2024 hello"), ["кошка"]);

        let tokenizer = Tokenizer::new(LinguisticResources::empty()).unwrap();
        assert_eq!(tokenizer.tokenize("кошки 2024 hello 1_000"), ["кошки"]);
    }

    #[test]
    fn test_passthrough_without_resources() {
        let tokenizer = Tokenizer::new(LinguisticResources::empty()).unwrap();
        assert_eq!(
            tokenizer.tokenize("Привет, мир... и ВСЕМ!"),
            ["привет", "мир", "и", "всем"]
        );
        assert!(tokenizer.tokenize("  ...  !!").is_empty());
    }

    #[test]
    fn test_tokenize_rich_content() {
        let tokenizer = Tokenizer::new(LinguisticResources::empty()).unwrap();
        let content = MessageContent::RichText(vec![
            TextSegment::Literal("смотри".to_string()),
            TextSegment::Entity("https://пример.рф".to_string()),
            TextSegment::Literal("тут".to_string()),
        ]);
        assert_eq!(
            tokenizer.tokenize_content(&content).unwrap(),
            ["смотри", "пример", "рф", "тут"]
        );
    }

    #[test]
    fn test_tokenize_content_skips_voice() {
        let tokenizer = Tokenizer::new(LinguisticResources::empty()).unwrap();
        let voice = MessageContent::VoiceReference("voice_messages/1.ogg".to_string());
        assert!(tokenizer.tokenize_content(&voice).is_none());
        assert!(tokenizer
            .tokenize_content(&MessageContent::UnresolvableVoice)
            .is_none());
    }

    #[test]
    fn test_join_segments() {
        let segments = vec![
            TextSegment::Literal("a".to_string()),
            TextSegment::Entity("b".to_string()),
            TextSegment::Literal("".to_string()),
            TextSegment::Literal("c".to_string()),
        ];
        assert_eq!(join_segments(&segments), "a b  c");
    }
}
