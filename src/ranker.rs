use crate::types::TopWordsEntry;
use std::collections::HashMap;

/// 頻出上位 `k` 件のトークンを返す
///
/// 頻度の降順に並べ、同頻度の場合は `tokens` 中で先に現れたものを先にする。
/// 入力のみに依存する純粋関数。
///
/// ```
/// # use chat_stats::ranker::top_k;
/// # use chat_stats::types::TopWordsEntry;
/// let ranked = top_k(&["a", "b", "a", "b"], 2);
/// assert_eq!(ranked, vec![TopWordsEntry::new("a", 2), TopWordsEntry::new("b", 2)]);
/// ```
pub fn top_k<S: AsRef<str>>(tokens: &[S], k: usize) -> Vec<TopWordsEntry> {
    if k == 0 {
        return Vec::new();
    }

    // 初出順に並んだ (トークン, 頻度)
    let mut counts: Vec<(&str, u64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for token in tokens {
        let token = token.as_ref();
        match index.get(token) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(token, counts.len());
                counts.push((token, 1));
            }
        }
    }

    // 安定ソートなので同頻度は初出順のまま
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(k);
    counts
        .into_iter()
        .map(|(token, frequency)| TopWordsEntry::new(token, frequency))
        .collect()
}
