//! Lexical relevance scoring and top-K passage search.
//!
//! # Scoring
//!
//! A query is split into keywords ([`extract_keywords`]). Each passage gets
//!
//! ```text
//! score = Σ (occurrences(term, passage) × len(term)) / len(passage)
//! ```
//!
//! with occurrences counted case-insensitively and non-overlapping, and all
//! lengths measured in characters. The score is roughly the fraction of the
//! passage covered by query terms, so short passages that mention a term
//! outrank long ones that mention it in passing.
//!
//! # Search
//!
//! [`search`] scores every passage in the [`KnowledgeBase`], keeps those
//! strictly above `min_score`, sorts descending (stable, so ties keep corpus
//! order) and truncates to `limit`. The corpus is a few dozen passages, so
//! this is a linear scan with no index.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeBase;

/// Default threshold below which a passage is considered unrelated.
pub const DEFAULT_MIN_SCORE: f64 = 0.1;

/// Token separators: whitespace plus CJK and ASCII punctuation.
const SEPARATORS: &[char] = &[
    '，', '。', '！', '？', '；', '：', '、', '（', '）', '【', '】', '「', '」', '“', '”', '‘',
    '’', '"', '\'',
];

const STOP_WORDS: &[&str] = &[
    "的", "是", "在", "有", "和", "我", "你", "他", "她", "它", "們", "這", "那", "什麼", "怎麼",
    "為什麼", "如何", "可以", "需要", "應該",
];

/// A ranked passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Name of the section the passage belongs to.
    pub section: String,
    /// Passage text.
    pub content: String,
    /// Relevance score, see the module docs.
    pub score: f64,
}

/// A compiled query keyword.
#[derive(Debug, Clone)]
pub struct Term {
    len: usize,
    pattern: Regex,
}

impl Term {
    /// Compile a keyword into a literal, case-insensitive matcher.
    pub fn new(text: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(&regex::escape(text))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            len: text.chars().count(),
            pattern,
        })
    }

    fn occurrences(&self, content: &str) -> usize {
        self.pattern.find_iter(content).count()
    }
}

/// Split a query into searchable keywords.
///
/// Tokens are separated by whitespace and punctuation. Single-character
/// tokens and stop words are dropped. There is no word segmentation, so an
/// unbroken run of CJK text stays one keyword.
pub fn extract_keywords(query: &str) -> Vec<String> {
    query
        .split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Compile every keyword of `query`.
///
/// Keywords too large for the regex engine's size limit are skipped.
pub fn query_terms(query: &str) -> Vec<Term> {
    extract_keywords(query)
        .iter()
        .filter_map(|k| Term::new(k).ok())
        .collect()
}

/// Score a passage against compiled query terms.
///
/// Returns `0.0` for an empty passage or an empty term list.
pub fn relevance_score(content: &str, terms: &[Term]) -> f64 {
    let content_len = content.chars().count();
    if content_len == 0 {
        return 0.0;
    }

    terms
        .iter()
        .map(|t| (t.occurrences(content) * t.len) as f64 / content_len as f64)
        .sum()
}

/// Rank every passage in `kb` against `query`.
///
/// Returns at most `limit` hits with `score > min_score`, highest first.
pub fn search(kb: &KnowledgeBase, query: &str, limit: usize, min_score: f64) -> Vec<SearchHit> {
    let terms = query_terms(query);
    if terms.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = kb
        .sections
        .iter()
        .flat_map(|section| section.passages.iter().map(move |p| (section, p)))
        .filter_map(|(section, passage)| {
            let score = relevance_score(passage, &terms);
            (score > min_score).then(|| SearchHit {
                section: section.name.clone(),
                content: passage.clone(),
                score,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{KnowledgeBase, Section};

    fn kb(passages: &[(&str, &[&str])]) -> KnowledgeBase {
        KnowledgeBase {
            sections: passages
                .iter()
                .map(|(name, ps)| Section {
                    name: name.to_string(),
                    passages: ps.iter().map(|p| p.to_string()).collect(),
                })
                .collect(),
            topics: Vec::new(),
        }
    }

    #[test]
    fn test_extract_keywords_splits_on_punctuation() {
        let words = extract_keywords("補考，規定？ 學費、宿舍");
        assert_eq!(words, vec!["補考", "規定", "學費", "宿舍"]);
    }

    #[test]
    fn test_extract_keywords_drops_stop_words_and_single_chars() {
        let words = extract_keywords("如何 補考 的 a 可以");
        assert_eq!(words, vec!["補考"]);
    }

    #[test]
    fn test_extract_keywords_empty() {
        assert!(extract_keywords("   ").is_empty());
        assert!(extract_keywords("什麼？").is_empty());
    }

    #[test]
    fn test_relevance_score_formula() {
        let terms = query_terms("補考");
        // 18 characters, one 2-character match.
        let score = relevance_score("補考機會提供給因特殊情況缺考的學生。", &terms);
        assert!((score - 2.0 / 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_score_counts_repeats() {
        let terms = query_terms("ab");
        let score = relevance_score("ab ab ab xx", &terms);
        assert!((score - 6.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_score_case_insensitive() {
        let terms = query_terms("gpa");
        let score = relevance_score("畢業榮譽根據累積GPA確定。", &terms);
        assert!((score - 3.0 / 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_score_literal_match() {
        let terms = query_terms("a.c");
        assert_eq!(relevance_score("abc", &terms), 0.0);
        assert!(relevance_score("a.c", &terms) > 0.0);
    }

    #[test]
    fn test_relevance_score_empty_content() {
        assert_eq!(relevance_score("", &query_terms("補考")), 0.0);
    }

    #[test]
    fn test_search_sorted_descending() {
        let kb = KnowledgeBase::builtin();
        let hits = search(&kb, "學生 考試 課程 學期", 10, DEFAULT_MIN_SCORE);
        assert!(hits.len() > 1);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_search_ties_keep_corpus_order() {
        let kb = KnowledgeBase::builtin();
        let hits = search(&kb, "考試", 10, DEFAULT_MIN_SCORE);
        // The 22-character passage scores 2/22 and falls under the threshold.
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "考試期間允許使用指定的輔助器材。");
        assert_eq!(hits[1].content, "考試中的不當行為將面臨嚴重後果。");
        assert!(hits.iter().all(|h| h.section == "評估或考核"));
    }

    #[test]
    fn test_search_respects_limit() {
        let kb = kb(&[("s", &["aa", "aa aa", "aa bb", "aa cc dd"])]);
        let hits = search(&kb, "aa", 2, DEFAULT_MIN_SCORE);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "aa");
        assert_eq!(hits[1].content, "aa aa");
    }

    #[test]
    fn test_search_threshold_is_strict() {
        // "aa" in a 20-character passage scores exactly 0.1.
        let kb = kb(&[("s", &["aa bbbbbbbbbbbbbbbbb"])]);
        assert!(search(&kb, "aa", 5, 0.1).is_empty());
        assert_eq!(search(&kb, "aa", 5, 0.05).len(), 1);
    }

    #[test]
    fn test_search_unknown_query_is_empty() {
        let kb = KnowledgeBase::builtin();
        assert!(search(&kb, "quantum chromodynamics", 5, DEFAULT_MIN_SCORE).is_empty());
        assert!(search(&kb, "", 5, DEFAULT_MIN_SCORE).is_empty());
    }

    #[test]
    fn test_search_zero_limit() {
        let kb = KnowledgeBase::builtin();
        assert!(search(&kb, "考試", 0, DEFAULT_MIN_SCORE).is_empty());
    }
}
