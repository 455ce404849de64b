//! System prompt construction and context injection.
//!
//! The assistant persona ("Rose") is fixed. Retrieved passages are appended
//! to the base prompt so the language model answers from the handbook rather
//! than from general knowledge.

use serde::{Deserialize, Serialize};

use crate::search::SearchHit;

/// Maximum number of passages injected into the system prompt.
pub const MAX_CONTEXT_PASSAGES: usize = 5;

/// Number of passages surfaced as regulation cards in a chat reply.
pub const DEFAULT_REGULATIONS_LIMIT: usize = 3;

const EXCERPT_CHARS: usize = 100;

const BASE_PROMPT: &str = "你是澳門旅遊大學的智能助手Rose🌹，專門回答有關大學手冊的問題。你的任務是：

1. 根據提供的大學手冊內容回答學生的問題
2. 提供準確、有用的信息
3. 用繁體中文回答（除非用戶用其他語言詢問）
4. 如果手冊中沒有相關信息，請誠實說明
5. 保持友善和專業的語調
6. 提供具體的規章制度和聯絡信息（如適用）

大學基本信息：
- 名稱：澳門旅遊大學 (Institute for Tourism Studies, Macao)
- 教務部電話：8598-2012
- 教務部電郵：enrolment@utm.edu.mo
- 網站：www.utm.edu.mo";

const CONTEXT_HEADER: &str = "\n\n以下是與用戶問題相關的手冊內容：\n";

/// A handbook excerpt returned alongside a chat answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regulation {
    pub title: String,
    pub excerpt: String,
    pub link: String,
    pub category: String,
}

/// Build the system prompt, injecting up to [`MAX_CONTEXT_PASSAGES`] hits.
///
/// Each injected passage is rendered as `\n[section]\ncontent\n`.
pub fn system_prompt(context: &[SearchHit]) -> String {
    let mut prompt = BASE_PROMPT.to_string();
    if context.is_empty() {
        return prompt;
    }

    prompt.push_str(CONTEXT_HEADER);
    for hit in context.iter().take(MAX_CONTEXT_PASSAGES) {
        prompt.push_str(&format!("\n[{}]\n{}\n", hit.section, hit.content));
    }
    prompt
}

/// Turn the leading hits into regulation cards.
pub fn extract_regulations(context: &[SearchHit], limit: usize) -> Vec<Regulation> {
    context
        .iter()
        .take(limit)
        .map(|hit| Regulation {
            title: hit.section.clone(),
            excerpt: excerpt(&hit.content),
            link: "#".to_string(),
            category: "handbook".to_string(),
        })
        .collect()
}

fn excerpt(content: &str) -> String {
    if content.chars().count() > EXCERPT_CHARS {
        let head: String = content.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}
