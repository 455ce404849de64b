//! Canned answers used when the language model is unavailable.
//!
//! The first topic (in knowledge base order) whose name appears in the
//! lowercased message wins, so a message naming two topics gets the answer
//! for whichever is declared first.

use crate::knowledge::{KnowledgeBase, Topic};

const CONTACT_FOOTER: &str = "**如需詳細信息，請聯繫：**\n📞 教務部：8598-2012\n📧 電郵：enrolment@utm.edu.mo";

/// Reply used when no topic matches.
pub const DEFAULT_RESPONSE: &str = "## 🤖 學生助理 Rose

您好！關於您的問題，建議您聯繫相關部門獲取準確信息：

📞 **教務部：** 8598-2012
📧 **電郵：** enrolment@utm.edu.mo
🌐 **網站：** www.utm.edu.mo

我可以幫您解答關於課程轉讀、畢業要求、學術誠信、補考規定等問題。

請嘗試問我具體的問題，例如：
• \"如何申請課程轉讀？\"
• \"畢業需要多少學分？\"
• \"補考有什麼規定？\"";

/// A fallback answer and the topic that produced it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Fallback {
    pub topic: Option<String>,
    pub text: String,
}

/// Find the first topic mentioned in `message`.
pub fn match_topic<'a>(kb: &'a KnowledgeBase, message: &str) -> Option<&'a Topic> {
    let lowered = message.to_lowercase();
    kb.topics
        .iter()
        .find(|t| lowered.contains(&t.name.to_lowercase()))
}

/// Render the answer for a matched topic.
pub fn topic_response(topic: &Topic) -> String {
    format!(
        "## 📚 {}\n\n{}\n\n{}",
        topic.name, topic.description, CONTACT_FOOTER
    )
}

/// Produce the fallback answer for `message`.
pub fn fallback_response(kb: &KnowledgeBase, message: &str) -> Fallback {
    match match_topic(kb, message) {
        Some(topic) => Fallback {
            topic: Some(topic.name.clone()),
            text: topic_response(topic),
        },
        None => Fallback {
            topic: None,
            text: DEFAULT_RESPONSE.to_string(),
        },
    }
}
