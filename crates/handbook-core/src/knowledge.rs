//! The handbook knowledge base.
//!
//! A [`KnowledgeBase`] holds two collections:
//!
//! - **Sections**: ordered handbook chapters, each a list of short passages.
//!   These are what [`crate::search`] ranks.
//! - **Topics**: a flat topic → description table used by
//!   [`crate::fallback`] when no language model is available.
//!
//! Declaration order is significant in both. Search ties keep corpus order
//! and the fallback generator returns the first matching topic.
//!
//! The built-in corpus comes from the 2024/2025 student handbook. A
//! deployment can replace it with a TOML file of the same shape:
//!
//! ```toml
//! [[sections]]
//! name = "評估或考核"
//! passages = ["評估方法包括考試、作業、專題報告和實習評估。"]
//!
//! [[topics]]
//! name = "補考規定"
//! description = "因特殊情況缺考可申請補考。"
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// A handbook chapter and its passages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub passages: Vec<String>,
}

/// A fallback topic with its canned description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub description: String,
}

/// In-memory handbook corpus. Loaded once at startup and never mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

const BUILTIN_SECTIONS: &[(&str, &[&str])] = &[
    (
        "第一部分 – 一般資訊",
        &[
            "歡迎加入澳門旅遊大學！我們致力於為您提供優質的旅遊教育。",
            "平等機會政策確保所有學生享有公平的學習環境。",
            "校曆表包含重要的學期日期和公眾假期安排。",
            "教務部負責學術事務管理和學生服務。",
            "課程概覽提供各學士學位課程的詳細信息。",
            "課程規章規定了學習要求和學術標準。",
        ],
    ),
    (
        "評估或考核",
        &[
            "評估方法包括考試、作業、專題報告和實習評估。",
            "學生有責任按時完成所有評估要求。",
            "考試期間允許使用指定的輔助器材。",
            "考試中的不當行為將面臨嚴重後果。",
            "教師需按時呈交學生成績。",
            "補考機會提供給因特殊情況缺考的學生。",
            "評估時間表在每學期開始前公布。",
        ],
    ),
    (
        "學術誠信與紀律",
        &[
            "學業不誠實行為包括抄襲、作弊和偽造。",
            "大學提供學習支援服務幫助學生成功。",
            "學生紀律守則規定了行為標準和處分程序。",
        ],
    ),
    (
        "大學部門與服務",
        &[
            "行政部門為學生提供各種服務和支援。",
            "圖書館提供豐富的學習資源和研究支援。",
            "學生宿舍為在校學生提供住宿服務。",
        ],
    ),
    (
        "收費與雜項",
        &[
            "學費需在每學期開始前繳納。",
            "各種雜費包括註冊費、實驗費等。",
        ],
    ),
    (
        "學士學位課程規條",
        &[
            "學年分為兩個學期，每學期約16週。",
            "修讀年期通常為四年，需完成120-130學分。",
            "畢業資格要求完成所有必修和選修科目。",
            "畢業榮譽根據累積GPA確定。",
            "實習是某些課程的必修要求。",
            "班級編制按照學年和專業劃分。",
            "選修科目需符合課程要求。",
            "課程轉讀需符合相關條件和程序。",
            "校長榮譽榜表彰優秀學生。",
            "課程考察提供實地學習機會。",
            "第四學年需完成畢業論文或報告。",
        ],
    ),
    (
        "附錄",
        &[
            "全球旅遊倫理規範指導行業實踐。",
            "研究道德準則確保研究的倫理性。",
            "AI工具使用指引規範學術寫作中的人工智能應用。",
        ],
    ),
];

const BUILTIN_TOPICS: &[(&str, &str)] = &[
    ("課程轉讀", "學生可申請轉讀其他課程，需符合目標課程入學要求，在指定時間內提交申請表格和相關文件。"),
    ("畢業要求", "學士學位需120-130學分，GPA達2.0以上，完成所有必修和選修科目。"),
    ("學術誠信", "嚴禁抄襲、作弊等不誠實行為，違者將面臨警告、記過或開除等處分。"),
    ("補考規定", "因特殊情況缺考可申請補考，需在考試後一週內提供證明文件申請。"),
    ("學費繳納", "每學期開學前繳納，逾期將影響註冊和考試資格。"),
    ("學生宿舍", "新生可在入學時申請，在校生需在指定期間申請，按時間順序分配。"),
    ("圖書館", "提供圖書借閱、電子資料庫、學習空間等服務，週一至週日開放。"),
    ("評估方法", "包括考試、作業、專題報告、實習評估等多種形式，具體比重由各科目決定。"),
    ("學術不誠實", "包括但不限於抄襲、代考、偽造文件等行為，將依情節嚴重程度給予相應處分。"),
    ("學分轉移", "經審核認可的其他院校學分可申請轉移，但需符合本校課程要求。"),
    ("實習規定", "第三或第四學年需完成相關實習，由學校安排或學生自行聯繫實習單位。"),
    ("論文要求", "第四學年需完成畢業論文或專題報告，須通過指導老師和評審委員會審核。"),
];

impl KnowledgeBase {
    /// The built-in 2024/2025 handbook corpus.
    pub fn builtin() -> Self {
        Self {
            sections: BUILTIN_SECTIONS
                .iter()
                .map(|(name, passages)| Section {
                    name: name.to_string(),
                    passages: passages.iter().map(|p| p.to_string()).collect(),
                })
                .collect(),
            topics: BUILTIN_TOPICS
                .iter()
                .map(|(name, description)| Topic {
                    name: name.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        }
    }

    /// Parse a corpus from TOML text.
    ///
    /// Rejects a corpus with no sections: search would silently return
    /// nothing for every query.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let kb: KnowledgeBase =
            toml::from_str(content).context("Failed to parse handbook file")?;
        if kb.sections.is_empty() {
            bail!("handbook must define at least one [[sections]] entry");
        }
        if let Some(s) = kb.sections.iter().find(|s| s.name.trim().is_empty()) {
            bail!("handbook section with {} passages has an empty name", s.passages.len());
        }
        if kb.topics.iter().any(|t| t.name.trim().is_empty()) {
            bail!("handbook topics must have non-empty names");
        }
        Ok(kb)
    }

    /// Section names in declaration order.
    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    /// Look up a section by case-insensitive partial name.
    ///
    /// Returns the canonical name of the first section whose name contains
    /// `query`, together with its passages.
    pub fn section_content(&self, query: &str) -> Option<(&str, &[String])> {
        let needle = query.to_lowercase();
        self.sections
            .iter()
            .find(|s| s.name.to_lowercase().contains(&needle))
            .map(|s| (s.name.as_str(), s.passages.as_slice()))
    }

    /// Total number of passages across all sections.
    pub fn passage_count(&self) -> usize {
        self.sections.iter().map(|s| s.passages.len()).sum()
    }
}
