//! Content insights
//!
//! Local, rule-based content analysis: sentiment, topics, keywords,
//! readability and engagement, plus the tag and spread-potential views built
//! on top of it. No collaborator is involved, so every result is tagged
//! [`ServedBy::Fallback`].

use flulink_common::ServedBy;
use serde::{Deserialize, Serialize};

const POSITIVE_WORDS: [&str; 8] = ["好", "棒", "喜欢", "爱", "开心", "快乐", "美丽", "优秀"];
const NEGATIVE_WORDS: [&str; 8] = ["坏", "差", "讨厌", "恨", "难过", "痛苦", "丑陋", "糟糕"];

/// (topic label, keywords); matched against the raw text
const TOPICS: [(&str, &[&str]); 5] = [
    ("life", &["生活", "日常", "今天", "昨天", "明天"]),
    ("technology", &["科技", "技术", "AI", "人工智能", "编程"]),
    ("art", &["艺术", "音乐", "绘画", "创作", "设计"]),
    ("travel", &["旅行", "旅游", "风景", "景点", "度假"]),
    ("food", &["美食", "食物", "餐厅", "烹饪", "味道"]),
];

const MAX_KEYWORDS: usize = 5;
const TAG_KEYWORDS: usize = 3;
const MAX_TAGS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Result of [`analyze_content`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    pub sentiment: Sentiment,
    pub topics: Vec<String>,
    pub keywords: Vec<String>,
    /// 0-100, shorter is more readable
    pub readability: f64,
    /// 0-100
    pub engagement_potential: f64,
    #[serde(rename = "model_used")]
    pub served_by: ServedBy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagExtraction {
    pub tags: Vec<String>,
    #[serde(rename = "model_used")]
    pub served_by: ServedBy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadPotential {
    /// 0-100
    pub potential_score: f64,
    #[serde(rename = "model_used")]
    pub served_by: ServedBy,
}

fn count_present(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| text.contains(*w)).count()
}

pub fn analyze_content(text: &str) -> ContentAnalysis {
    let positive = count_present(text, &POSITIVE_WORDS);
    let negative = count_present(text, &NEGATIVE_WORDS);

    let sentiment = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    };

    let topics: Vec<String> = TOPICS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(label, _)| label.to_string())
        .collect();

    let keywords: Vec<String> = text
        .split_whitespace()
        .filter(|w| w.chars().count() > 1)
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect();

    let readability = (100.0 - text.chars().count() as f64 * 0.1).clamp(0.0, 100.0);
    let engagement_potential =
        (readability * 0.5 + positive as f64 * 10.0 + topics.len() as f64 * 15.0).clamp(0.0, 100.0);

    ContentAnalysis {
        sentiment,
        topics,
        keywords,
        readability,
        engagement_potential,
        served_by: ServedBy::Fallback,
    }
}

/// Topics followed by the first keywords, de-duplicated in order
pub fn extract_tags(text: &str) -> TagExtraction {
    let analysis = analyze_content(text);

    let mut tags: Vec<String> = Vec::with_capacity(MAX_TAGS);
    let candidates = analysis
        .topics
        .into_iter()
        .chain(analysis.keywords.into_iter().take(TAG_KEYWORDS));
    for tag in candidates {
        if tags.len() == MAX_TAGS {
            break;
        }
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    TagExtraction {
        tags,
        served_by: ServedBy::Fallback,
    }
}

pub fn predict_potential(text: &str) -> SpreadPotential {
    let analysis = analyze_content(text);
    let potential_score = (analysis.engagement_potential * 0.6
        + analysis.readability * 0.3
        + analysis.topics.len() as f64 * 5.0)
        .clamp(0.0, 100.0);

    SpreadPotential {
        potential_score,
        served_by: ServedBy::Fallback,
    }
}
