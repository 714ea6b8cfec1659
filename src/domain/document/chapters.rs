//! 章节组装

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{HeaderVocabulary, Section};
use crate::domain::novel::MessageId;

static CHAPTER_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"第([0-9]+|[一二三四五六七八九十百千零〇两]+)章").expect("invalid chapter number regex")
});

/// 不计入字数的 markdown 字符
const MARKDOWN_CHARS: &[char] = &['#', '*', '`', '>', '~'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// `{来源消息ID}-{段落序号}`，流式更新期间保持稳定
    pub id: String,
    pub message_id: MessageId,
    pub number: Option<u32>,
    pub title: String,
    pub content: String,
    pub word_count: usize,
    #[serde(skip)]
    pub timestamp: i64,
}

/// 解析中文数字（支持 十/百/千 与 零/两）
pub fn parse_chinese_numeral(text: &str) -> Option<u32> {
    fn digit(c: char) -> Option<u32> {
        match c {
            '零' | '〇' => Some(0),
            '一' => Some(1),
            '二' | '两' => Some(2),
            '三' => Some(3),
            '四' => Some(4),
            '五' => Some(5),
            '六' => Some(6),
            '七' => Some(7),
            '八' => Some(8),
            '九' => Some(9),
            _ => None,
        }
    }
    fn unit(c: char) -> Option<u32> {
        match c {
            '十' => Some(10),
            '百' => Some(100),
            '千' => Some(1000),
            _ => None,
        }
    }

    if text.is_empty() {
        return None;
    }

    // 无单位时按逐位读法处理，如 "二〇二"
    if !text.chars().any(|c| unit(c).is_some()) {
        return text.chars().try_fold(0u32, |acc, c| {
            digit(c).and_then(|d| acc.checked_mul(10)?.checked_add(d))
        });
    }

    let mut total = 0u32;
    let mut current = 0u32;
    for c in text.chars() {
        if let Some(d) = digit(c) {
            current = d;
        } else if let Some(u) = unit(c) {
            let factor = if current == 0 { 1 } else { current };
            total = total.checked_add(factor.checked_mul(u)?)?;
            current = 0;
        } else {
            return None;
        }
    }
    total.checked_add(current)
}

/// 从标题中解析章节序号
pub fn parse_chapter_number(title: &str) -> Option<u32> {
    let raw = CHAPTER_NUMBER.captures(title)?.get(1)?.as_str();
    if raw.chars().all(|c| c.is_ascii_digit()) {
        raw.parse().ok()
    } else {
        parse_chinese_numeral(raw)
    }
}

/// 可见字数：去掉空白与 markdown 符号后的字符数
pub fn count_words(content: &str) -> usize {
    content
        .chars()
        .filter(|c| !c.is_whitespace() && !MARKDOWN_CHARS.contains(c))
        .count()
}

/// 排除目录类标题，按章节序号排序（无法解析的排最后，同号按时间）
pub fn assemble_chapters(candidates: &[Section], vocabulary: &HeaderVocabulary) -> Vec<Chapter> {
    let mut chapters: Vec<Chapter> = candidates
        .iter()
        .filter(|section| !vocabulary.is_toc(&section.title))
        .map(|section| Chapter {
            id: format!("{}-{}", section.source_message_id, section.ordinal),
            message_id: section.source_message_id.clone(),
            number: parse_chapter_number(&section.title),
            title: section.title.clone(),
            content: section.content.clone(),
            word_count: count_words(&section.content),
            timestamp: section.timestamp,
        })
        .collect();

    chapters.sort_by_key(|chapter| (chapter.number.is_none(), chapter.number, chapter.timestamp));
    chapters
}
