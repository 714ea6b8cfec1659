//! 配置自动抽取
//!
//! 只在模型消息生成完成后运行一次，流式片段不参与。
//! 每个值仅在与当前配置不同时才写入补丁，重复公告不会反复改写配置

use once_cell::sync::Lazy;
use regex::Regex;

use super::{parse_chinese_numeral, sanitize_title, strip_options, OPTIONS_MARKER};
use crate::domain::novel::{ConfigPatch, GenerationConfig};

static TITLE_ANNOUNCEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:书名|小说名)[:：]\s*《?([^》\n]+)》?").expect("invalid title announcement regex")
});

static TOTAL_CHAPTERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:全书预计|本书共|总共|预计|计划|共|规划|设定为|包含|total|target)[^\d\n第]{0,10}?([0-9]+|[一二三四五六七八九十百千零〇两]+)\s*章",
    )
    .expect("invalid total chapters regex")
});

static WORDS_PER_CHAPTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:每章|单章|字数目标|字数|设定为|words)[^\d\n]{0,10}?([0-9]+|[一二三四五六七八九十百千零〇两]+)\s*字",
    )
    .expect("invalid words per chapter regex")
});

/// 标题长度上限（超过说明误捕获了整段文字）
const TITLE_MAX_CHARS: usize = 30;
/// 总章节数下限（排除 "第3章" 之类的正文引用）
const MIN_TOTAL_CHAPTERS: u32 = 10;
/// 每章字数下限
const MIN_WORDS_PER_CHAPTER: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// 新标题（已清洗，且与当前标题不同）
    pub title: Option<String>,
    pub patch: ConfigPatch,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.patch.is_empty()
    }
}

/// 提取 `书名：《X》` 公告中的标题
pub fn extract_announced_title(content: &str) -> Option<String> {
    let raw = TITLE_ANNOUNCEMENT.captures(content)?.get(1)?.as_str();
    if raw.contains(OPTIONS_MARKER) || raw.chars().count() >= TITLE_MAX_CHARS {
        return None;
    }
    let title = sanitize_title(raw);
    (!title.is_empty()).then_some(title)
}

fn parse_number(raw: &str) -> Option<u32> {
    if raw.chars().all(|c| c.is_ascii_digit()) {
        raw.parse().ok()
    } else {
        parse_chinese_numeral(raw)
    }
}

fn first_above(regex: &Regex, text: &str, floor: u32) -> Option<u32> {
    regex
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).and_then(|m| parse_number(m.as_str())))
        .find(|value| *value > floor)
}

/// 从完成的模型消息中抽取配置变更
pub fn extract_config(content: &str, current_title: &str, config: &GenerationConfig) -> Extraction {
    let text = strip_options(content);
    let mut extraction = Extraction::default();

    if let Some(title) = extract_announced_title(&text) {
        if title != current_title {
            extraction.title = Some(title);
        }
    }

    if let Some(total) = first_above(&TOTAL_CHAPTERS, &text, MIN_TOTAL_CHAPTERS) {
        if total != config.target_total_chapters {
            extraction.patch.target_total_chapters = Some(total);
        }
    }

    if let Some(words) = first_above(&WORDS_PER_CHAPTER, &text, MIN_WORDS_PER_CHAPTER) {
        if words != config.target_words_per_chapter {
            extraction.patch.target_words_per_chapter = Some(words);
        }
    }

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_announcement() {
        let text = "好的！\n书名：《雾都疑云》\n全书预计 80 章，每章 3500 字。\n\nOptions: [开始]";
        let extraction = extract_config(text, "未命名小说", &GenerationConfig::default());
        assert_eq!(extraction.title.as_deref(), Some("雾都疑云"));
        assert_eq!(extraction.patch.target_total_chapters, Some(80));
        assert_eq!(extraction.patch.target_words_per_chapter, Some(3500));
    }

    #[test]
    fn test_unchanged_values_not_patched() {
        let config = GenerationConfig::default();
        let text = "小说名：《雾都》\n本书共20章，每章3000字";
        let extraction = extract_config(text, "雾都", &config);
        assert!(extraction.is_empty());
    }

    #[test]
    fn test_chapter_reference_without_cue_ignored() {
        let config = GenerationConfig::default();
        let text = "他在第35章埋下的伏笔，终于在35章之后揭开。";
        let extraction = extract_config(text, "雾都", &config);
        assert_eq!(extraction.patch.target_total_chapters, None);
    }

    #[test]
    fn test_small_counts_below_floor() {
        let text = "本卷共3章，每章50字";
        let extraction = extract_config(text, "雾都", &GenerationConfig::default());
        assert!(extraction.is_empty());
    }

    #[test]
    fn test_chinese_numerals() {
        let text = "计划写一百二十章";
        let extraction = extract_config(text, "雾都", &GenerationConfig::default());
        assert_eq!(extraction.patch.target_total_chapters, Some(120));
    }

    #[test]
    fn test_title_guards() {
        assert_eq!(extract_announced_title("书名：《**星海**》"), Some("星海".to_string()));
        assert_eq!(extract_announced_title("书名：Options: [A]"), None);
        let long = format!("书名：{}", "长".repeat(40));
        assert_eq!(extract_announced_title(&long), None);
        assert_eq!(extract_announced_title("没有书名"), None);
    }
}
