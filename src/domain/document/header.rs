//! 分级标题识别
//!
//! 生成器输出不是规范的 markdown，按置信度分三级判定一行是否开启新段落:
//! 1. markdown 标题（1-3 个 `#`）：二级及以上总是接受，三级需命中强标题
//! 2. 独立加粗行：长度受限且必须命中强标题
//! 3. `标签：内容` 行：仅在当前没有打开的段落时接受

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{sanitize_title, HeaderVocabulary};

/// 章节标记 `第N章`
pub(crate) static CHAPTER_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"第[0-9一二三四五六七八九十百千零〇两]+章").expect("invalid chapter marker regex")
});

static MARKDOWN_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s{0,3}(#{1,3})\s*([^#].*)$").expect("invalid markdown header regex")
});

static BOLD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\*\*([^*]+)\*\*|__([^_]+)__)\s*[:：]?\s*$").expect("invalid bold line regex")
});

static LABEL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([^:：]+?)\s*[:：]\s*(.*)$").expect("invalid label line regex"));

/// 标签中出现这些字符说明是一句话而不是标签
const SENTENCE_CHARS: &[char] = &[
    '，', '。', '！', '？', '、', '；', ',', '!', '?', ';', '"', '“', '”', '‘', '’', '\'', '「',
    '」', '/',
];

pub const DEFAULT_BOLD_HEADER_MAX_CHARS: usize = 40;
pub const DEFAULT_LABEL_MAX_CHARS: usize = 16;

/// 段落解析规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseRules {
    pub vocabulary: HeaderVocabulary,
    pub bold_header_max_chars: usize,
    pub label_max_chars: usize,
}

impl Default for ParseRules {
    fn default() -> Self {
        Self {
            vocabulary: HeaderVocabulary::default(),
            bold_header_max_chars: DEFAULT_BOLD_HEADER_MAX_CHARS,
            label_max_chars: DEFAULT_LABEL_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderTier {
    Markdown { level: usize },
    Bold,
    Label,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    pub tier: HeaderTier,
    pub title: String,
    /// `标签：内容` 行的行内内容，作为新段落的第一行
    pub inline: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HeaderDetector {
    rules: ParseRules,
}

impl HeaderDetector {
    pub fn new(rules: ParseRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ParseRules {
        &self.rules
    }

    pub fn vocabulary(&self) -> &HeaderVocabulary {
        &self.rules.vocabulary
    }

    /// 强标题：命中词表或章节标记
    pub fn is_strong(&self, title: &str) -> bool {
        self.rules.vocabulary.is_strong(title) || CHAPTER_MARKER.is_match(title)
    }

    /// 判定一行是否开启新段落
    pub fn detect(&self, line: &str, section_open: bool) -> Option<HeaderMatch> {
        if let Some(caps) = MARKDOWN_HEADER.captures(line) {
            let level = caps.get(1).map_or(0, |m| m.as_str().len());
            let title = sanitize_title(caps.get(2).map_or("", |m| m.as_str()));
            if title.is_empty() || (level == 3 && !self.is_strong(&title)) {
                return None;
            }
            return Some(HeaderMatch {
                tier: HeaderTier::Markdown { level },
                title,
                inline: None,
            });
        }

        if let Some(caps) = BOLD_LINE.captures(line) {
            let raw = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            if raw.chars().count() > self.rules.bold_header_max_chars {
                return None;
            }
            let title = sanitize_title(raw);
            if title.is_empty() || !self.is_strong(&title) {
                return None;
            }
            return Some(HeaderMatch {
                tier: HeaderTier::Bold,
                title,
                inline: None,
            });
        }

        if section_open {
            return None;
        }
        self.detect_label(line)
    }

    fn detect_label(&self, line: &str) -> Option<HeaderMatch> {
        let caps = LABEL_LINE.captures(line)?;
        let label = caps.get(1).map_or("", |m| m.as_str());
        let rest = caps.get(2).map_or("", |m| m.as_str()).trim();

        let lower = label.to_lowercase();
        if lower.ends_with("http") || lower.ends_with("https") || rest.starts_with("//") {
            return None;
        }
        if label.chars().count() > self.rules.label_max_chars
            || label.contains(SENTENCE_CHARS)
        {
            return None;
        }

        let title = sanitize_title(label);
        if title.is_empty() {
            return None;
        }
        Some(HeaderMatch {
            tier: HeaderTier::Label,
            title,
            inline: (!rest.is_empty()).then(|| rest.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> HeaderDetector {
        HeaderDetector::default()
    }

    #[test]
    fn test_markdown_levels() {
        let d = detector();
        let m = d.detect("## 第1章 风起", true).unwrap();
        assert_eq!(m.tier, HeaderTier::Markdown { level: 2 });
        assert_eq!(m.title, "第1章 风起");

        assert!(d.detect("# 随便什么", true).is_some());
        // 三级标题需要强标题
        assert!(d.detect("### 一个小插曲", true).is_none());
        assert!(d.detect("### 角色档案", true).is_some());
        assert!(d.detect("### 第3章 雨夜", true).is_some());
        // 四级及以上不是段落标题
        assert!(d.detect("#### 角色档案", true).is_none());
        assert!(d.detect("## ", false).is_none());
    }

    #[test]
    fn test_bold_requires_strong_vocabulary() {
        let d = detector();
        assert!(d.detect("**小心！**", true).is_none());
        assert!(d.detect("**Boom!**", false).is_none());

        let m = d.detect("**角色档案**", true).unwrap();
        assert_eq!(m.tier, HeaderTier::Bold);
        assert_eq!(m.title, "角色档案");
        assert!(d.detect("__世界观__：", true).is_some());

        let long = format!("**角色{}**", "长".repeat(50));
        assert!(d.detect(&long, true).is_none());
    }

    #[test]
    fn test_label_only_without_open_section() {
        let d = detector();
        let m = d.detect("书名：《雾都》", false).unwrap();
        assert_eq!(m.tier, HeaderTier::Label);
        assert_eq!(m.title, "书名");
        assert_eq!(m.inline.as_deref(), Some("《雾都》"));

        assert!(d.detect("书名：《雾都》", true).is_none());
    }

    #[test]
    fn test_label_rejects_sentences_and_urls() {
        let d = detector();
        assert!(d.detect("“走吧：他说", false).is_none());
        assert!(d.detect("好的，这是设定：", false).is_none());
        assert!(d.detect("https://example.com", false).is_none());
        assert!(d.detect("这是一个非常非常非常非常非常非常长的标签：值", false).is_none());
        assert!(d.detect("普通的一行正文", false).is_none());
    }

    #[test]
    fn test_custom_vocabulary() {
        let rules = ParseRules {
            vocabulary: HeaderVocabulary {
                strong: vec!["Prologue".into()],
                ..HeaderVocabulary::default()
            },
            ..ParseRules::default()
        };
        let d = HeaderDetector::new(rules);
        assert!(d.detect("**Prologue**", true).is_some());
        assert!(d.detect("**角色档案**", true).is_none());
    }
}
