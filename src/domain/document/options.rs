//! 交互选项页脚
//!
//! 模型在回复末尾输出 `Options: [A] [B]` 作为快捷回复建议，
//! 解析正文前必须整体剥离

use once_cell::sync::Lazy;
use regex::Regex;

/// 从 Options 标记一直匹配到文本末尾
static OPTIONS_FOOTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|\n)\s*(?:\*\*|__)?Options(?:\*\*|__)?[:：][\s\S]*$")
        .expect("invalid options footer regex")
});

static OPTION_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(.*?)\]").expect("invalid option item regex"));

/// 页脚标记字面量（标题抽取时用于排除误匹配）
pub const OPTIONS_MARKER: &str = "Options";

/// 剥离页脚并去掉首尾空白
pub fn strip_options(text: &str) -> String {
    OPTIONS_FOOTER.replace(text, "").trim().to_string()
}

/// 提取页脚中的快捷回复
pub fn extract_options(text: &str) -> Vec<String> {
    let Some(footer) = OPTIONS_FOOTER.find(text) else {
        return Vec::new();
    };
    OPTION_ITEM
        .captures_iter(footer.as_str())
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// 追加新的页脚
pub fn append_options(text: &str, options: &[&str]) -> String {
    let items = options
        .iter()
        .map(|option| format!("[{}]", option))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}\n\nOptions: {}", text, items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_round_trip() {
        let texts = ["## 第1章 风起\n\n正文第一段。", "", "  前后空白  ", "**加粗**\n列表：1. 2."];
        for text in texts {
            let with_footer = format!("{}\nOptions: [A] [B]", text);
            assert_eq!(strip_options(&with_footer), strip_options(text));
        }
    }

    #[test]
    fn test_strip_variants() {
        assert_eq!(strip_options("正文\n**Options**：[继续]"), "正文");
        assert_eq!(strip_options("正文\n  __options__: [继续]\n[重写]"), "正文");
        assert_eq!(strip_options("Options: [A]"), "");
        // 行内出现的单词不是页脚
        assert_eq!(strip_options("My Options are: none"), "My Options are: none");
    }

    #[test]
    fn test_extract_options() {
        let text = "正文\n\nOptions: [继续写下一章] [重写本章] [ ]";
        assert_eq!(extract_options(text), vec!["继续写下一章", "重写本章"]);
        assert!(extract_options("没有页脚 [A]").is_empty());
    }

    #[test]
    fn test_append_options() {
        let text = append_options("正文", &["继续写下一章", "重写本章"]);
        assert_eq!(text, "正文\n\nOptions: [继续写下一章] [重写本章]");
        assert_eq!(strip_options(&text), "正文");
    }
}
