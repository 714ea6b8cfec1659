//! 标题清洗

use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[#>\s]+").expect("invalid leading markup regex"));

static LIST_NUMBERING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[.、)）]\s*").expect("invalid list numbering regex"));

/// 结尾的括号注释，如 `（上）`、`(draft)`
static TRAILING_ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?:（[^（）]*）|\([^()]*\))\s*$").expect("invalid trailing annotation regex")
});

const STRIPPED_CHARS: &[char] = &[
    '*', '`', '~', '【', '】', '《', '》', '[', ']', '「', '」', '『', '』',
];

/// 清洗标题：去掉 markdown 强调、括号类字符与结尾括注
pub fn sanitize_title(raw: &str) -> String {
    let title = LEADING_MARKUP.replace(raw.trim(), "");
    let title = LIST_NUMBERING.replace(&title, "");
    let title: String = title
        .replace("__", "")
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect();
    TRAILING_ANNOTATION.replace(title.trim(), "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("## **第1章 风起**"), "第1章 风起");
        assert_eq!(sanitize_title("《雾都》"), "雾都");
        assert_eq!(sanitize_title("【角色档案】"), "角色档案");
        assert_eq!(sanitize_title("角色档案（更新版）"), "角色档案");
        assert_eq!(sanitize_title("World (draft) "), "World");
        assert_eq!(sanitize_title("1. 大纲"), "大纲");
        assert_eq!(sanitize_title("> __目录__"), "目录");
        assert_eq!(sanitize_title("**"), "");
    }
}
