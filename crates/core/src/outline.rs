use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$").expect("heading pattern is valid")
});
static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(```|~~~)").expect("fence pattern is valid"));
static SLUG_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s_-]").expect("slug pattern is valid"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"));

/// 文件統計。 / Counts shown in the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentStats {
    pub words: usize,
    pub characters: usize,
    pub characters_no_spaces: usize,
    pub lines: usize,
    pub paragraphs: usize,
}

impl DocumentStats {
    /// 空白行（含只有空白的行）分隔段落；空文字仍算一行。 / Blank or whitespace-only lines separate paragraphs; empty text still counts as one line.
    pub fn of(text: &str) -> Self {
        let paragraphs = PARAGRAPH_BREAK
            .split(text)
            .filter(|block| !block.trim().is_empty())
            .count();
        Self {
            words: text.split_whitespace().count(),
            characters: text.chars().count(),
            characters_no_spaces: text.chars().filter(|c| !c.is_whitespace()).count(),
            lines: text.split('\n').count(),
            paragraphs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub title: String,
    pub anchor: String,
    /// 自 0 起算的行號。 / Zero-based line index.
    pub line: usize,
}

/// 列出 ATX 標題，略過程式碼區塊內的內容。 / ATX headings in document order, skipping fenced code.
pub fn table_of_contents(text: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut in_fence = false;
    for (line_index, line) in text.lines().enumerate() {
        if FENCE.is_match(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = HEADING.captures(line) {
            let title = caps[2].trim().to_string();
            headings.push(Heading {
                level: caps[1].len() as u8,
                anchor: slugify(&title),
                title,
                line: line_index,
            });
        }
    }
    headings
}

/// 第一個一級標題。 / Text of the first level-one heading.
pub fn document_title(text: &str) -> Option<String> {
    table_of_contents(text)
        .into_iter()
        .find(|heading| heading.level == 1)
        .map(|heading| heading.title)
}

pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let stripped = SLUG_STRIP.replace_all(&lowered, "");
    WHITESPACE.replace_all(stripped.trim(), "-").into_owned()
}
