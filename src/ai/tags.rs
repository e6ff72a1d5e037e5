/// 从摘要文本中提取标签
///
/// 只是简单的分词过滤，不做任何语义分析：
/// 小写 → 按空白切分 → 去重（保留首次出现顺序）→ 去停用词 → 去掉不超过 3 个字符的词 → 取前 5 个

use std::collections::HashSet;

/// 最多保留的标签数
pub const MAX_TAGS: usize = 5;

/// 停用词
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

pub fn extract_tags(summary: &str) -> Vec<String> {
    let lowered = summary.to_lowercase();
    let mut seen = HashSet::new();

    lowered
        .split_whitespace()
        .filter(|word| seen.insert(*word))
        .filter(|word| word.chars().count() > 3 && !STOP_WORDS.contains(word))
        .take(MAX_TAGS)
        .map(str::to_string)
        .collect()
}
