/// AI Prompt 模板
///
/// 页面摘要使用固定格式的 prompt，标题和正文原样嵌入

/// 页面摘要模板
const PAGE_SUMMARY_TEMPLATE: &str = "Please summarize the following content in a concise way and extract key topics as tags:
        Title: {title}
        Content: {content}";

/// 构建页面摘要 prompt
pub fn page_summary_prompt(title: &str, content: &str) -> String {
    // 分段替换，正文里出现的占位符不会被二次展开
    let (head, tail) = PAGE_SUMMARY_TEMPLATE
        .split_once("{title}")
        .unwrap_or((PAGE_SUMMARY_TEMPLATE, ""));
    let (middle, end) = tail.split_once("{content}").unwrap_or((tail, ""));

    format!("{head}{title}{middle}{content}{end}")
}
