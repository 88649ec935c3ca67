use lazy_static::lazy_static;
use regex::Regex;

use super::highlight::PLAINTEXT;

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"```([\w+#.-]*)[^\n]*\n([\s\S]*?)```").expect("valid fenced block pattern");
    static ref ANY_FENCE: Regex = Regex::new(r"```[\s\S]*?```").expect("valid fence pattern");
    static ref BOLD: Regex = Regex::new(r"\*\*(.*?)\*\*").expect("valid bold pattern");
    static ref ITALIC: Regex = Regex::new(r"\*(.*?)\*").expect("valid italic pattern");
    static ref LINK: Regex = Regex::new(r"\[(.*?)\]\(.*?\)").expect("valid link pattern");
    static ref HEADING: Regex = Regex::new(r"#+\s(.*)").expect("valid heading pattern");
    static ref INLINE_CODE: Regex = Regex::new(r"`(.*?)`").expect("valid inline code pattern");
}

pub const CODE_OMITTED: &str = "Code block omitted for speech.";

/// A fenced code block found in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
}

/// Scans `text` for fenced code blocks, in order of appearance.
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    FENCED_BLOCK
        .captures_iter(text)
        .map(|caps| {
            let language = caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|lang| !lang.is_empty())
                .unwrap_or(PLAINTEXT)
                .to_string();
            let code = caps.get(2).map(|m| m.as_str()).unwrap_or_default().to_string();
            CodeBlock { language, code }
        })
        .collect()
}

/// Reduces markdown to text suitable for reading aloud.
pub fn strip_markdown(text: &str) -> String {
    let text = ANY_FENCE.replace_all(text, CODE_OMITTED);
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "$1");
    INLINE_CODE.replace_all(&text, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_code_blocks() {
        let text = "Here:\n```rust\nfn main() {}\n```\nand\n```\nplain text\n```\n";
        let blocks = extract_code_blocks(text);

        assert_eq!(
            blocks,
            vec![
                CodeBlock {
                    language: "rust".to_string(),
                    code: "fn main() {}\n".to_string(),
                },
                CodeBlock {
                    language: PLAINTEXT.to_string(),
                    code: "plain text\n".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_extract_without_blocks() {
        assert!(extract_code_blocks("just `inline` code").is_empty());
    }

    #[test]
    fn test_strip_markdown_for_speech() {
        let text = "# Title\n**bold** and *soft* with [a link](https://example.com) and `code`\n```js\nalert(1)\n```";
        let plain = strip_markdown(text);

        assert_eq!(
            plain,
            "Title\nbold and soft with a link and code\nCode block omitted for speech."
        );
    }
}
