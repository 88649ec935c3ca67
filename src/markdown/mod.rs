mod blocks;
mod formatter;
mod highlight;

pub use blocks::{extract_code_blocks, strip_markdown};
pub use formatter::MarkdownFormatter;
