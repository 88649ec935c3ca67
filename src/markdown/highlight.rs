use ammonia::clean_text;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tracing::debug;

pub const PLAINTEXT: &str = "plaintext";

/// Token classes carry the same prefix highlight.js themes use.
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hljs-" };

/// Result of highlighting one code block.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlighted {
    /// Language label that was actually applied.
    pub language: String,
    /// HTML for the inside of a `<code>` element.
    pub html: String,
}

/// Class-based syntax highlighter for fenced code blocks.
pub struct Highlighter {
    syntaxes: SyntaxSet,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    fn find_declared(&self, lang: &str) -> Option<&SyntaxReference> {
        let lang = lang.trim();
        if lang.is_empty() || lang.eq_ignore_ascii_case(PLAINTEXT) {
            return None;
        }
        self.syntaxes.find_syntax_by_token(lang)
    }

    fn detect(&self, code: &str) -> Option<&SyntaxReference> {
        let first_line = code.lines().next()?;
        self.syntaxes
            .find_syntax_by_first_line(first_line)
            .filter(|syntax| syntax.name != self.syntaxes.find_syntax_plain_text().name)
    }

    /// Picks the syntax for a block: the declared language if known, then
    /// first-line detection, otherwise nothing (plain text).
    fn resolve<'a>(&'a self, lang: Option<&str>, code: &str) -> Option<(String, &'a SyntaxReference)> {
        if let Some(lang) = lang {
            if let Some(syntax) = self.find_declared(lang) {
                return Some((lang.trim().to_ascii_lowercase(), syntax));
            }
        }
        self.detect(code).map(|syntax| (label_for(syntax), syntax))
    }

    pub fn highlight(&self, code: &str, lang: Option<&str>) -> Highlighted {
        let Some((language, syntax)) = self.resolve(lang, code) else {
            return Highlighted {
                language: PLAINTEXT.to_string(),
                html: clean_text(code),
            };
        };

        match self.classed_html(code, syntax) {
            Ok(html) => Highlighted { language, html },
            Err(err) => {
                debug!(%language, error = %err, "highlighting failed, rendering plain code");
                Highlighted {
                    language: PLAINTEXT.to_string(),
                    html: clean_text(code),
                }
            }
        }
    }

    fn classed_html(&self, code: &str, syntax: &SyntaxReference) -> Result<String, syntect::Error> {
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, CLASS_STYLE);
        for line in LinesWithEndings::from(code) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }
        Ok(generator.finalize())
    }
}

fn label_for(syntax: &SyntaxReference) -> String {
    syntax
        .file_extensions
        .first()
        .cloned()
        .unwrap_or_else(|| syntax.name.to_ascii_lowercase().replace(' ', "-"))
}
