use ammonia::Builder;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

use super::highlight::Highlighter;

/// Rendering options, the counterpart of a markdown renderer's global setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterOptions {
    /// GitHub-flavored extensions: tables, strikethrough, task lists.
    pub gfm: bool,
    /// Treat single newlines as `<br />`.
    pub breaks: bool,
    /// Prefix for the language class on `<code>`.
    pub lang_prefix: String,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            breaks: true,
            lang_prefix: "hljs language-".to_string(),
        }
    }
}

/// Turns markdown into sanitized HTML with highlighted code blocks.
pub struct MarkdownFormatter {
    options: FormatterOptions,
    highlighter: Highlighter,
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new(FormatterOptions::default())
    }
}

impl MarkdownFormatter {
    pub fn new(options: FormatterOptions) -> Self {
        Self {
            options,
            highlighter: Highlighter::new(),
        }
    }

    /// Replaces the rendering options. Safe to call repeatedly.
    pub fn configure(&mut self, options: FormatterOptions) {
        self.options = options;
    }

    pub fn format(&self, text: &str) -> String {
        let mut parser_options = Options::empty();
        if self.options.gfm {
            parser_options.insert(Options::ENABLE_TABLES);
            parser_options.insert(Options::ENABLE_STRIKETHROUGH);
            parser_options.insert(Options::ENABLE_TASKLISTS);
            parser_options.insert(Options::ENABLE_GFM);
        }

        let parser = Parser::new_ext(text, parser_options);
        let events = self.rewrite_events(parser);

        let mut rendered = String::with_capacity(text.len() * 2);
        html::push_html(&mut rendered, events.into_iter());

        sanitize(&rendered)
    }

    /// Applies line-break semantics and replaces code blocks with
    /// highlighted markup. Raw HTML is left for `sanitize` to filter.
    fn rewrite_events<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        let mut code_block: Option<(Option<String>, String)> = None;

        for event in parser {
            if let Some((_, code)) = code_block.as_mut() {
                match event {
                    Event::Text(text) => code.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some((lang, code)) = code_block.take() {
                            events.push(Event::Html(self.render_code_block(lang.as_deref(), &code).into()));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::SoftBreak if self.options.breaks => events.push(Event::HardBreak),
                other => events.push(other),
            }
        }

        // An unterminated block still renders what it collected.
        if let Some((lang, code)) = code_block.take() {
            events.push(Event::Html(CowStr::from(self.render_code_block(lang.as_deref(), &code))));
        }

        events
    }

    fn render_code_block(&self, lang: Option<&str>, code: &str) -> String {
        let highlighted = self.highlighter.highlight(code, lang);
        format!(
            "<pre><code class=\"{}{}\">{}</code></pre>\n",
            self.options.lang_prefix, highlighted.language, highlighted.html
        )
    }
}

/// Allow-list sanitization of the rendered document. `script` and `style`
/// are dropped together with their content.
fn sanitize(html: &str) -> String {
    let mut builder = Builder::default();
    builder
        .add_tags(&["input"])
        .add_tag_attributes("code", &["class"])
        .add_tag_attributes("span", &["class"])
        .add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.clean(html).to_string()
}
