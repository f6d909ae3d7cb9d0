use std::fmt::Write as _;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

/// Create a `pulldown-cmark` parser with our default options enabled.
pub fn parser(source: &str) -> Parser<'_> {
    Parser::new_ext(source, options())
}

/// Convert markdown source to an HTML fragment.
pub fn render(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut out, parser(source));
    out
}

/// Anything that can turn markdown into HTML for the preview surface.
pub trait Render {
    fn render(&self, source: &str) -> String;
}

/// The default renderer, backed by [`render`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CommonMark;

impl Render for CommonMark {
    fn render(&self, source: &str) -> String {
        render(source)
    }
}

impl<F> Render for F
where
    F: Fn(&str) -> String,
{
    fn render(&self, source: &str) -> String {
        self(source)
    }
}

/// Render markdown to a simple plain-text representation.
///
/// Used by the CLI `preview` command.
pub fn plain_text(source: &str) -> String {
    let mut out = String::new();
    let mut last_was_newline = true;
    // Next ordinal for each open list; `None` for bullet lists.
    let mut lists: Vec<Option<u64>> = Vec::new();

    let push_newline = |out: &mut String, last_was_newline: &mut bool| {
        if !*last_was_newline {
            out.push('\n');
            *last_was_newline = true;
        }
    };

    for event in parser(source) {
        match event {
            Event::Text(text) | Event::Code(text) => {
                out.push_str(text.as_ref());
                last_was_newline = false;
            }
            Event::SoftBreak | Event::HardBreak => push_newline(&mut out, &mut last_was_newline),
            Event::Rule => {
                push_newline(&mut out, &mut last_was_newline);
                out.push_str("---");
                last_was_newline = false;
                push_newline(&mut out, &mut last_was_newline);
            }
            Event::Start(Tag::List(start)) => {
                push_newline(&mut out, &mut last_was_newline);
                lists.push(start);
            }
            Event::Start(Tag::Item) => {
                push_newline(&mut out, &mut last_was_newline);
                out.push_str(&"  ".repeat(lists.len().saturating_sub(1)));
                match lists.last_mut() {
                    Some(Some(next)) => {
                        let _ = write!(out, "{next}. ");
                        *next += 1;
                    }
                    _ => out.push_str("- "),
                }
                last_was_newline = false;
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                push_newline(&mut out, &mut last_was_newline);
            }
            Event::TaskListMarker(checked) => {
                out.push_str(if checked { "[x] " } else { "[ ] " });
                last_was_newline = false;
            }
            Event::End(end) => match end {
                TagEnd::Paragraph
                | TagEnd::Heading { .. }
                | TagEnd::BlockQuote(_)
                | TagEnd::CodeBlock
                | TagEnd::Item
                | TagEnd::Table
                | TagEnd::TableHead
                | TagEnd::TableRow => push_newline(&mut out, &mut last_was_newline),
                TagEnd::TableCell => {
                    if !last_was_newline {
                        out.push('\t');
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    out
}
