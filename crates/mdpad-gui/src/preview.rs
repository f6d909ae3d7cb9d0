#![forbid(unsafe_code)]

//! The preview surface.
//!
//! egui cannot display HTML, so the pane keeps two projections of the buffer: the HTML from
//! [`LivePreview`] (shown verbatim in source view) and a block list built from the same
//! `pulldown-cmark` events (drawn with egui widgets).

use eframe::egui;
use mdpad_core::{LivePreview, TextObserver, markdown};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Tag, TagEnd};

#[derive(Default)]
pub(crate) struct PreviewPane {
    html: LivePreview,
    blocks: Vec<Block>,
    pub(crate) show_source: bool,
}

impl PreviewPane {
    pub(crate) fn refresh(&mut self, text: &str) {
        self.html.refresh(text);
        self.blocks = parse(text);
    }

    pub(crate) fn show(&self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .id_salt("preview")
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                if self.show_source {
                    ui.add(
                        egui::Label::new(egui::RichText::new(self.html.html()).monospace())
                            .wrap()
                            .selectable(true),
                    );
                } else {
                    show_blocks(ui, &self.blocks);
                }
            });
    }
}

impl TextObserver for PreviewPane {
    fn text_changed(&mut self, text: &str) {
        self.refresh(text);
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Block {
    QuoteStart,
    QuoteEnd,
    Heading { level: u8, spans: Vec<Span> },
    Paragraph { spans: Vec<Span> },
    ListItem {
        depth: usize,
        task: Option<bool>,
        spans: Vec<Span>,
    },
    Code { language: Option<String>, code: String },
    /// The first row is the header; its spans are strong.
    Table { rows: Vec<Vec<Cell>> },
    Rule,
}

type Cell = Vec<Span>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct SpanStyle {
    strong: bool,
    emphasis: bool,
    code: bool,
    strikethrough: bool,
    link: bool,
}

#[derive(Clone, Debug, PartialEq)]
struct Span {
    text: String,
    style: SpanStyle,
}

#[derive(Clone, Copy, Debug)]
enum Open {
    Heading(u8),
    Paragraph,
    ListItem { depth: usize },
}

/// Inline state while walking the event stream.
#[derive(Default)]
struct Inline {
    strong: usize,
    emphasis: usize,
    strikethrough: usize,
    link: usize,
}

impl Inline {
    const fn style(&self, code: bool) -> SpanStyle {
        SpanStyle {
            strong: self.strong > 0,
            emphasis: self.emphasis > 0,
            code,
            strikethrough: self.strikethrough > 0,
            link: self.link > 0,
        }
    }
}

fn parse(source: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut open: Option<Open> = None;
    let mut spans = Vec::<Span>::new();
    let mut inline = Inline::default();
    let mut list_depth = 0usize;
    let mut task = None;
    let mut code: Option<(Option<String>, String)> = None;
    let mut rows = Vec::<Vec<Cell>>::new();
    let mut row = Vec::<Cell>::new();

    for event in markdown::parser(source) {
        match event {
            Event::Start(tag) => match tag {
                Tag::BlockQuote(_) => blocks.push(Block::QuoteStart),
                Tag::List(_) => {
                    // A nested list ends the text of the item that contains it.
                    if let Some(Open::ListItem { depth }) = open.take() {
                        let spans = std::mem::take(&mut spans);
                        let task = task.take();
                        blocks.push(Block::ListItem { depth, task, spans });
                    }
                    list_depth += 1;
                }
                Tag::Item => {
                    open = Some(Open::ListItem { depth: list_depth });
                    spans.clear();
                    task = None;
                }
                Tag::Paragraph if open.is_none() => {
                    open = Some(Open::Paragraph);
                    spans.clear();
                }
                Tag::Heading { level, .. } => {
                    open = Some(Open::Heading(heading_level(level)));
                    spans.clear();
                }
                Tag::Strong => inline.strong += 1,
                Tag::Emphasis => inline.emphasis += 1,
                Tag::Strikethrough => inline.strikethrough += 1,
                Tag::Link { .. } => inline.link += 1,
                Tag::CodeBlock(kind) => {
                    let language = match kind {
                        CodeBlockKind::Fenced(lang) => {
                            let lang = lang.trim();
                            (!lang.is_empty()).then(|| lang.to_owned())
                        }
                        CodeBlockKind::Indented => None,
                    };
                    code = Some((language, String::new()));
                }
                Tag::HtmlBlock => code = Some((Some("html".to_owned()), String::new())),
                Tag::Table(_) => rows.clear(),
                Tag::TableHead | Tag::TableRow => row.clear(),
                Tag::TableCell => spans.clear(),
                _ => {}
            },
            Event::End(end) => match end {
                TagEnd::BlockQuote(_) => blocks.push(Block::QuoteEnd),
                TagEnd::List(_) => list_depth = list_depth.saturating_sub(1),
                TagEnd::Strong => inline.strong = inline.strong.saturating_sub(1),
                TagEnd::Emphasis => inline.emphasis = inline.emphasis.saturating_sub(1),
                TagEnd::Strikethrough => {
                    inline.strikethrough = inline.strikethrough.saturating_sub(1);
                }
                TagEnd::Link => inline.link = inline.link.saturating_sub(1),
                TagEnd::CodeBlock | TagEnd::HtmlBlock => {
                    if let Some((language, code)) = code.take() {
                        blocks.push(Block::Code { language, code });
                    }
                }
                TagEnd::Heading(_) => {
                    if let Some(Open::Heading(level)) = open {
                        open = None;
                        let spans = std::mem::take(&mut spans);
                        blocks.push(Block::Heading { level, spans });
                    }
                }
                TagEnd::Paragraph => {
                    if let Some(Open::Paragraph) = open {
                        open = None;
                        let spans = std::mem::take(&mut spans);
                        blocks.push(Block::Paragraph { spans });
                    }
                }
                TagEnd::Item => {
                    if let Some(Open::ListItem { depth }) = open.take() {
                        let spans = std::mem::take(&mut spans);
                        let task = task.take();
                        blocks.push(Block::ListItem { depth, task, spans });
                    }
                }
                TagEnd::TableCell => row.push(std::mem::take(&mut spans)),
                TagEnd::TableHead => {
                    for span in row.iter_mut().flatten() {
                        span.style.strong = true;
                    }
                    rows.push(std::mem::take(&mut row));
                }
                TagEnd::TableRow => rows.push(std::mem::take(&mut row)),
                TagEnd::Table => blocks.push(Block::Table {
                    rows: std::mem::take(&mut rows),
                }),
                _ => {}
            },
            Event::TaskListMarker(checked) => task = Some(checked),
            Event::Text(text) => match &mut code {
                Some((_, code)) => code.push_str(&text),
                None => push_span(&mut spans, &text, inline.style(false)),
            },
            Event::Html(text) => match &mut code {
                Some((_, code)) => code.push_str(&text),
                None => push_span(&mut spans, &text, inline.style(true)),
            },
            Event::Code(text) | Event::InlineHtml(text) => {
                push_span(&mut spans, &text, inline.style(true));
            }
            Event::SoftBreak => push_span(&mut spans, " ", inline.style(false)),
            Event::HardBreak => push_span(&mut spans, "\n", inline.style(false)),
            Event::Rule => blocks.push(Block::Rule),
            _ => {}
        }
    }

    blocks
}

fn push_span(spans: &mut Vec<Span>, text: &str, style: SpanStyle) {
    if text.is_empty() {
        return;
    }

    match spans.last_mut() {
        Some(last) if last.style == style => last.text.push_str(text),
        _ => spans.push(Span {
            text: text.to_owned(),
            style,
        }),
    }
}

const fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn show_blocks(ui: &mut egui::Ui, blocks: &[Block]) {
    let body = egui::TextStyle::Body.resolve(ui.style());
    let mut quote_depth = 0usize;

    for (index, block) in blocks.iter().enumerate() {
        match block {
            Block::QuoteStart => quote_depth += 1,
            Block::QuoteEnd => quote_depth = quote_depth.saturating_sub(1),
            _ => with_quote(ui, quote_depth, |ui| match block {
                Block::Heading { level, spans } => {
                    let font = heading_font(ui, *level);
                    ui.add(egui::Label::new(layout_job(ui, spans, &font)).wrap());
                    ui.add_space(4.0);
                }
                Block::Paragraph { spans } => {
                    ui.add(egui::Label::new(layout_job(ui, spans, &body)).wrap());
                    ui.add_space(6.0);
                }
                Block::ListItem { depth, task, spans } => {
                    ui.horizontal_wrapped(|ui| {
                        ui.add_space(depth.saturating_sub(1) as f32 * 16.0);
                        if let Some(checked) = task {
                            let mut checked = *checked;
                            ui.add_enabled(false, egui::Checkbox::new(&mut checked, ""));
                        } else {
                            ui.label("\u{2022}");
                        }
                        ui.add(egui::Label::new(layout_job(ui, spans, &body)).wrap());
                    });
                    ui.add_space(2.0);
                }
                Block::Code { language, code } => {
                    if let Some(lang) = language.as_deref() {
                        ui.label(egui::RichText::new(lang).weak());
                    }
                    egui::Frame::group(ui.style())
                        .fill(ui.visuals().faint_bg_color)
                        .inner_margin(egui::Margin::same(8))
                        .show(ui, |ui| {
                            ui.add(
                                egui::Label::new(egui::RichText::new(code).monospace())
                                    .wrap()
                                    .selectable(true),
                            );
                        });
                    ui.add_space(6.0);
                }
                Block::Table { rows } => {
                    egui::Grid::new(("preview-table", index))
                        .striped(true)
                        .spacing([12.0, 4.0])
                        .show(ui, |ui| {
                            for row in rows {
                                for cell in row {
                                    ui.add(egui::Label::new(layout_job(ui, cell, &body)).wrap());
                                }
                                ui.end_row();
                            }
                        });
                    ui.add_space(6.0);
                }
                Block::Rule => {
                    ui.separator();
                    ui.add_space(6.0);
                }
                Block::QuoteStart | Block::QuoteEnd => {}
            }),
        }
    }
}

fn with_quote(ui: &mut egui::Ui, depth: usize, add_contents: impl FnOnce(&mut egui::Ui)) {
    if depth == 0 {
        add_contents(ui);
        return;
    }

    ui.horizontal(|ui| {
        ui.add_space((depth - 1) as f32 * 12.0);
        ui.colored_label(ui.visuals().weak_text_color(), "|");
        ui.add_space(4.0);
        ui.vertical(add_contents);
    });
}

fn heading_font(ui: &egui::Ui, level: u8) -> egui::FontId {
    let base = egui::TextStyle::Heading.resolve(ui.style());
    let scale = match level {
        1 => 1.3,
        2 => 1.15,
        3 => 1.05,
        _ => 0.95,
    };

    egui::FontId {
        size: base.size * scale,
        family: base.family,
    }
}

fn layout_job(ui: &egui::Ui, spans: &[Span], base: &egui::FontId) -> egui::text::LayoutJob {
    let mut job = egui::text::LayoutJob::default();
    let visuals = ui.visuals();

    for span in spans {
        let mut format = egui::text::TextFormat {
            font_id: if span.style.code {
                egui::FontId::monospace(base.size * 0.9)
            } else {
                base.clone()
            },
            color: if span.style.strong {
                visuals.strong_text_color()
            } else {
                visuals.text_color()
            },
            italics: span.style.emphasis,
            ..Default::default()
        };

        if span.style.code {
            format.background = visuals.code_bg_color;
        }
        if span.style.strikethrough {
            format.strikethrough = egui::Stroke::new(1.0, format.color);
        }
        if span.style.link {
            format.color = visuals.hyperlink_color;
            format.underline = egui::Stroke::new(1.0, visuals.hyperlink_color);
        }

        job.append(&span.text, 0.0, format);
    }

    job
}
