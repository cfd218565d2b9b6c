use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag};

use crate::openai::{Message, Role};

/// Glyph shown at the end of a reply that is still streaming.
pub const TYPING_CURSOR: &str = "▍";

const WRAPPED_CURSOR: &str = "`▍`";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Plain text shown as typed
    Text(String),
    /// Markdown source of prose between code blocks
    Markdown(String),
    Code {
        language: String,
        value: String,
        highlighted: String,
    },
    Cursor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub role: Role,
    pub segments: Vec<Segment>,
}

/// Syntax highlighting for fenced code blocks.
pub trait Highlighter {
    fn highlight(&self, language: &str, code: &str) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&self, _language: &str, code: &str) -> String {
        code.to_string()
    }
}

#[derive(Default)]
pub struct TranscriptRenderer<H: Highlighter = PlainHighlighter> {
    highlighter: H,
}

impl<H: Highlighter> TranscriptRenderer<H> {
    pub fn new(highlighter: H) -> Self {
        Self { highlighter }
    }

    /// Blocks for every user and assistant turn in order. System
    /// turns are instructions and aren't shown.
    pub fn render_transcript(&self, messages: &[Message]) -> Vec<Block> {
        messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| self.render_turn(m))
            .collect()
    }

    pub fn render_turn(&self, message: &Message) -> Block {
        let segments = match message.role {
            Role::Assistant => self.render_markdown(&message.content),
            _ => vec![Segment::Text(message.content.clone())],
        };
        Block {
            role: message.role.clone(),
            segments,
        }
    }

    fn render_markdown(&self, content: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        // Byte offset of prose not yet emitted
        let mut prose_start = 0;
        let mut code: Option<(String, String)> = None;

        for (event, range) in Parser::new(content).into_offset_iter() {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    push_prose(&mut segments, &content[prose_start..range.start]);
                    let language = match kind {
                        CodeBlockKind::Fenced(info) => {
                            info.split_whitespace().next().unwrap_or("").to_string()
                        }
                        CodeBlockKind::Indented => String::new(),
                    };
                    code = Some((language, String::new()));
                }
                Event::Text(text) => {
                    if let Some((_, value)) = code.as_mut() {
                        value.push_str(&text);
                    }
                }
                Event::End(Tag::CodeBlock(_)) => {
                    if let Some((language, value)) = code.take() {
                        let value = value.replace(WRAPPED_CURSOR, TYPING_CURSOR);
                        let value = value.strip_suffix('\n').unwrap_or(&value).to_string();
                        let highlighted = self.highlighter.highlight(&language, &value);
                        segments.push(Segment::Code {
                            language,
                            value,
                            highlighted,
                        });
                    }
                    prose_start = range.end;
                }
                Event::Code(text) if code.is_none() && text.as_ref() == TYPING_CURSOR => {
                    push_prose(&mut segments, &content[prose_start..range.start]);
                    segments.push(Segment::Cursor);
                    prose_start = range.end;
                }
                _ => {}
            }
        }
        push_prose(&mut segments, &content[prose_start..]);

        segments
    }
}

// Blank lines around code blocks carry no meaning once split out
fn push_prose(segments: &mut Vec<Segment>, text: &str) {
    let text = text.trim_matches('\n');
    if !text.trim().is_empty() {
        segments.push(Segment::Markdown(text.to_string()));
    }
}
