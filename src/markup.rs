//! Inline markup inside chunk text.
//!
//! The only markup is `<b>...</b>`. A bold run must be non-empty and may not
//! contain `<`; anything else is kept as literal text.

const OPEN: &str = "<b>";
const CLOSE: &str = "</b>";

/// A run of text with uniform styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Span {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Span {
            text: text.into(),
            bold: true,
        }
    }
}

/// Split chunk text into plain and bold spans. Empty spans are dropped.
pub fn parse_inline(content: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut emitted = 0;
    let mut search = 0;

    while let Some(rel) = content[search..].find(OPEN) {
        let open = search + rel;
        let body_start = open + OPEN.len();
        let body_len = content[body_start..]
            .find(|c| c == '<')
            .filter(|&n| n > 0 && content[body_start + n..].starts_with(CLOSE));

        match body_len {
            Some(n) => {
                if open > emitted {
                    spans.push(Span::plain(&content[emitted..open]));
                }
                spans.push(Span::bold(&content[body_start..body_start + n]));
                emitted = body_start + n + CLOSE.len();
                search = emitted;
            }
            None => search = open + 1,
        }
    }

    if emitted < content.len() {
        spans.push(Span::plain(&content[emitted..]));
    }
    spans
}
