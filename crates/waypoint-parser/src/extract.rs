//! Fallback extraction of a JSON document embedded in prose

use serde_json::Value;

/// Find and parse the first JSON object inside `text`
///
/// The first `{` is tried with its balanced span, then the greedy span up to
/// the last `}`. An array is only taken when its balanced span encloses that
/// object (a list of objects in prose) or when no object span parses, so a
/// bracketed label ahead of the payload does not win.
#[must_use]
pub fn embedded_json(text: &str) -> Option<Value> {
    let object_start = text.find('{');
    let array_start = text.find('[');

    if let (Some(array), Some(object)) = (array_start, object_start) {
        if array < object {
            let enclosing = balanced_span(text, array, '[', ']')
                .filter(|span| array + span.len() > object)
                .and_then(|span| serde_json::from_str::<Value>(span).ok());
            if enclosing.is_some() {
                return enclosing;
            }
        }
    }

    object_start
        .and_then(|start| parse_from(text, start, '{', '}'))
        .or_else(|| array_start.and_then(|start| parse_from(text, start, '[', ']')))
}

fn parse_from(text: &str, start: usize, open: char, close: char) -> Option<Value> {
    let balanced = balanced_span(text, start, open, close);
    let greedy = text.rfind(close).filter(|end| *end > start).map(|end| &text[start..=end]);
    [balanced, greedy]
        .into_iter()
        .flatten()
        .find_map(|span| serde_json::from_str::<Value>(span).ok())
}

/// Span from `start` to the closer that brings nesting back to zero
///
/// Brackets inside string literals are ignored.
#[must_use]
pub fn balanced_span(text: &str, start: usize, open: char, close: char) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}
