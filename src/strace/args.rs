use crate::record::Scalar;

/// Byte offset of the `)` closing a call whose argument text starts at the
/// beginning of `text`, skipping over strings and nested brackets.
pub(crate) fn find_call_close(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
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
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Split an argument list on top-level commas
pub(crate) fn split_arguments(text: &str) -> Vec<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
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
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// Classify one argument: quoted strings lose their quotes, decimal integers
/// become numbers, everything else is kept verbatim as text.
pub(crate) fn parse_argument(arg: &str) -> Scalar {
    if let Some(body) = arg.strip_prefix('"') {
        if let Some(close) = closing_quote(body) {
            // Keep a truncation marker such as `...` after the string
            let mut text = body[..close].to_string();
            text.push_str(&body[close + 1..]);
            return Scalar::Text(text);
        }
        return Scalar::text(arg);
    }
    parse_integer(arg).unwrap_or_else(|| Scalar::text(arg))
}

pub(crate) fn parse_integer(text: &str) -> Option<Scalar> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<i64>().ok().map(Scalar::Integer)
}

pub(crate) fn parse_arguments(text: &str) -> Vec<Scalar> {
    split_arguments(text)
        .into_iter()
        .map(parse_argument)
        .collect()
}

fn closing_quote(body: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}
