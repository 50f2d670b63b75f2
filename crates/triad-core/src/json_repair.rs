//! One-pass repair of malformed LLM JSON.
//!
//! Models asked for strict JSON still return almost-JSON often enough
//! that the classifier and the intent judge get exactly one repair
//! attempt before surfacing a parse error. The pass fixes the failure
//! modes actually observed in structured-output responses:
//!
//! - output wrapped in markdown fences (`` ```json ... ``` ``)
//! - trailing commas before `}` / `]`
//! - bare (unquoted) object keys
//! - truncated output with unclosed strings, braces, or brackets
//!
//! This is not a JSON parser. Anything it cannot fix stays broken and
//! fails the subsequent `serde_json` parse, which is the point: one
//! bounded repair, then the error surfaces.

/// Try to parse, repairing once if the first parse fails.
///
/// This is the entry point the classifier and the intent judge use.
/// The repair cost is only paid when the raw output is invalid.
pub fn parse_with_repair(input: &str) -> Result<serde_json::Value, serde_json::Error> {
    if let Ok(value) = serde_json::from_str(input) {
        return Ok(value);
    }
    serde_json::from_str(&repair_json(input))
}

/// Apply all repair steps to `input` and return the repaired string.
///
/// Brackets are balanced before trailing commas are dropped: a comma at
/// the very end of truncated output only becomes "trailing" once the
/// missing closer is appended.
pub fn repair_json(input: &str) -> String {
    let unfenced = strip_fences(input);
    let keyed = quote_bare_keys(&unfenced);
    let balanced = balance_brackets(&keyed);
    drop_trailing_commas(&balanced)
}

/// Remove a wrapping markdown code fence, with or without a `json` tag.
fn strip_fences(input: &str) -> String {
    let trimmed = input.trim();

    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let body = body.strip_prefix('\n').unwrap_or(body);

    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);

    body.trim().to_string()
}

/// Remove commas that directly precede a closing brace or bracket.
/// Commas inside string literals are left alone.
fn drop_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                // Look past whitespace; drop the comma if a closer follows.
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Quote bare object keys: `{name: 1}` becomes `{"name": 1}`.
///
/// A bare identifier is only treated as a key when it follows `{` or
/// `,` and is itself followed by `:`, so bare words in array position
/// are left untouched.
fn quote_bare_keys(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut key_may_follow = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if key_may_follow && (c.is_ascii_alphabetic() || c == '_') {
            // Collect the identifier and peek past whitespace for ':'.
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            let next = chars[i..].iter().find(|ch| !ch.is_whitespace());
            if next == Some(&':') {
                out.push('"');
                out.push_str(&ident);
                out.push('"');
            } else {
                out.push_str(&ident);
            }
            key_may_follow = false;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                key_may_follow = false;
            }
            '{' | ',' => key_may_follow = true,
            _ if c.is_whitespace() => {}
            _ => key_may_follow = false,
        }
        out.push(c);
        i += 1;
    }

    out
}

/// Close an unterminated string and append missing closers for any
/// unbalanced braces and brackets, innermost first.
fn balance_brackets(input: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut out = input.to_string();
    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}
