//! SHDR line tokenizer.
//!
//! Splits a frame on `|` delimiters. A token whose first byte is `"` and
//! which has a terminating `"` immediately before the next delimiter (or end
//! of line) is a well-formed quoted token: the quotes are stripped, `\|`
//! inside resolves to a literal pipe, and the body is passed through without
//! trimming. Anything else is split verbatim on every pipe — malformed
//! quoting gets no escape interpretation at all, and the stray `"` and `\`
//! bytes stay in the output. That fallback is wire-compatible behavior relied
//! on by deployed adapters; the tests below pin it exactly.

/// Split one frame into its tokens. Empty tokens are preserved (they mean
/// "no change" in SHDR); unquoted token bodies are trimmed of spaces/tabs.
pub fn tokenize(line: &str) -> Vec<String> {
    let bytes = line.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    loop {
        if pos < len && bytes[pos] == b'"' {
            if let Some(close) = well_formed_close(bytes, pos) {
                let body = &line[pos + 1..close];
                tokens.push(body.replace("\\|", "|"));
                if close + 1 >= len {
                    break;
                }
                // skip the closing quote and the delimiter after it
                pos = close + 2;
                continue;
            }
        }

        match next_pipe(bytes, pos) {
            Some(delim) => {
                tokens.push(trim_token(&line[pos..delim]));
                pos = delim + 1;
            }
            None => {
                tokens.push(trim_token(&line[pos..]));
                break;
            }
        }
    }

    tokens
}

/// Find the `"` that terminates a quoted token opened at `start`: the first
/// quote sitting immediately before a delimiter or the end of the line.
fn well_formed_close(bytes: &[u8], start: usize) -> Option<usize> {
    (start + 1..bytes.len())
        .find(|&at| bytes[at] == b'"' && (at + 1 == bytes.len() || bytes[at + 1] == b'|'))
}

fn next_pipe(bytes: &[u8], from: usize) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == b'|').map(|offset| from + offset)
}

fn trim_token(raw: &str) -> String {
    raw.trim_matches([' ', '\t']).to_string()
}
