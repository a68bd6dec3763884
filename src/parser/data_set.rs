//! DATA_SET / TABLE value grammar.
//!
//! A data-set token is a whitespace-separated list of `key=value` entries.
//! Values may be bare, `"…"`- or `'…'`-quoted (escapes `\"`, `\'`, `\\`), or
//! `{…}`-braced. Braced values parse as nested tables when the data item is
//! a Table; for plain data sets the brace contents pass through as a string.
//! A key with an empty value (`key` or `key=`) retracts the key.

use crate::error::{AdapterError, Result};
use crate::types::{DataSet, DataSetValue};

/// Parse one data-set token.
pub fn parse_data_set(input: &str, is_table: bool) -> Result<DataSet> {
    let chars: Vec<char> = input.chars().collect();
    let mut set = DataSet::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        while pos < chars.len() && is_space(chars[pos]) {
            pos += 1;
        }
        if pos >= chars.len() {
            break;
        }

        let key_start = pos;
        while pos < chars.len() && chars[pos] != '=' && !is_space(chars[pos]) {
            pos += 1;
        }
        let key: String = chars[key_start..pos].iter().collect();
        if key.is_empty() {
            // stray '=' with no key; skip it
            pos += 1;
            continue;
        }

        if pos >= chars.len() || is_space(chars[pos]) {
            set.insert(key, DataSetValue::Removed);
            continue;
        }

        // consume '='
        pos += 1;
        if pos >= chars.len() || is_space(chars[pos]) {
            set.insert(key, DataSetValue::Removed);
            continue;
        }

        match chars[pos] {
            quote @ ('"' | '\'') => {
                pos += 1;
                let mut body = String::new();
                let mut closed = false;
                while pos < chars.len() {
                    match chars[pos] {
                        '\\' if pos + 1 < chars.len()
                            && (chars[pos + 1] == quote || chars[pos + 1] == '\\') =>
                        {
                            body.push(chars[pos + 1]);
                            pos += 2;
                        }
                        c if c == quote => {
                            pos += 1;
                            closed = true;
                            break;
                        }
                        c => {
                            body.push(c);
                            pos += 1;
                        }
                    }
                }
                if !closed {
                    return Err(AdapterError::conversion("DATA_SET", input));
                }
                set.insert(key, DataSetValue::String(body));
            }
            '{' => {
                let open = pos;
                let mut depth = 0usize;
                let mut close = None;
                while pos < chars.len() {
                    match chars[pos] {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                close = Some(pos);
                                break;
                            }
                        }
                        _ => {}
                    }
                    pos += 1;
                }
                let Some(close) = close else {
                    return Err(AdapterError::conversion("DATA_SET", input));
                };
                let inner: String = chars[open + 1..close].iter().collect();
                pos = close + 1;
                if is_table {
                    set.insert(key, DataSetValue::Table(parse_data_set(&inner, false)?));
                } else {
                    set.insert(key, DataSetValue::String(inner));
                }
            }
            _ => {
                let start = pos;
                while pos < chars.len() && !is_space(chars[pos]) {
                    pos += 1;
                }
                let raw: String = chars[start..pos].iter().collect();
                set.insert(key, DataSetValue::from_bare(&raw));
            }
        }
    }

    Ok(set)
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\t'
}
