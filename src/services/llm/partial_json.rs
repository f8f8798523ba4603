//! Tolerant parsing of a JSON document that is still being streamed.
//!
//! `parse_partial` reads as much of the text as forms a meaningful value:
//! open strings are closed, open arrays and objects are closed, and a key
//! whose value has not started yet is dropped, as is an unfinished
//! `true`/`false`/`null` literal.

use serde_json::{Map, Number, Value};

pub fn parse_partial(text: &str) -> Option<Value> {
    let chars: Vec<char> = text.chars().collect();
    let mut parser = PartialParser { chars, pos: 0 };
    parser.parse_value().map(|(value, _)| value)
}

struct PartialParser {
    chars: Vec<char>,
    pos: usize,
}

impl PartialParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Returns the value and whether it was syntactically complete.
    fn parse_value(&mut self) -> Option<(Value, bool)> {
        self.skip_ws();
        match self.peek()? {
            '{' => Some(self.parse_object()),
            '[' => Some(self.parse_array()),
            '"' => {
                let (s, complete) = self.parse_string();
                Some((Value::String(s), complete))
            }
            't' => self.parse_literal("true", Value::Bool(true)),
            'f' => self.parse_literal("false", Value::Bool(false)),
            'n' => self.parse_literal("null", Value::Null),
            c if c == '-' || c.is_ascii_digit() => self.parse_number(),
            _ => None,
        }
    }

    fn parse_object(&mut self) -> (Value, bool) {
        let mut map = Map::new();
        self.pos += 1;
        loop {
            self.skip_ws();
            match self.peek() {
                None => return (Value::Object(map), false),
                Some('}') => {
                    self.pos += 1;
                    return (Value::Object(map), true);
                }
                Some(',') => {
                    self.pos += 1;
                }
                Some('"') => {
                    let (key, key_complete) = self.parse_string();
                    if !key_complete {
                        return (Value::Object(map), false);
                    }
                    self.skip_ws();
                    if self.peek() != Some(':') {
                        return (Value::Object(map), false);
                    }
                    self.pos += 1;
                    match self.parse_value() {
                        None => return (Value::Object(map), false),
                        Some((value, complete)) => {
                            map.insert(key, value);
                            if !complete {
                                return (Value::Object(map), false);
                            }
                        }
                    }
                }
                Some(_) => return (Value::Object(map), false),
            }
        }
    }

    fn parse_array(&mut self) -> (Value, bool) {
        let mut items = Vec::new();
        self.pos += 1;
        loop {
            self.skip_ws();
            match self.peek() {
                None => return (Value::Array(items), false),
                Some(']') => {
                    self.pos += 1;
                    return (Value::Array(items), true);
                }
                Some(',') => {
                    self.pos += 1;
                }
                Some(_) => match self.parse_value() {
                    None => return (Value::Array(items), false),
                    Some((value, complete)) => {
                        items.push(value);
                        if !complete {
                            return (Value::Array(items), false);
                        }
                    }
                },
            }
        }
    }

    fn parse_string(&mut self) -> (String, bool) {
        let mut out = String::new();
        self.pos += 1;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '"' => return (out, true),
                '\\' => {
                    let Some(escaped) = self.peek() else {
                        return (out, false);
                    };
                    self.pos += 1;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'b' => out.push('\u{0008}'),
                        'f' => out.push('\u{000C}'),
                        'u' => {
                            if self.pos + 4 > self.chars.len() {
                                self.pos = self.chars.len();
                                return (out, false);
                            }
                            let hex: String = self.chars[self.pos..self.pos + 4].iter().collect();
                            self.pos += 4;
                            if let Some(ch) =
                                u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                            {
                                out.push(ch);
                            }
                        }
                        other => out.push(other),
                    }
                }
                other => out.push(other),
            }
        }
        (out, false)
    }

    fn parse_literal(&mut self, word: &str, value: Value) -> Option<(Value, bool)> {
        let rest: String = self.chars[self.pos..].iter().take(word.len()).collect();
        if rest == word {
            self.pos += word.len();
            Some((value, true))
        } else {
            self.pos = self.chars.len();
            None
        }
    }

    fn parse_number(&mut self) -> Option<(Value, bool)> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || "+-.eE".contains(c)) {
            self.pos += 1;
        }
        let complete = self.pos < self.chars.len();
        let text: String = self.chars[start..self.pos].iter().collect();

        let number = if let Ok(i) = text.parse::<i64>() {
            Some(Number::from(i))
        } else {
            text.parse::<f64>().ok().and_then(Number::from_f64)
        };

        match number {
            Some(n) => Some((Value::Number(n), complete)),
            None => {
                self.pos = self.chars.len();
                None
            }
        }
    }
}
