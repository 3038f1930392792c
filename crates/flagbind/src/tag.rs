//! Struct-tag style metadata: `name:"listen,l" usage:"local address" env:"LISTEN"`.
//!
//! Pairs are `key:"value"` separated by whitespace. Values are double-quoted
//! and may contain `\"`, `\\`, `\n` and `\t` escapes. When a key repeats, the
//! first occurrence wins.

/// Parsed tag pairs in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pairs: Vec<(String, String)>,
}

impl Tag {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut pairs = Vec::new();
        let mut chars = raw.char_indices().peekable();

        loop {
            while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
            let Some(&(start, _)) = chars.peek() else {
                break;
            };

            let mut key = String::new();
            while let Some((_, c)) = chars.next_if(|(_, c)| *c != ':') {
                if c.is_whitespace() || c == '"' || c.is_control() {
                    return Err(format!("unexpected {c:?} in tag key at byte {start}"));
                }
                key.push(c);
            }
            if key.is_empty() {
                return Err(format!("empty tag key at byte {start}"));
            }
            if chars.next().is_none() {
                return Err(format!("tag key `{key}` is missing `:\"value\"`"));
            }
            match chars.next() {
                Some((_, '"')) => {}
                _ => return Err(format!("tag value for `{key}` must be double-quoted")),
            }

            let mut value = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some((_, '"')) => value.push('"'),
                        Some((_, '\\')) => value.push('\\'),
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, other)) => {
                            return Err(format!("unknown escape `\\{other}` in tag `{key}`"));
                        }
                        None => break,
                    },
                    c => value.push(c),
                }
            }
            if !closed {
                return Err(format!("unterminated tag value for `{key}`"));
            }
            if let Some(&(_, c)) = chars.peek() {
                if !c.is_whitespace() {
                    return Err(format!("missing whitespace after tag `{key}`"));
                }
            }
            pairs.push((key, value));
        }

        Ok(Self { pairs })
    }

    /// Look up a key; the first occurrence wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
