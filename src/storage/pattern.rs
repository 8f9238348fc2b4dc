//! Glob-style pattern matching for KEYS
//!
//! Supports `*`, `?`, `[abc]`, `[a-z]`, `[^abc]` (or `[!abc]`) and `\`
//! escapes, over raw bytes. A `[` with no closing `]` is a literal.

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Byte(u8),
    Range(u8, u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(u8),
    /// `?`
    Any,
    /// `*`
    Star,
    Class { negated: bool, items: Vec<ClassItem> },
}

impl Token {
    fn matches(&self, byte: u8) -> bool {
        match self {
            Token::Literal(b) => *b == byte,
            Token::Any => true,
            Token::Star => false,
            Token::Class { negated, items } => {
                let hit = items.iter().any(|item| match *item {
                    ClassItem::Byte(b) => b == byte,
                    ClassItem::Range(lo, hi) => lo <= byte && byte <= hi,
                });
                hit != *negated
            }
        }
    }
}

/// A compiled glob pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    tokens: Vec<Token>,
}

impl Pattern {
    /// Compile a pattern; every byte string is a valid pattern
    pub fn compile(pattern: &[u8]) -> Self {
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < pattern.len() {
            match pattern[i] {
                b'*' => {
                    if tokens.last() != Some(&Token::Star) {
                        tokens.push(Token::Star);
                    }
                    i += 1;
                }
                b'?' => {
                    tokens.push(Token::Any);
                    i += 1;
                }
                b'\\' if i + 1 < pattern.len() => {
                    tokens.push(Token::Literal(pattern[i + 1]));
                    i += 2;
                }
                b'[' => match parse_class(&pattern[i + 1..]) {
                    Some((token, consumed)) => {
                        tokens.push(token);
                        i += 1 + consumed;
                    }
                    None => {
                        tokens.push(Token::Literal(b'['));
                        i += 1;
                    }
                },
                byte => {
                    tokens.push(Token::Literal(byte));
                    i += 1;
                }
            }
        }

        Pattern { tokens }
    }

    /// Match the whole of `text`, backtracking only to the most recent `*`
    pub fn matches(&self, text: &[u8]) -> bool {
        let tokens = &self.tokens;
        let mut p = 0;
        let mut t = 0;
        // (token index of the last star, text index it currently resumes from)
        let mut star: Option<(usize, usize)> = None;

        while t < text.len() {
            if p < tokens.len() {
                if tokens[p] == Token::Star {
                    star = Some((p, t));
                    p += 1;
                    continue;
                }
                if tokens[p].matches(text[t]) {
                    p += 1;
                    t += 1;
                    continue;
                }
            }

            match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            }
        }

        while p < tokens.len() && tokens[p] == Token::Star {
            p += 1;
        }
        p == tokens.len()
    }

    /// True for `*`, which lets callers skip matching altogether
    pub fn matches_everything(&self) -> bool {
        self.tokens == [Token::Star]
    }
}

/// Parse a class body following `[`; returns the token and the number of
/// bytes consumed including the closing `]`
fn parse_class(body: &[u8]) -> Option<(Token, usize)> {
    let mut i = 0;
    let negated = matches!(body.first(), Some(b'^') | Some(b'!'));
    if negated {
        i += 1;
    }

    let mut items = Vec::new();
    while i < body.len() {
        let byte = match body[i] {
            b']' => return Some((Token::Class { negated, items }, i + 1)),
            b'\\' if i + 1 < body.len() => {
                i += 1;
                body[i]
            }
            b => b,
        };

        if i + 2 < body.len() && body[i + 1] == b'-' && body[i + 2] != b']' {
            let mut end = body[i + 2];
            let mut step = 3;
            if end == b'\\' && i + 3 < body.len() {
                end = body[i + 3];
                step = 4;
            }
            let (lo, hi) = if byte <= end { (byte, end) } else { (end, byte) };
            items.push(ClassItem::Range(lo, hi));
            i += step;
        } else {
            items.push(ClassItem::Byte(byte));
            i += 1;
        }
    }

    None
}
