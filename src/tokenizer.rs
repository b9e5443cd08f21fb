use log::debug;

use crate::error::{lexical_error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Var,
    Function,
    Print,
    If,
    Else,
    For,
    While,
    Return,
    In,
    True,
    False,

    // Literals
    Identifier,
    Number,
    Str,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    EqualEqual,
    BangEqual,
    Bang,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Dot,

    Eof,
}

/// A single lexeme: its kind, the exact source text, and the 1-based line it
/// started on. For `Str` tokens `text` holds the decoded contents, not the
/// raw quoted form.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            line,
        }
    }
}

fn keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "var" => TokenKind::Var,
        "function" => TokenKind::Function,
        "print" => TokenKind::Print,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "return" => TokenKind::Return,
        "in" => TokenKind::In,
        "True" => TokenKind::True,
        "False" => TokenKind::False,
        _ => return None,
    };
    Some(kind)
}

pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let n = chars.len();
    let mut pos = 0;
    let mut line = 1;
    let mut tokens = Vec::new();

    while pos < n {
        let c = chars[pos];

        match c {
            ' ' | '\t' | '\r' => pos += 1,
            '\n' => {
                pos += 1;
                line += 1;
            }
            // Comments run to end of line; the newline itself is handled above.
            '#' => {
                while pos < n && chars[pos] != '\n' {
                    pos += 1;
                }
            }
            '"' | '\'' => {
                let start_line = line;
                let quote = c;
                pos += 1;
                let mut value = String::new();
                loop {
                    match chars.get(pos) {
                        None => {
                            debug!("unterminated string starting on line {}", start_line);
                            return lexical_error("unterminated string", start_line);
                        }
                        Some(&ch) if ch == quote => {
                            pos += 1;
                            break;
                        }
                        Some('\\') => {
                            pos += 1;
                            let Some(&escaped) = chars.get(pos) else {
                                return lexical_error("unterminated string", start_line);
                            };
                            pos += 1;
                            match escaped {
                                'n' => value.push('\n'),
                                't' => value.push('\t'),
                                'r' => value.push('\r'),
                                '\\' => value.push('\\'),
                                // Unknown escapes keep the character and drop
                                // the backslash.
                                other => {
                                    if other == '\n' {
                                        line += 1;
                                    }
                                    value.push(other);
                                }
                            }
                        }
                        Some(&ch) => {
                            if ch == '\n' {
                                line += 1;
                            }
                            value.push(ch);
                            pos += 1;
                        }
                    }
                }
                tokens.push(Token::new(TokenKind::Str, value, start_line));
            }
            '0'..='9' => {
                let start = pos;
                // Maximal run of digits and dots; validity is the parser's
                // problem (`1.2.3` is one malformed token).
                while pos < n && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                tokens.push(Token::new(TokenKind::Number, text, line));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = pos;
                while pos < n && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let kind = keyword(&text).unwrap_or(TokenKind::Identifier);
                tokens.push(Token::new(kind, text, line));
            }
            '=' | '!' | '<' | '>' => {
                let two = pos + 1 < n && chars[pos + 1] == '=';
                let (kind, text) = match (c, two) {
                    ('=', true) => (TokenKind::EqualEqual, "=="),
                    ('=', false) => (TokenKind::Assign, "="),
                    ('!', true) => (TokenKind::BangEqual, "!="),
                    ('!', false) => (TokenKind::Bang, "!"),
                    ('<', true) => (TokenKind::LessEqual, "<="),
                    ('<', false) => (TokenKind::Less, "<"),
                    ('>', true) => (TokenKind::GreaterEqual, ">="),
                    ('>', false) => (TokenKind::Greater, ">"),
                    _ => unreachable!(),
                };
                pos += if two { 2 } else { 1 };
                tokens.push(Token::new(kind, text, line));
            }
            _ => {
                let kind = match c {
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '%' => TokenKind::Percent,
                    '(' => TokenKind::LeftParen,
                    ')' => TokenKind::RightParen,
                    '{' => TokenKind::LeftBrace,
                    '}' => TokenKind::RightBrace,
                    '[' => TokenKind::LeftBracket,
                    ']' => TokenKind::RightBracket,
                    ',' => TokenKind::Comma,
                    ':' => TokenKind::Colon,
                    '.' => TokenKind::Dot,
                    other => {
                        return lexical_error(format!("unexpected character {other:?}"), line)
                    }
                };
                pos += 1;
                tokens.push(Token::new(kind, c.to_string(), line));
            }
        }
    }

    tokens.push(Token::new(TokenKind::Eof, "", line));
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("var if else function return while for"),
            vec![
                TokenKind::Var,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Function,
                TokenKind::Return,
                TokenKind::While,
                TokenKind::For,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers_are_not_keywords() {
        let tokens = tokenize("variable iffy and or").unwrap();
        assert!(tokens[..4]
            .iter()
            .all(|t| t.kind == TokenKind::Identifier));
        assert_eq!(tokens[2].text, "and");
        assert_eq!(tokens[3].text, "or");
    }

    #[test]
    fn test_numbers() -> Result<()> {
        let tokens = tokenize("10 3.14 5")?;
        let numbers: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Number)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(numbers, vec!["10", "3.14", "5"]);
        Ok(())
    }

    #[test]
    fn test_malformed_number_is_one_token() -> Result<()> {
        let tokens = tokenize("1.2.3")?;
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].text, "1.2.3");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
        Ok(())
    }

    #[test]
    fn test_strings_and_escapes() -> Result<()> {
        let tokens = tokenize(r#""hello" 'world' "a\nb" "q\"q" "\x""#)?;
        let strings: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Str)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(strings, vec!["hello", "world", "a\nb", "q\"q", "x"]);
        Ok(())
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("var x = 10\n\"abc").unwrap_err();
        assert!(matches!(err, Error::Lexical { line: 2, .. }), "{err}");
    }

    #[test]
    fn test_comments_are_skipped() -> Result<()> {
        let tokens = tokenize("var x = 10  # trailing comment\nvar y = 20")?;
        assert_eq!(
            tokens.iter().filter(|t| t.kind == TokenKind::Var).count(),
            2
        );
        // The second declaration sits on line 2.
        assert_eq!(tokens[4].line, 2);
        Ok(())
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("+ - * / % == != <= >= < > ! ="),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Bang,
                TokenKind::Assign,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("var x = @").unwrap_err();
        assert!(matches!(err, Error::Lexical { line: 1, .. }), "{err}");
    }

    #[test]
    fn test_line_tracking() -> Result<()> {
        let tokens = tokenize("var a = 1\n\nvar b = 2")?;
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[4].line, 3);
        Ok(())
    }

    #[test]
    fn test_ends_with_eof() -> Result<()> {
        assert_eq!(tokenize("")?.last().unwrap().kind, TokenKind::Eof);
        assert_eq!(tokenize("x")?.last().unwrap().kind, TokenKind::Eof);
        Ok(())
    }
}
