use nu_ansi_term::{Color, Style};
use reedline::{
    Highlighter, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    StyledText, ValidationResult, Validator,
};
use std::borrow::Cow;

use crate::tokenizer::{tokenize, TokenKind};

#[derive(Clone)]
pub struct REPLPrompt;

impl Prompt for REPLPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed("nova")
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<str> {
        Cow::Borrowed("❯ ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("  ... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

pub struct REPLValidator;

impl Validator for REPLValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            return ValidationResult::Complete;
        }

        if trimmed.ends_with('\\') {
            return ValidationResult::Incomplete;
        }

        let mut delimiters = Vec::new();
        let mut in_string: Option<char> = None;
        let mut in_comment = false;
        let mut escaped = false;

        for c in line.chars() {
            if in_comment {
                if c == '\n' {
                    in_comment = false;
                }
                continue;
            }

            if let Some(quote) = in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == quote {
                    in_string = None;
                }
                continue;
            }

            match c {
                '"' | '\'' => in_string = Some(c),
                '#' => in_comment = true,

                '{' | '(' | '[' => delimiters.push(c),
                '}' => {
                    if delimiters.pop() != Some('{') {
                        return ValidationResult::Complete;
                    }
                }
                ')' => {
                    if delimiters.pop() != Some('(') {
                        return ValidationResult::Complete;
                    }
                }
                ']' => {
                    if delimiters.pop() != Some('[') {
                        return ValidationResult::Complete;
                    }
                }

                _ => {}
            }
        }

        if in_string.is_some() {
            return ValidationResult::Incomplete;
        }

        if delimiters.is_empty() {
            ValidationResult::Complete
        } else {
            ValidationResult::Incomplete
        }
    }
}

pub static KEYWORD_COLOR: Color = Color::LightBlue;
pub static LITERAL_COLOR: Color = Color::Yellow;
pub static DEFAULT_COLOR: Color = Color::White;
pub static OPERATOR_COLOR: Color = Color::DarkGray;

pub struct SyntaxHighlighter;

impl Highlighter for SyntaxHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled_text = StyledText::new();

        let tokens = match tokenize(line) {
            Ok(t) => t,
            Err(_) => {
                styled_text.push((Style::new().fg(DEFAULT_COLOR), line.to_string()));
                return styled_text;
            }
        };

        let mut remaining = line;

        for token in tokens {
            if token.kind == TokenKind::Eof {
                break;
            }

            // Best effort: string tokens carry decoded text, so escaped
            // strings may not be found and fall through to default styling.
            let token_str = match token.kind {
                TokenKind::Str => format!("\"{}\"", token.text),
                _ => token.text.clone(),
            };

            if let Some(pos) = remaining.find(&token_str) {
                if pos > 0 {
                    styled_text
                        .push((Style::new().fg(DEFAULT_COLOR), remaining[..pos].to_string()));
                }

                let color = match token.kind {
                    TokenKind::Var
                    | TokenKind::Function
                    | TokenKind::Print
                    | TokenKind::If
                    | TokenKind::Else
                    | TokenKind::For
                    | TokenKind::While
                    | TokenKind::Return
                    | TokenKind::In
                    | TokenKind::True
                    | TokenKind::False => KEYWORD_COLOR,
                    // The word-form boolean operators read as keywords.
                    TokenKind::Identifier if token.text == "and" || token.text == "or" => {
                        KEYWORD_COLOR
                    }
                    TokenKind::Number | TokenKind::Str => LITERAL_COLOR,
                    TokenKind::Plus
                    | TokenKind::Minus
                    | TokenKind::Star
                    | TokenKind::Slash
                    | TokenKind::Percent
                    | TokenKind::Assign
                    | TokenKind::EqualEqual
                    | TokenKind::BangEqual
                    | TokenKind::Bang
                    | TokenKind::Less
                    | TokenKind::LessEqual
                    | TokenKind::Greater
                    | TokenKind::GreaterEqual
                    | TokenKind::LeftParen
                    | TokenKind::RightParen
                    | TokenKind::LeftBrace
                    | TokenKind::RightBrace
                    | TokenKind::LeftBracket
                    | TokenKind::RightBracket
                    | TokenKind::Comma
                    | TokenKind::Colon
                    | TokenKind::Dot => OPERATOR_COLOR,
                    _ => DEFAULT_COLOR,
                };

                styled_text.push((Style::new().fg(color), token_str.clone()));
                remaining = &remaining[pos + token_str.len()..];
            }
        }

        if !remaining.is_empty() {
            styled_text.push((Style::new().fg(DEFAULT_COLOR), remaining.to_string()));
        }

        styled_text
    }
}
