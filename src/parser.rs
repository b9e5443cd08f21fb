use crate::{
    error::{syntax_error, Result},
    tokenizer::{Token, TokenKind},
};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var {
        name: String,
        initializer: Expr,
    },
    Function(Rc<FunctionDecl>),
    Print(Expr),
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Expr,
        update: Box<Stmt>,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Assignment {
        target: Expr,
        value: Expr,
    },
    Expression(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Identifier(String),
    MemberAccess {
        object: Box<Expr>,
        member: String,
    },
    MemberCall {
        object: Box<Expr>,
        member: String,
        args: Vec<Expr>,
    },
    Binary {
        operator: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

pub fn parse(tokens: &[Token]) -> Result<Vec<Stmt>> {
    assert!(
        tokens.last().map_or(false, |t| t.kind == TokenKind::Eof),
        "Token slice must be terminated by Eof"
    );

    let mut consumed = 0;
    let mut statements = Vec::new();
    while tokens[consumed].kind != TokenKind::Eof {
        let (stmt, used) = parse_statement(&tokens[consumed..])?;
        statements.push(stmt);
        consumed += used;
    }
    Ok(statements)
}

fn expect(tokens: &[Token], at: usize, kind: TokenKind) -> Result<&Token> {
    let token = &tokens[at];
    if token.kind != kind {
        return syntax_error(
            format!("expected {:?}, got {:?}", kind, token.kind),
            token.line,
        );
    }
    Ok(token)
}

fn parse_statement(tokens: &[Token]) -> Result<(Stmt, usize)> {
    match tokens[0].kind {
        TokenKind::Var => parse_var(tokens),
        TokenKind::Function => parse_function(tokens),
        TokenKind::Print => parse_print(tokens),
        TokenKind::If => parse_if(tokens),
        TokenKind::While => parse_while(tokens),
        TokenKind::For => parse_for(tokens),
        TokenKind::Return => parse_return(tokens),
        TokenKind::Identifier => parse_assignment_or_call(tokens),
        kind => syntax_error(format!("unexpected token {kind:?}"), tokens[0].line),
    }
}

// var NAME = expr
fn parse_var(tokens: &[Token]) -> Result<(Stmt, usize)> {
    expect(tokens, 0, TokenKind::Var)?;
    let name = expect(tokens, 1, TokenKind::Identifier)?.text.clone();
    expect(tokens, 2, TokenKind::Assign)?;

    let (initializer, used) = parse_expression(&tokens[3..])?;
    Ok((Stmt::Var { name, initializer }, used + 3))
}

// function NAME(p0, p1, ...): block
fn parse_function(tokens: &[Token]) -> Result<(Stmt, usize)> {
    expect(tokens, 0, TokenKind::Function)?;
    let name = expect(tokens, 1, TokenKind::Identifier)?.text.clone();
    expect(tokens, 2, TokenKind::LeftParen)?;
    let mut consumed = 3;

    let mut params = Vec::new();
    while tokens[consumed].kind != TokenKind::RightParen {
        params.push(expect(tokens, consumed, TokenKind::Identifier)?.text.clone());
        consumed += 1;
        if tokens[consumed].kind == TokenKind::Comma {
            consumed += 1;
        }
    }
    consumed += 1; // ')'

    expect(tokens, consumed, TokenKind::Colon)?;
    consumed += 1;

    let (body, used) = parse_block(&tokens[consumed..])?;
    consumed += used;

    Ok((
        Stmt::Function(Rc::new(FunctionDecl { name, params, body })),
        consumed,
    ))
}

// A block is either `{ stmt* }` or exactly one statement.
fn parse_block(tokens: &[Token]) -> Result<(Vec<Stmt>, usize)> {
    if tokens[0].kind != TokenKind::LeftBrace {
        let (stmt, used) = parse_statement(tokens)?;
        return Ok((vec![stmt], used));
    }

    let mut consumed = 1;
    let mut statements = Vec::new();
    while tokens[consumed].kind != TokenKind::RightBrace {
        if tokens[consumed].kind == TokenKind::Eof {
            return syntax_error("expected '}' before end of input", tokens[consumed].line);
        }
        let (stmt, used) = parse_statement(&tokens[consumed..])?;
        statements.push(stmt);
        consumed += used;
    }
    Ok((statements, consumed + 1))
}

// print(expr)
fn parse_print(tokens: &[Token]) -> Result<(Stmt, usize)> {
    expect(tokens, 0, TokenKind::Print)?;
    expect(tokens, 1, TokenKind::LeftParen)?;

    let (value, used) = parse_expression(&tokens[2..])?;
    let consumed = used + 2;
    expect(tokens, consumed, TokenKind::RightParen)?;

    Ok((Stmt::Print(value), consumed + 1))
}

// if (expr): block [else: block]
fn parse_if(tokens: &[Token]) -> Result<(Stmt, usize)> {
    expect(tokens, 0, TokenKind::If)?;
    expect(tokens, 1, TokenKind::LeftParen)?;

    let (condition, used) = parse_expression(&tokens[2..])?;
    let mut consumed = used + 2;
    expect(tokens, consumed, TokenKind::RightParen)?;
    expect(tokens, consumed + 1, TokenKind::Colon)?;
    consumed += 2;

    let (then_body, used) = parse_block(&tokens[consumed..])?;
    consumed += used;

    let mut else_body = Vec::new();
    if tokens[consumed].kind == TokenKind::Else {
        expect(tokens, consumed + 1, TokenKind::Colon)?;
        consumed += 2;
        let (body, used) = parse_block(&tokens[consumed..])?;
        else_body = body;
        consumed += used;
    }

    Ok((
        Stmt::If {
            condition,
            then_body,
            else_body,
        },
        consumed,
    ))
}

// while (expr): block
fn parse_while(tokens: &[Token]) -> Result<(Stmt, usize)> {
    expect(tokens, 0, TokenKind::While)?;
    expect(tokens, 1, TokenKind::LeftParen)?;

    let (condition, used) = parse_expression(&tokens[2..])?;
    let mut consumed = used + 2;
    expect(tokens, consumed, TokenKind::RightParen)?;
    expect(tokens, consumed + 1, TokenKind::Colon)?;
    consumed += 2;

    let (body, used) = parse_block(&tokens[consumed..])?;
    consumed += used;

    Ok((Stmt::While { condition, body }, consumed))
}

// for (var NAME = expr : expr : assignment-or-call): block
//
// The three clauses are separated by ':', not ';'. The init clause may be
// absent; when present it must be a `var` declaration.
fn parse_for(tokens: &[Token]) -> Result<(Stmt, usize)> {
    expect(tokens, 0, TokenKind::For)?;
    expect(tokens, 1, TokenKind::LeftParen)?;
    let mut consumed = 2;

    let init = if tokens[consumed].kind == TokenKind::Var {
        let (stmt, used) = parse_var(&tokens[consumed..])?;
        consumed += used;
        Some(Box::new(stmt))
    } else {
        None
    };

    expect(tokens, consumed, TokenKind::Colon)?;
    consumed += 1;

    let (condition, used) = parse_expression(&tokens[consumed..])?;
    consumed += used;

    expect(tokens, consumed, TokenKind::Colon)?;
    consumed += 1;

    let (update, used) = parse_assignment_or_call(&tokens[consumed..])?;
    consumed += used;

    expect(tokens, consumed, TokenKind::RightParen)?;
    expect(tokens, consumed + 1, TokenKind::Colon)?;
    consumed += 2;

    let (body, used) = parse_block(&tokens[consumed..])?;
    consumed += used;

    Ok((
        Stmt::For {
            init,
            condition,
            update: Box::new(update),
            body,
        },
        consumed,
    ))
}

// return [expr]
fn parse_return(tokens: &[Token]) -> Result<(Stmt, usize)> {
    expect(tokens, 0, TokenKind::Return)?;

    if matches!(tokens[1].kind, TokenKind::Eof | TokenKind::RightBrace) {
        return Ok((Stmt::Return(None), 1));
    }

    let (value, used) = parse_expression(&tokens[1..])?;
    Ok((Stmt::Return(Some(value)), used + 1))
}

// An identifier-led statement: either an assignment (the parsed expression is
// the target) or a bare expression whose value is discarded.
fn parse_assignment_or_call(tokens: &[Token]) -> Result<(Stmt, usize)> {
    let (expr, consumed) = parse_expression(tokens)?;

    if tokens[consumed].kind == TokenKind::Assign {
        let (value, used) = parse_expression(&tokens[consumed + 1..])?;
        return Ok((
            Stmt::Assignment {
                target: expr,
                value,
            },
            consumed + used + 1,
        ));
    }

    Ok((Stmt::Expression(expr), consumed))
}

pub fn parse_expression(tokens: &[Token]) -> Result<(Expr, usize)> {
    parse_or(tokens)
}

fn binary(operator: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    }
}

// `and`/`or` are contextual identifiers, not reserved keywords.
fn is_word_operator(token: &Token, word: &str) -> bool {
    token.kind == TokenKind::Identifier && token.text == word
}

fn parse_or(tokens: &[Token]) -> Result<(Expr, usize)> {
    let (mut left, mut consumed) = parse_and(tokens)?;

    while is_word_operator(&tokens[consumed], "or") {
        let (right, used) = parse_and(&tokens[consumed + 1..])?;
        left = binary(BinaryOp::Or, left, right);
        consumed += used + 1;
    }
    Ok((left, consumed))
}

fn parse_and(tokens: &[Token]) -> Result<(Expr, usize)> {
    let (mut left, mut consumed) = parse_equality(tokens)?;

    while is_word_operator(&tokens[consumed], "and") {
        let (right, used) = parse_equality(&tokens[consumed + 1..])?;
        left = binary(BinaryOp::And, left, right);
        consumed += used + 1;
    }
    Ok((left, consumed))
}

fn parse_equality(tokens: &[Token]) -> Result<(Expr, usize)> {
    let (mut left, mut consumed) = parse_comparison(tokens)?;

    loop {
        let operator = match tokens[consumed].kind {
            TokenKind::EqualEqual => BinaryOp::Equal,
            TokenKind::BangEqual => BinaryOp::NotEqual,
            _ => break,
        };
        let (right, used) = parse_comparison(&tokens[consumed + 1..])?;
        left = binary(operator, left, right);
        consumed += used + 1;
    }
    Ok((left, consumed))
}

fn parse_comparison(tokens: &[Token]) -> Result<(Expr, usize)> {
    let (mut left, mut consumed) = parse_additive(tokens)?;

    loop {
        let operator = match tokens[consumed].kind {
            TokenKind::Less => BinaryOp::Less,
            TokenKind::LessEqual => BinaryOp::LessEqual,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
            _ => break,
        };
        let (right, used) = parse_additive(&tokens[consumed + 1..])?;
        left = binary(operator, left, right);
        consumed += used + 1;
    }
    Ok((left, consumed))
}

fn parse_additive(tokens: &[Token]) -> Result<(Expr, usize)> {
    let (mut left, mut consumed) = parse_multiplicative(tokens)?;

    loop {
        let operator = match tokens[consumed].kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Subtract,
            _ => break,
        };
        let (right, used) = parse_multiplicative(&tokens[consumed + 1..])?;
        left = binary(operator, left, right);
        consumed += used + 1;
    }
    Ok((left, consumed))
}

fn parse_multiplicative(tokens: &[Token]) -> Result<(Expr, usize)> {
    let (mut left, mut consumed) = parse_unary(tokens)?;

    loop {
        let operator = match tokens[consumed].kind {
            TokenKind::Star => BinaryOp::Multiply,
            TokenKind::Slash => BinaryOp::Divide,
            TokenKind::Percent => BinaryOp::Modulo,
            _ => break,
        };
        let (right, used) = parse_unary(&tokens[consumed + 1..])?;
        left = binary(operator, left, right);
        consumed += used + 1;
    }
    Ok((left, consumed))
}

fn parse_unary(tokens: &[Token]) -> Result<(Expr, usize)> {
    let operator = match tokens[0].kind {
        TokenKind::Bang => UnaryOp::Not,
        TokenKind::Minus => UnaryOp::Negate,
        _ => return parse_primary(tokens),
    };

    let (operand, used) = parse_unary(&tokens[1..])?;
    Ok((
        Expr::Unary {
            operator,
            operand: Box::new(operand),
        },
        used + 1,
    ))
}

fn parse_primary(tokens: &[Token]) -> Result<(Expr, usize)> {
    let token = &tokens[0];
    match token.kind {
        TokenKind::Number => {
            let literal = parse_number(&token.text, token.line)?;
            Ok((Expr::Literal(literal), 1))
        }
        TokenKind::Str => Ok((Expr::Literal(Literal::Str(token.text.clone())), 1)),
        TokenKind::True => Ok((Expr::Literal(Literal::Bool(true)), 1)),
        TokenKind::False => Ok((Expr::Literal(Literal::Bool(false)), 1)),
        TokenKind::Identifier => {
            let name = token.text.clone();
            let mut consumed = 1;
            let mut expr = Expr::Identifier(name.clone());
            let mut chained = false;

            // Postfix member chain: a.b.c() collapses left-to-right.
            while tokens[consumed].kind == TokenKind::Dot {
                chained = true;
                let member = expect(tokens, consumed + 1, TokenKind::Identifier)?
                    .text
                    .clone();
                consumed += 2;

                if tokens[consumed].kind == TokenKind::LeftParen {
                    let (args, used) = parse_arguments(&tokens[consumed..])?;
                    consumed += used;
                    expr = Expr::MemberCall {
                        object: Box::new(expr),
                        member,
                        args,
                    };
                } else {
                    expr = Expr::MemberAccess {
                        object: Box::new(expr),
                        member,
                    };
                }
            }

            if !chained && tokens[consumed].kind == TokenKind::LeftParen {
                let (args, used) = parse_arguments(&tokens[consumed..])?;
                return Ok((Expr::Call { name, args }, consumed + used));
            }

            Ok((expr, consumed))
        }
        TokenKind::LeftParen => {
            let (expr, used) = parse_expression(&tokens[1..])?;
            let consumed = used + 1;
            expect(tokens, consumed, TokenKind::RightParen)?;
            Ok((expr, consumed + 1))
        }
        kind => syntax_error(
            format!("unexpected token in expression: {kind:?}"),
            token.line,
        ),
    }
}

// A parenthesized, comma-separated argument list starting at '('.
fn parse_arguments(tokens: &[Token]) -> Result<(Vec<Expr>, usize)> {
    expect(tokens, 0, TokenKind::LeftParen)?;
    let mut consumed = 1;

    let mut args = Vec::new();
    while tokens[consumed].kind != TokenKind::RightParen {
        let (arg, used) = parse_expression(&tokens[consumed..])?;
        args.push(arg);
        consumed += used;
        if tokens[consumed].kind == TokenKind::Comma {
            consumed += 1;
        }
    }
    Ok((args, consumed + 1))
}

fn parse_number(text: &str, line: usize) -> Result<Literal> {
    // The lexer accepts any run of digits and dots; conversion is where a
    // malformed literal such as `1.2.3` fails.
    if text.contains('.') {
        match text.parse::<f64>() {
            Ok(n) => Ok(Literal::Float(n)),
            Err(_) => syntax_error(format!("invalid numeric literal '{text}'"), line),
        }
    } else {
        match text.parse::<i64>() {
            Ok(n) => Ok(Literal::Int(n)),
            Err(_) => syntax_error(format!("invalid numeric literal '{text}'"), line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::tokenizer::tokenize;

    // Helper function to tokenize and parse a string
    fn parse_str(input: &str) -> Result<Vec<Stmt>> {
        let tokens = tokenize(input)?;
        parse(&tokens)
    }

    #[test]
    fn test_var_declaration() -> Result<()> {
        let statements = parse_str("var x = 10")?;
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0],
            Stmt::Var {
                name: "x".to_string(),
                initializer: Expr::Literal(Literal::Int(10)),
            }
        );
        Ok(())
    }

    #[test]
    fn test_numeric_literals() -> Result<()> {
        let statements = parse_str("var a = 10 var b = 3.14")?;
        assert_eq!(statements.len(), 2);
        assert!(matches!(
            &statements[0],
            Stmt::Var { initializer: Expr::Literal(Literal::Int(10)), .. }
        ));
        assert!(matches!(
            &statements[1],
            Stmt::Var { initializer: Expr::Literal(Literal::Float(f)), .. } if *f == 3.14
        ));
        Ok(())
    }

    #[test]
    fn test_malformed_numeric_literal() {
        let err = parse_str("var x = 1.2.3").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 1, .. }), "{err}");
    }

    #[test]
    fn test_function_declaration() -> Result<()> {
        let statements = parse_str(
            "function add(a, b): {
                return a + b
            }",
        )?;
        assert_eq!(statements.len(), 1);
        let Stmt::Function(decl) = &statements[0] else {
            panic!("expected function declaration");
        };
        assert_eq!(decl.name, "add");
        assert_eq!(decl.params, vec!["a", "b"]);
        assert_eq!(decl.body.len(), 1);
        assert!(matches!(decl.body[0], Stmt::Return(Some(_))));
        Ok(())
    }

    #[test]
    fn test_single_statement_block() -> Result<()> {
        // Without braces exactly one statement forms the body.
        let statements = parse_str("if (x): print(1) print(2)")?;
        assert_eq!(statements.len(), 2);
        let Stmt::If { then_body, .. } = &statements[0] else {
            panic!("expected if");
        };
        assert_eq!(then_body.len(), 1);
        assert!(matches!(statements[1], Stmt::Print(_)));
        Ok(())
    }

    #[test]
    fn test_if_else() -> Result<()> {
        let statements = parse_str(
            "if (x == 1): {
                print(\"one\")
            } else: {
                print(\"not one\")
            }",
        )?;
        assert_eq!(statements.len(), 1);
        let Stmt::If {
            condition,
            then_body,
            else_body,
        } = &statements[0]
        else {
            panic!("expected if");
        };
        assert!(matches!(condition, Expr::Binary { .. }));
        assert_eq!(then_body.len(), 1);
        assert_eq!(else_body.len(), 1);
        Ok(())
    }

    #[test]
    fn test_while_loop() -> Result<()> {
        let statements = parse_str(
            "while (i < 10): {
                i = i + 1
            }",
        )?;
        assert_eq!(statements.len(), 1);
        let Stmt::While { body, .. } = &statements[0] else {
            panic!("expected while");
        };
        assert!(matches!(body[0], Stmt::Assignment { .. }));
        Ok(())
    }

    #[test]
    fn test_for_loop_colon_delimiters() -> Result<()> {
        let statements = parse_str(
            "for (var i = 1 : i <= 3 : i = i + 1): {
                print(i)
            }",
        )?;
        assert_eq!(statements.len(), 1);
        let Stmt::For {
            init,
            condition,
            update,
            body,
        } = &statements[0]
        else {
            panic!("expected for");
        };
        assert!(matches!(init.as_deref(), Some(Stmt::Var { .. })));
        assert!(matches!(condition, Expr::Binary { .. }));
        assert!(matches!(update.as_ref(), Stmt::Assignment { .. }));
        assert_eq!(body.len(), 1);

        // Semicolon delimiters are not part of the grammar.
        assert!(parse_str("for (var i = 0; i < 3; i = i + 1): print(i)").is_err());
        Ok(())
    }

    #[test]
    fn test_return_without_value() -> Result<()> {
        let statements = parse_str("function f(): { return }")?;
        let Stmt::Function(decl) = &statements[0] else {
            panic!("expected function");
        };
        assert_eq!(decl.body, vec![Stmt::Return(None)]);
        Ok(())
    }

    #[test]
    fn test_operator_precedence_shape() -> Result<()> {
        let statements = parse_str("var x = 2 + 3 * 4")?;
        let Stmt::Var { initializer, .. } = &statements[0] else {
            panic!("expected var");
        };
        // Must parse as 2 + (3 * 4).
        let Expr::Binary {
            operator: BinaryOp::Add,
            right,
            ..
        } = initializer
        else {
            panic!("expected addition at the root, got {initializer:?}");
        };
        assert!(matches!(
            right.as_ref(),
            Expr::Binary {
                operator: BinaryOp::Multiply,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_word_boolean_operators() -> Result<()> {
        let statements = parse_str("var x = a and b or c")?;
        let Stmt::Var { initializer, .. } = &statements[0] else {
            panic!("expected var");
        };
        // `or` binds loosest: (a and b) or c.
        let Expr::Binary {
            operator: BinaryOp::Or,
            left,
            ..
        } = initializer
        else {
            panic!("expected or at the root, got {initializer:?}");
        };
        assert!(matches!(
            left.as_ref(),
            Expr::Binary {
                operator: BinaryOp::And,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_member_chain() -> Result<()> {
        let statements = parse_str("x = a.b.c()")?;
        let Stmt::Assignment { value, .. } = &statements[0] else {
            panic!("expected assignment");
        };
        let Expr::MemberCall { object, member, args } = value else {
            panic!("expected member call, got {value:?}");
        };
        assert_eq!(member, "c");
        assert!(args.is_empty());
        assert!(matches!(object.as_ref(), Expr::MemberAccess { .. }));
        Ok(())
    }

    #[test]
    fn test_member_call_with_args() -> Result<()> {
        let statements = parse_str("fs.writeFile(\"a.txt\", content)")?;
        let Stmt::Expression(Expr::MemberCall { object, member, args }) = &statements[0] else {
            panic!("expected member call statement");
        };
        assert_eq!(**object, Expr::Identifier("fs".to_string()));
        assert_eq!(member, "writeFile");
        assert_eq!(args.len(), 2);
        Ok(())
    }

    #[test]
    fn test_plain_call() -> Result<()> {
        let statements = parse_str("factorial(5)")?;
        let Stmt::Expression(Expr::Call { name, args }) = &statements[0] else {
            panic!("expected call statement");
        };
        assert_eq!(name, "factorial");
        assert_eq!(args, &vec![Expr::Literal(Literal::Int(5))]);
        Ok(())
    }

    #[test]
    fn test_assignment_vs_expression() -> Result<()> {
        let statements = parse_str("x = 1 x")?;
        assert_eq!(statements.len(), 2);
        assert!(matches!(statements[0], Stmt::Assignment { .. }));
        assert!(matches!(statements[1], Stmt::Expression(_)));
        Ok(())
    }

    #[test]
    fn test_member_assignment_target_parses() -> Result<()> {
        // The parser accepts any expression as the target; the executor is
        // the one that rejects non-identifier targets.
        let statements = parse_str("a.b = 1")?;
        assert!(matches!(
            &statements[0],
            Stmt::Assignment {
                target: Expr::MemberAccess { .. },
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_unary_operators() -> Result<()> {
        let statements = parse_str("var x = -1 var y = !flag")?;
        assert!(matches!(
            &statements[0],
            Stmt::Var {
                initializer: Expr::Unary {
                    operator: UnaryOp::Negate,
                    ..
                },
                ..
            }
        ));
        assert!(matches!(
            &statements[1],
            Stmt::Var {
                initializer: Expr::Unary {
                    operator: UnaryOp::Not,
                    ..
                },
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_error_cases() {
        assert!(parse_str("var").is_err()); // Missing identifier
        assert!(parse_str("var x").is_err()); // Missing initializer
        assert!(parse_str("var x = ").is_err()); // Missing expression
        assert!(parse_str("function f() print(1)").is_err()); // Missing colon
        assert!(parse_str("if (x) print(1)").is_err()); // Missing colon
        assert!(parse_str("function f(): {").is_err()); // Unterminated block
        assert!(parse_str("print 1").is_err()); // Missing parentheses
        assert!(parse_str("1 + 2").is_err()); // Statement must be identifier-led
        assert!(parse_str("x = 1 +").is_err()); // Missing operand
    }

    #[test]
    fn test_error_reports_line() {
        let err = parse_str("var x = 1\nvar y ==").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 2, .. }), "{err}");
    }

    #[test]
    fn test_deterministic() -> Result<()> {
        let source = "function f(n): { return n * 2 } var x = f(21) print(x)";
        assert_eq!(parse_str(source)?, parse_str(source)?);
        Ok(())
    }
}
