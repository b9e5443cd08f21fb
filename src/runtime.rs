use crate::environment::Scopes;
use crate::error::{name_error, runtime_error, type_error, Error, Result, RunFailure};
use crate::parser::{parse, BinaryOp, Expr, Literal, Stmt, UnaryOp};
use crate::stdlib::{ModuleResolver, StandardResolver};
use crate::tokenizer::tokenize;
use std::{
    collections::HashMap,
    fmt::{self, Debug, Display, Formatter},
    io::Write,
    rc::Rc,
};

pub type NativeResult = std::result::Result<Value, String>;

/// A host-exposed callable. Natives receive their arguments already
/// evaluated and do their own argument checking.
#[derive(Clone)]
pub struct Native {
    pub name: String,
    pub func: Rc<dyn Fn(Vec<Value>) -> NativeResult>,
}

#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Map(HashMap<String, Value>),
    Native(Native),
    Function(Rc<crate::parser::FunctionDecl>),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Bool(false) => false,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Map(map) => !map.is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Map(_) => "object",
            Value::Native(_) => "built-in",
            Value::Function(_) => "function",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => {
                if n.is_nan() {
                    write!(f, "nan")
                } else if n.is_infinite() {
                    write!(f, "{}", if *n > 0.0 { "inf" } else { "-inf" })
                } else if n.fract() == 0.0 {
                    // Floats keep their decimal point so they stay
                    // distinguishable from ints.
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Map(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", key, map[key.as_str()])?;
                }
                write!(f, "}}")
            }
            Value::Native(native) => write!(f, "<built-in {}>", native.name),
            Value::Function(decl) => write!(f, "<function {}>", decl.name),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Value::Str(s) = self {
            write!(f, "\"{}\"", s)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// How a statement finished: fell through normally (carrying the value of an
/// expression statement, `Null` otherwise) or hit a `return` that is still
/// unwinding toward the nearest call boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal(Value),
    Return(Value),
}

pub struct Executor<W: Write> {
    scopes: Scopes,
    resolver: Box<dyn ModuleResolver>,
    out: W,
}

impl<W: Write> Executor<W> {
    pub fn new(resolver: Box<dyn ModuleResolver>, out: W) -> Self {
        Executor {
            scopes: Scopes::new(),
            resolver,
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Execute a program. Returns the value of the last expression
    /// statement, or `Null`. A `return` that reaches this level is an error.
    pub fn execute(&mut self, statements: &[Stmt]) -> Result<Value> {
        match self.exec_block(statements)? {
            Flow::Normal(value) => Ok(value),
            Flow::Return(_) => Err(Error::TopLevelReturn),
        }
    }

    fn exec_block(&mut self, statements: &[Stmt]) -> Result<Flow> {
        let mut result = Value::Null;
        for stmt in statements {
            match self.exec_statement(stmt)? {
                Flow::Normal(value) => result = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal(result))
    }

    /// Execute a statement body whose value is discarded; only the return
    /// signal survives.
    fn exec_body(&mut self, statements: &[Stmt]) -> Result<Flow> {
        match self.exec_block(statements)? {
            flow @ Flow::Return(_) => Ok(flow),
            Flow::Normal(_) => Ok(Flow::Normal(Value::Null)),
        }
    }

    fn exec_statement(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Var { name, initializer } => {
                let value = self.eval_expression(initializer)?;
                self.scopes.define(name.clone(), value);
                Ok(Flow::Normal(Value::Null))
            }
            Stmt::Function(decl) => {
                self.scopes
                    .define(decl.name.clone(), Value::Function(Rc::clone(decl)));
                Ok(Flow::Normal(Value::Null))
            }
            Stmt::Print(expr) => {
                let value = self.eval_expression(expr)?;
                writeln!(self.out, "{}", value)?;
                Ok(Flow::Normal(Value::Null))
            }
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => {
                if self.eval_expression(condition)?.is_truthy() {
                    self.exec_body(then_body)
                } else if !else_body.is_empty() {
                    self.exec_body(else_body)
                } else {
                    Ok(Flow::Normal(Value::Null))
                }
            }
            Stmt::While { condition, body } => {
                while self.eval_expression(condition)?.is_truthy() {
                    if let flow @ Flow::Return(_) = self.exec_body(body)? {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Normal(Value::Null))
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.exec_statement(init)?;
                }
                while self.eval_expression(condition)?.is_truthy() {
                    if let flow @ Flow::Return(_) = self.exec_body(body)? {
                        return Ok(flow);
                    }
                    self.exec_statement(update)?;
                }
                Ok(Flow::Normal(Value::Null))
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval_expression(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Assignment { target, value } => {
                let Expr::Identifier(name) = target else {
                    return Err(Error::AssignmentTarget);
                };
                let value = self.eval_expression(value)?;
                self.scopes.assign(name, value);
                Ok(Flow::Normal(Value::Null))
            }
            Stmt::Expression(expr) => Ok(Flow::Normal(self.eval_expression(expr)?)),
        }
    }

    fn eval_expression(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(n) => Value::Float(*n),
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
            }),
            Expr::Identifier(name) => match self.scopes.lookup(name) {
                Some(value) => Ok(value.clone()),
                None => name_error(format!("undefined variable: {name}")),
            },
            Expr::MemberAccess { object, member } => {
                let object = self.eval_expression(object)?;
                let Value::Map(map) = object else {
                    return type_error(format!(
                        "cannot access member '{member}' on {} value",
                        object.type_name()
                    ));
                };
                match map.get(member) {
                    Some(value) => Ok(value.clone()),
                    None => name_error(format!("object has no member '{member}'")),
                }
            }
            Expr::MemberCall {
                object,
                member,
                args,
            } => {
                let object = self.eval_expression(object)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expression(arg)?);
                }

                let Value::Map(map) = object else {
                    return type_error(format!(
                        "cannot call method '{member}' on {} value",
                        object.type_name()
                    ));
                };
                let Some(entry) = map.get(member) else {
                    return name_error(format!("object has no method '{member}'"));
                };
                let Value::Native(native) = entry else {
                    return type_error(format!("'{member}' is not a method"));
                };
                (native.func)(values).map_err(|message| Error::Runtime { message })
            }
            Expr::Binary {
                operator,
                left,
                right,
            } => {
                // Both operands are evaluated before the operator applies;
                // `and`/`or` do not short-circuit side effects.
                let left = self.eval_expression(left)?;
                let right = self.eval_expression(right)?;
                eval_binary(*operator, left, right)
            }
            Expr::Unary { operator, operand } => {
                let operand = self.eval_expression(operand)?;
                match operator {
                    UnaryOp::Negate => match operand {
                        Value::Int(n) => n
                            .checked_neg()
                            .map(Value::Int)
                            .ok_or_else(overflow_error),
                        Value::Float(n) => Ok(Value::Float(-n)),
                        other => type_error(format!(
                            "unary '-' requires a number, got {}",
                            other.type_name()
                        )),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
                }
            }
            Expr::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expression(arg)?);
                }

                // `require` is reserved and intercepted before ordinary
                // function lookup.
                if name == "require" {
                    return self.require(values);
                }
                self.call_function(name, values)
            }
        }
    }

    // Calls resolve in the global scope only, and the callee must be a user
    // function declaration.
    fn call_function(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        let Some(value) = self.scopes.lookup_global(name) else {
            return name_error(format!("undefined function: {name}"));
        };
        let Value::Function(decl) = value else {
            return type_error(format!("{name} is not a function"));
        };
        let decl = Rc::clone(decl);

        if args.len() != decl.params.len() {
            return Err(Error::Arity {
                name: name.to_string(),
                expected: decl.params.len(),
                given: args.len(),
            });
        }

        let mut frame = HashMap::new();
        for (param, arg) in decl.params.iter().zip(args) {
            frame.insert(param.clone(), arg);
        }

        // The saved frame must come back on every exit path; nested calls
        // nest LIFO, which is what makes recursion work.
        let saved = self.scopes.swap_local(Some(frame));
        let flow = self.exec_block(&decl.body);
        self.scopes.swap_local(saved);

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal(_) => Ok(Value::Null),
        }
    }

    fn require(&mut self, args: Vec<Value>) -> Result<Value> {
        if args.len() != 1 {
            return Err(Error::Arity {
                name: "require".to_string(),
                expected: 1,
                given: args.len(),
            });
        }
        let Value::Str(name) = &args[0] else {
            return type_error(format!(
                "module name must be a string, got {}",
                args[0].type_name()
            ));
        };
        Ok(Value::Map(self.resolver.resolve(name)?))
    }
}

fn eval_binary(operator: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match operator {
        BinaryOp::Add => match (&left, &right) {
            // `+` concatenates whenever either side is a string, coercing
            // the other side to its display form.
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                Ok(Value::Str(format!("{}{}", left, right)))
            }
            (Value::Int(a), Value::Int(b)) => {
                a.checked_add(*b).map(Value::Int).ok_or_else(overflow_error)
            }
            _ => numeric_float_op(&left, &right, "+", |a, b| a + b),
        },
        BinaryOp::Subtract => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => {
                a.checked_sub(*b).map(Value::Int).ok_or_else(overflow_error)
            }
            _ => numeric_float_op(&left, &right, "-", |a, b| a - b),
        },
        BinaryOp::Multiply => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => {
                a.checked_mul(*b).map(Value::Int).ok_or_else(overflow_error)
            }
            _ => numeric_float_op(&left, &right, "*", |a, b| a * b),
        },
        BinaryOp::Divide => match (&left, &right) {
            // Two ints divide like ints: the quotient floors toward
            // negative infinity.
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return runtime_error("division by zero");
                }
                floor_div(*a, *b).map(Value::Int).ok_or_else(overflow_error)
            }
            _ => {
                if as_float(&right) == Some(0.0) {
                    return runtime_error("division by zero");
                }
                numeric_float_op(&left, &right, "/", |a, b| a / b)
            }
        },
        BinaryOp::Modulo => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return runtime_error("modulo by zero");
                }
                floor_mod(*a, *b).map(Value::Int).ok_or_else(overflow_error)
            }
            _ => {
                if as_float(&right) == Some(0.0) {
                    return runtime_error("modulo by zero");
                }
                // Sign follows the divisor, like floor division.
                numeric_float_op(&left, &right, "%", |a, b| a - b * (a / b).floor())
            }
        },
        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
        BinaryOp::Less => compare(&left, &right, "<", |o| o == std::cmp::Ordering::Less),
        BinaryOp::LessEqual => compare(&left, &right, "<=", |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Greater => compare(&left, &right, ">", |o| o == std::cmp::Ordering::Greater),
        BinaryOp::GreaterEqual => compare(&left, &right, ">=", |o| o != std::cmp::Ordering::Less),
        // Both operands were already evaluated; only the result is boolean.
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        // `or` yields the left operand unchanged when truthy, else the right
        // operand, without coercing either to a boolean.
        BinaryOp::Or => Ok(if left.is_truthy() { left } else { right }),
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    }
}

fn numeric_float_op(
    left: &Value,
    right: &Value,
    symbol: &str,
    op: impl Fn(f64, f64) -> f64,
) -> Result<Value> {
    match (as_float(left), as_float(right)) {
        (Some(a), Some(b)) => Ok(Value::Float(op(a, b))),
        _ => type_error(format!(
            "unsupported operand types for '{symbol}': {} and {}",
            left.type_name(),
            right.type_name()
        )),
    }
}

fn compare(
    left: &Value,
    right: &Value,
    symbol: &str,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match (as_float(left), as_float(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return type_error(format!(
                    "'{symbol}' not supported between {} and {}",
                    left.type_name(),
                    right.type_name()
                ))
            }
        },
    };
    match ordering {
        Some(ordering) => Ok(Value::Bool(accept(ordering))),
        // NaN comparisons are false whichever way they run.
        None => Ok(Value::Bool(false)),
    }
}

fn overflow_error() -> Error {
    Error::Runtime {
        message: "integer overflow".to_string(),
    }
}

// Quotient truncated toward negative infinity. None on i64::MIN / -1.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    let r = a.checked_rem(b)?;
    if r != 0 && (r < 0) != (b < 0) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

// Remainder whose sign follows the divisor, matching floor division.
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && (r < 0) != (b < 0) {
        Some(r + b)
    } else {
        Some(r)
    }
}

/// Run a program from source, capturing everything it prints. On failure the
/// output produced before the failing statement is preserved alongside the
/// error.
pub fn run(source: &str) -> std::result::Result<String, RunFailure> {
    let statements = match tokenize(source).and_then(|tokens| parse(&tokens)) {
        Ok(statements) => statements,
        Err(error) => {
            return Err(RunFailure {
                output: String::new(),
                error,
            })
        }
    };

    let mut executor = Executor::new(Box::new(StandardResolver), Vec::new());
    let result = executor.execute(&statements);
    let output = String::from_utf8_lossy(&executor.into_output()).into_owned();

    match result {
        Ok(_) => Ok(output),
        Err(error) => Err(RunFailure { output, error }),
    }
}
