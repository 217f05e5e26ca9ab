//! Async tree-walking evaluator.
//!
//! The root scope is built by allow-list: the `graph` tool namespace plus the
//! builtin table in `call_builtin`. Nothing else resolves, so a script cannot
//! name a file, process, or socket under any code path.
//!
//! Suspension points are tool calls and `sleep`; everything else is
//! synchronous. The deadline is checked at statement boundaries and loop
//! back-edges so a compute-only loop cannot outlive the budget.

use crate::ast::{BinOp, Expr, Stmt, StmtKind, UnaryOp};
use crate::capture::OutputSink;
use futures::future::BoxFuture;
use futures::FutureExt;
use memscript_core::{Error, Result};
use memscript_tools::{ToolBinding, ToolOp};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const TOOL_NAMESPACE: &str = "graph";

const BUILTINS: &[&str] = &[
    "log", "sleep", "len", "str", "num", "lower", "upper", "contains", "split", "join", "push",
    "keys", "range", "json_parse", "json_str",
];

enum Flow {
    Normal,
    Break,
    Continue,
}

/// One evaluation context. Built fresh per request, discarded afterwards.
pub struct Interp {
    tools: ToolBinding,
    output: OutputSink,
    scopes: Vec<HashMap<String, Value>>,
    deadline: Instant,
    cancel: CancellationToken,
    budget_ms: u64,
}

impl Interp {
    pub fn new(
        tools: ToolBinding,
        output: OutputSink,
        deadline: Instant,
        cancel: CancellationToken,
        budget_ms: u64,
    ) -> Self {
        Self {
            tools,
            output,
            scopes: vec![HashMap::new()],
            deadline,
            cancel,
            budget_ms,
        }
    }

    pub async fn run(mut self, program: Vec<Stmt>) -> Result<()> {
        // A top-level break/continue just ends the script early
        self.exec_block(&program).await?;
        Ok(())
    }

    fn check_deadline(&self) -> Result<()> {
        if self.cancel.is_cancelled() || Instant::now() >= self.deadline {
            return Err(Error::Timeout(self.budget_ms));
        }
        Ok(())
    }

    fn exec_block<'a>(&'a mut self, stmts: &'a [Stmt]) -> BoxFuture<'a, Result<Flow>> {
        async move {
            for stmt in stmts {
                self.check_deadline()?;
                match self.exec_stmt(stmt).await? {
                    Flow::Normal => {}
                    flow => return Ok(flow),
                }
            }
            Ok(Flow::Normal)
        }
        .boxed()
    }

    async fn exec_scoped(&mut self, stmts: &[Stmt]) -> Result<Flow> {
        self.scopes.push(HashMap::new());
        let flow = self.exec_block(stmts).await;
        self.scopes.pop();
        flow
    }

    fn exec_stmt<'a>(&'a mut self, stmt: &'a Stmt) -> BoxFuture<'a, Result<Flow>> {
        async move {
            match &stmt.kind {
                StmtKind::Let { name, value } => {
                    if is_reserved(name) {
                        return Err(at(
                            stmt.line,
                            Error::script(format!("cannot shadow builtin name '{}'", name)),
                        ));
                    }
                    let value = self.eval(value).await.map_err(|e| at(stmt.line, e))?;
                    self.scopes
                        .last_mut()
                        .ok_or_else(|| Error::Internal("scope stack empty".into()))?
                        .insert(name.clone(), value);
                    Ok(Flow::Normal)
                }
                StmtKind::Assign { target, value } => {
                    let value = self.eval(value).await.map_err(|e| at(stmt.line, e))?;
                    self.assign(target, value)
                        .await
                        .map_err(|e| at(stmt.line, e))?;
                    Ok(Flow::Normal)
                }
                StmtKind::If {
                    cond,
                    then_block,
                    else_block,
                } => {
                    let cond = self.eval(cond).await.map_err(|e| at(stmt.line, e))?;
                    if truthy(&cond) {
                        self.exec_scoped(then_block).await
                    } else if let Some(block) = else_block {
                        self.exec_scoped(block).await
                    } else {
                        Ok(Flow::Normal)
                    }
                }
                StmtKind::While { cond, body } => {
                    loop {
                        self.check_deadline()?;
                        let cond = self.eval(cond).await.map_err(|e| at(stmt.line, e))?;
                        if !truthy(&cond) {
                            break;
                        }
                        match self.exec_scoped(body).await? {
                            Flow::Break => break,
                            Flow::Continue | Flow::Normal => {}
                        }
                    }
                    Ok(Flow::Normal)
                }
                StmtKind::For { var, iter, body } => {
                    if is_reserved(var) {
                        return Err(at(
                            stmt.line,
                            Error::script(format!("cannot shadow builtin name '{}'", var)),
                        ));
                    }
                    let iterable = self.eval(iter).await.map_err(|e| at(stmt.line, e))?;
                    let items: Vec<Value> = match iterable {
                        Value::Array(items) => items,
                        Value::String(s) => s
                            .chars()
                            .map(|c| Value::String(c.to_string()))
                            .collect(),
                        other => {
                            return Err(at(
                                stmt.line,
                                Error::script(format!(
                                    "cannot iterate over {}",
                                    type_name(&other)
                                )),
                            ))
                        }
                    };
                    for item in items {
                        self.check_deadline()?;
                        self.scopes.push(HashMap::new());
                        if let Some(scope) = self.scopes.last_mut() {
                            scope.insert(var.clone(), item);
                        }
                        let flow = self.exec_block(body).await;
                        self.scopes.pop();
                        match flow? {
                            Flow::Break => break,
                            Flow::Continue | Flow::Normal => {}
                        }
                    }
                    Ok(Flow::Normal)
                }
                StmtKind::Break => Ok(Flow::Break),
                StmtKind::Continue => Ok(Flow::Continue),
                StmtKind::Expr(expr) => {
                    self.eval(expr).await.map_err(|e| at(stmt.line, e))?;
                    Ok(Flow::Normal)
                }
            }
        }
        .boxed()
    }

    /// Write through to a variable or a path inside one (`x`, `x[0]`,
    /// `x.field`, `x[0].field` and so on). The root must be a variable.
    async fn assign(&mut self, target: &Expr, value: Value) -> Result<()> {
        // Collect the accessor chain down to the root identifier.
        let mut segments: Vec<PathSeg> = Vec::new();
        let mut cursor = target;
        let root = loop {
            match cursor {
                Expr::Ident(name) => break name.clone(),
                Expr::Field { target, name } => {
                    segments.push(PathSeg::Key(name.clone()));
                    cursor = target;
                }
                Expr::Index { target, index } => {
                    let idx = self.eval(index).await?;
                    segments.push(PathSeg::Value(idx));
                    cursor = target;
                }
                _ => return Err(Error::script("left side cannot be assigned to")),
            }
        };
        segments.reverse();

        if is_reserved(&root) {
            return Err(Error::script(format!(
                "cannot assign to builtin name '{}'",
                root
            )));
        }
        let slot = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(&root))
            .ok_or_else(|| Error::UndefinedName(root.clone()))?;

        let mut place = slot;
        for segment in &segments {
            place = match segment {
                PathSeg::Key(key) => match place {
                    Value::Object(map) => map
                        .entry(key.clone())
                        .or_insert(Value::Null),
                    other => {
                        return Err(Error::script(format!(
                            "cannot set field '{}' on {}",
                            key,
                            type_name(other)
                        )))
                    }
                },
                PathSeg::Value(idx) => match (&mut *place, idx) {
                    (Value::Array(items), Value::Number(n)) => {
                        let i = integer_index(n)?;
                        if i >= items.len() {
                            return Err(Error::script(format!(
                                "index {} out of bounds (len {})",
                                i,
                                items.len()
                            )));
                        }
                        &mut items[i]
                    }
                    (Value::Object(map), Value::String(key)) => {
                        map.entry(key.clone()).or_insert(Value::Null)
                    }
                    (other, idx) => {
                        return Err(Error::script(format!(
                            "cannot index {} with {}",
                            type_name(other),
                            type_name(idx)
                        )))
                    }
                },
            };
        }
        *place = value;
        Ok(())
    }

    fn eval<'a>(&'a mut self, expr: &'a Expr) -> BoxFuture<'a, Result<Value>> {
        async move {
            match expr {
                Expr::Null => Ok(Value::Null),
                Expr::Bool(b) => Ok(Value::Bool(*b)),
                Expr::Number(n) => number(*n),
                Expr::Str(s) => Ok(Value::String(s.clone())),
                Expr::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(self.eval(item).await?);
                    }
                    Ok(Value::Array(out))
                }
                Expr::Object(fields) => {
                    let mut map = serde_json::Map::new();
                    for (key, value) in fields {
                        let value = self.eval(value).await?;
                        map.insert(key.clone(), value);
                    }
                    Ok(Value::Object(map))
                }
                Expr::Ident(name) => self.lookup(name),
                Expr::Field { target, name } => {
                    if let Expr::Ident(ns) = &**target {
                        if ns == TOOL_NAMESPACE {
                            return Err(Error::script(format!(
                                "tool '{}.{}' must be called, e.g. {}.{}(...)",
                                TOOL_NAMESPACE, name, TOOL_NAMESPACE, name
                            )));
                        }
                    }
                    let target = self.eval(target).await?;
                    match target {
                        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
                        other => Err(Error::script(format!(
                            "cannot read field '{}' of {}",
                            name,
                            type_name(&other)
                        ))),
                    }
                }
                Expr::Index { target, index } => {
                    let target = self.eval(target).await?;
                    let index = self.eval(index).await?;
                    match (target, index) {
                        (Value::Array(items), Value::Number(n)) => {
                            let i = integer_index(&n)?;
                            if i >= items.len() {
                                return Err(Error::script(format!(
                                    "index {} out of bounds (len {})",
                                    i,
                                    items.len()
                                )));
                            }
                            Ok(items[i].clone())
                        }
                        (Value::Object(map), Value::String(key)) => {
                            Ok(map.get(&key).cloned().unwrap_or(Value::Null))
                        }
                        (Value::String(s), Value::Number(n)) => {
                            let i = integer_index(&n)?;
                            match s.chars().nth(i) {
                                Some(c) => Ok(Value::String(c.to_string())),
                                None => Err(Error::script(format!(
                                    "index {} out of bounds (len {})",
                                    i,
                                    s.chars().count()
                                ))),
                            }
                        }
                        (target, index) => Err(Error::script(format!(
                            "cannot index {} with {}",
                            type_name(&target),
                            type_name(&index)
                        ))),
                    }
                }
                Expr::Unary { op, expr } => {
                    let value = self.eval(expr).await?;
                    match op {
                        UnaryOp::Not => Ok(Value::Bool(!truthy(&value))),
                        UnaryOp::Neg => number(-num_of(&value)?),
                    }
                }
                Expr::Binary { op, lhs, rhs } => {
                    // Short-circuit forms first
                    match op {
                        BinOp::And => {
                            let lhs = self.eval(lhs).await?;
                            if !truthy(&lhs) {
                                return Ok(Value::Bool(false));
                            }
                            let rhs = self.eval(rhs).await?;
                            return Ok(Value::Bool(truthy(&rhs)));
                        }
                        BinOp::Or => {
                            let lhs = self.eval(lhs).await?;
                            if truthy(&lhs) {
                                return Ok(Value::Bool(true));
                            }
                            let rhs = self.eval(rhs).await?;
                            return Ok(Value::Bool(truthy(&rhs)));
                        }
                        _ => {}
                    }
                    let lhs = self.eval(lhs).await?;
                    let rhs = self.eval(rhs).await?;
                    binary_op(*op, lhs, rhs)
                }
                Expr::Call { target, args } => {
                    let mut evaluated = Vec::with_capacity(args.len());
                    for arg in args {
                        evaluated.push(self.eval(arg).await?);
                    }
                    match &**target {
                        Expr::Field { target: ns, name } if is_tool_namespace(ns) => {
                            self.call_tool(name, &evaluated).await
                        }
                        Expr::Ident(name) => self.call_builtin(name, evaluated).await,
                        _ => Err(Error::script("value is not callable")),
                    }
                }
            }
        }
        .boxed()
    }

    fn lookup(&self, name: &str) -> Result<Value> {
        if name == TOOL_NAMESPACE {
            return Err(Error::script(format!(
                "'{}' is the tool namespace; call {}.<operation>(...)",
                TOOL_NAMESPACE, TOOL_NAMESPACE
            )));
        }
        if BUILTINS.contains(&name) {
            return Err(Error::script(format!(
                "'{}' is a builtin function; call it with (...)",
                name
            )));
        }
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
            .ok_or_else(|| Error::UndefinedName(name.to_string()))
    }

    /// Dispatch into the bound tool namespace. Suspension point: the await
    /// here is where a tool call parks the script.
    async fn call_tool(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let op = ToolOp::from_name(name).ok_or_else(|| {
            Error::UnknownTool(format!("{}.{}", TOOL_NAMESPACE, name))
        })?;
        tokio::select! {
            result = self.tools.call(op, args) => result,
            _ = self.cancel.cancelled() => Err(Error::Timeout(self.budget_ms)),
        }
    }

    /// The complete builtin table. A name missing here does not exist.
    async fn call_builtin(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        match name {
            "log" => {
                let line = args
                    .iter()
                    .map(render)
                    .collect::<Vec<_>>()
                    .join(" ");
                self.output.push(line)?;
                Ok(Value::Null)
            }
            "sleep" => {
                let [ms] = take_args::<1>(name, args)?;
                let ms = num_of(&ms)?.max(0.0) as u64;
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => Ok(Value::Null),
                    _ = self.cancel.cancelled() => Err(Error::Timeout(self.budget_ms)),
                }
            }
            "len" => {
                let [value] = take_args::<1>(name, args)?;
                let len = match &value {
                    Value::String(s) => s.chars().count(),
                    Value::Array(items) => items.len(),
                    Value::Object(map) => map.len(),
                    other => {
                        return Err(Error::script(format!(
                            "len() of {}",
                            type_name(other)
                        )))
                    }
                };
                number(len as f64)
            }
            "str" => {
                let [value] = take_args::<1>(name, args)?;
                Ok(Value::String(render(&value)))
            }
            "num" => {
                let [value] = take_args::<1>(name, args)?;
                match &value {
                    Value::Number(_) => Ok(value),
                    Value::Bool(b) => number(if *b { 1.0 } else { 0.0 }),
                    Value::String(s) => s
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| Error::script(format!("num() cannot parse {:?}", s)))
                        .and_then(number),
                    other => Err(Error::script(format!("num() of {}", type_name(other)))),
                }
            }
            "lower" => {
                let [value] = take_args::<1>(name, args)?;
                Ok(Value::String(str_of(name, &value)?.to_lowercase()))
            }
            "upper" => {
                let [value] = take_args::<1>(name, args)?;
                Ok(Value::String(str_of(name, &value)?.to_uppercase()))
            }
            "contains" => {
                let [hay, needle] = take_args::<2>(name, args)?;
                let found = match &hay {
                    Value::String(s) => s.contains(str_of(name, &needle)?),
                    Value::Array(items) => items.iter().any(|i| values_equal(i, &needle)),
                    other => {
                        return Err(Error::script(format!(
                            "contains() of {}",
                            type_name(other)
                        )))
                    }
                };
                Ok(Value::Bool(found))
            }
            "split" => {
                let [s, sep] = take_args::<2>(name, args)?;
                let s = str_of(name, &s)?;
                let sep = str_of(name, &sep)?;
                let parts: Vec<Value> = if sep.is_empty() {
                    s.chars().map(|c| Value::String(c.to_string())).collect()
                } else {
                    s.split(sep).map(|p| Value::String(p.to_string())).collect()
                };
                Ok(Value::Array(parts))
            }
            "join" => {
                let [items, sep] = take_args::<2>(name, args)?;
                let Value::Array(items) = items else {
                    return Err(Error::script("join() takes an array and a separator"));
                };
                let sep = str_of(name, &sep)?;
                Ok(Value::String(
                    items.iter().map(render).collect::<Vec<_>>().join(sep),
                ))
            }
            "push" => {
                let [items, value] = take_args::<2>(name, args)?;
                let Value::Array(mut items) = items else {
                    return Err(Error::script("push() takes an array and a value"));
                };
                items.push(value);
                Ok(Value::Array(items))
            }
            "keys" => {
                let [value] = take_args::<1>(name, args)?;
                let Value::Object(map) = value else {
                    return Err(Error::script("keys() takes an object"));
                };
                Ok(Value::Array(
                    map.keys().map(|k| Value::String(k.clone())).collect(),
                ))
            }
            "range" => {
                let (start, end) = match args.len() {
                    1 => (0.0, num_of(&args[0])?),
                    2 => (num_of(&args[0])?, num_of(&args[1])?),
                    n => {
                        return Err(Error::script(format!(
                            "range() takes 1 or 2 arguments, got {}",
                            n
                        )))
                    }
                };
                let mut out = Vec::new();
                let mut i = start.floor();
                while i < end {
                    // This loop never suspends, so it enforces the deadline itself
                    self.check_deadline()?;
                    out.push(number(i)?);
                    i += 1.0;
                }
                Ok(Value::Array(out))
            }
            "json_parse" => {
                let [s] = take_args::<1>(name, args)?;
                let s = str_of(name, &s)?;
                serde_json::from_str(s)
                    .map_err(|e| Error::script(format!("json_parse: {}", e)))
            }
            "json_str" => {
                let [value] = take_args::<1>(name, args)?;
                Ok(Value::String(value.to_string()))
            }
            other => Err(Error::script(format!(
                "'{}' is not a known function",
                other
            ))),
        }
    }
}

enum PathSeg {
    Key(String),
    Value(Value),
}

fn is_tool_namespace(expr: &Expr) -> bool {
    matches!(expr, Expr::Ident(name) if name == TOOL_NAMESPACE)
}

fn is_reserved(name: &str) -> bool {
    name == TOOL_NAMESPACE || BUILTINS.contains(&name)
}

fn at(line: usize, err: Error) -> Error {
    match err {
        // Timeouts and already-located errors pass through untouched
        Error::Timeout(_) | Error::Parse { .. } => err,
        Error::Script(msg) => Error::Script(format!("line {}: {}", line, msg)),
        other => Error::Script(format!("line {}: {}", line, other)),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a value the way `log` and `str` show it: strings bare, everything
/// else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Indexes must be exact non-negative integers; `xs[1.5]` is an error, not
/// a truncated `xs[1]`. Bounds are checked at the call site.
fn integer_index(n: &serde_json::Number) -> Result<usize> {
    let i = n.as_f64().unwrap_or(-1.0);
    if i < 0.0 || i.fract() != 0.0 {
        return Err(Error::script(format!(
            "index {} is not a non-negative integer",
            i
        )));
    }
    Ok(i as usize)
}

fn num_of(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::script("number out of range")),
        other => Err(Error::script(format!(
            "expected a number, got {}",
            type_name(other)
        ))),
    }
}

fn str_of<'v>(builtin: &str, value: &'v Value) -> Result<&'v str> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(Error::script(format!(
            "{}() expected a string, got {}",
            builtin,
            type_name(other)
        ))),
    }
}

/// Integral results become JSON integers so logs read `3`, not `3.0`, and
/// so they compare cleanly against integers in tool results.
fn number(n: f64) -> Result<Value> {
    if !n.is_finite() {
        return Err(Error::script("arithmetic produced a non-finite number"));
    }
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Ok(Value::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| Error::script("arithmetic produced a non-finite number"))
}

/// Numeric equality compares by value, so integers coming back from tool
/// results equal the script's float literals.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

fn binary_op(op: BinOp, lhs: Value, rhs: Value) -> Result<Value> {
    match op {
        BinOp::Add => match (&lhs, &rhs) {
            // String on either side concatenates, like "count: " + n
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", render(&lhs), render(&rhs))))
            }
            (Value::Array(xs), Value::Array(ys)) => {
                let mut out = xs.clone();
                out.extend(ys.iter().cloned());
                Ok(Value::Array(out))
            }
            _ => number(num_of(&lhs)? + num_of(&rhs)?),
        },
        BinOp::Sub => number(num_of(&lhs)? - num_of(&rhs)?),
        BinOp::Mul => number(num_of(&lhs)? * num_of(&rhs)?),
        BinOp::Div => number(num_of(&lhs)? / num_of(&rhs)?),
        BinOp::Rem => number(num_of(&lhs)? % num_of(&rhs)?),
        BinOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinOp::Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::String(a), Value::String(b)) => a.cmp(b),
                _ => {
                    let (a, b) = (num_of(&lhs)?, num_of(&rhs)?);
                    a.partial_cmp(&b)
                        .ok_or_else(|| Error::script("values cannot be compared"))?
                }
            };
            let result = match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        BinOp::And | BinOp::Or => Err(Error::Internal("short-circuit op reached binary_op".into())),
    }
}

fn take_args<const N: usize>(builtin: &str, args: Vec<Value>) -> Result<[Value; N]> {
    let len = args.len();
    args.try_into().map_err(|_| {
        Error::script(format!(
            "{}() takes {} argument(s), got {}",
            builtin, N, len
        ))
    })
}
