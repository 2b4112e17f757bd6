use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::debug;
use monkey_syntax::{
    ast::{Block, Expr, InfixOp, Literal, PrefixOp, Program, Stmt},
    stack::ensure_sufficient_stack,
};

use crate::{
    environment::Env,
    error::{make, ErrorMsg, Exception, RuntimeError},
    types::{Callable, Func, Value},
};

/// Deepest chain of nested function calls a program may build
pub const MAX_CALL_DEPTH: usize = 10_000;

#[derive(Debug)]
pub struct Interpreter {
    pub env: Rc<RefCell<Env>>,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Interpreter {
    pub fn new(env: Option<Rc<RefCell<Env>>>) -> Self {
        Self {
            env: env.unwrap_or_else(Env::new),
            depth: 0,
        }
    }

    /// Evaluate a program and return the value of its last
    /// statement. A top level `return` ends the program early
    /// with the returned value.
    pub fn interpret_all(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        let mut result = Value::Null;
        for stmt in &program.stmts {
            match self.interpret(stmt) {
                Ok(value) => result = value,
                Err(Exception::Return(value)) => return Ok(value),
                Err(Exception::Error(e)) => return Err(e),
            }
        }
        Ok(result)
    }

    pub fn interpret(&mut self, stmt: &Stmt) -> Result<Value, Exception> {
        self.interpret_stmt(stmt)
    }

    fn interpret_stmt(&mut self, stmt: &Stmt) -> Result<Value, Exception> {
        match stmt {
            Stmt::Let { ident, value } => self.interpret_let_stmt(ident, value),
            Stmt::Return(expr) => self.interpret_return_stmt(expr.as_ref()),
            Stmt::Expr(expr) => self.interpret_expr(expr),
        }
    }

    fn interpret_let_stmt(&mut self, ident: &str, expr: &Expr) -> Result<Value, Exception> {
        let value = self.interpret_expr(expr)?;
        self.env.borrow_mut().set(ident, value);
        Ok(Value::Null)
    }

    fn interpret_return_stmt(&mut self, expr: Option<&Expr>) -> Result<Value, Exception> {
        let value = match expr {
            Some(expr) => self.interpret_expr(expr)?,
            None => Value::Null,
        };
        Err(Exception::Return(value))
    }

    /// Blocks share the scope they appear in. Any exception
    /// stops the block and is handed to the caller as is.
    fn interpret_block(&mut self, block: &Block) -> Result<Value, Exception> {
        let mut result = Value::Null;
        for stmt in &block.stmts {
            result = self.interpret_stmt(stmt)?;
        }
        Ok(result)
    }

    /// Evaluate an expression. Errors raised underneath it are
    /// tagged with its line, if they are not tagged already.
    fn interpret_expr(&mut self, expr: &Expr) -> Result<Value, Exception> {
        let res = ensure_sufficient_stack(|| self.interpret_node(expr));
        match (res, expr.line()) {
            (Err(Exception::Error(e)), Some(line)) => Err(e.with_line(line).into()),
            (res, _) => res,
        }
    }

    fn interpret_node(&mut self, expr: &Expr) -> Result<Value, Exception> {
        match expr {
            Expr::Ident { name, .. } => self.interpret_ident(name),
            Expr::Literal(lit) => Ok(Self::interpret_literal(lit)),
            Expr::Prefix { op, expr, .. } => self.interpret_prefix(op, expr),
            Expr::Infix { lhs, op, rhs, .. } => self.interpret_infix(lhs, *op, rhs),
            Expr::If {
                condition,
                consequence,
                alternative,
            } => self.interpret_if_expr(condition, consequence, alternative.as_ref()),
            Expr::Function { params, body } => Ok(Value::Func(Rc::new(Func {
                params: params.clone(),
                body: body.clone(),
                env: Rc::clone(&self.env),
            }))),
            Expr::Call { func, args, .. } => self.interpret_func_call(func, args),
            Expr::Array(elems) => Ok(Value::Array(Rc::new(self.interpret_exprs(elems)?))),
            Expr::Hash { pairs, .. } => self.interpret_hash(pairs),
            Expr::Index { expr, index, .. } => self.interpret_index(expr, index),
        }
    }

    fn interpret_ident(&self, name: &str) -> Result<Value, Exception> {
        self.env
            .borrow()
            .get(name)
            .ok_or_else(|| make(ErrorMsg::IdentNotFound, name).into())
    }

    fn interpret_literal(lit: &Literal) -> Value {
        match lit {
            Literal::Integer(n) => Value::Integer(*n),
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
        }
    }

    fn interpret_prefix(&mut self, op: &PrefixOp, expr: &Expr) -> Result<Value, Exception> {
        let value = self.interpret_expr(expr)?;
        match op {
            PrefixOp::Bang => Ok(Value::Boolean(!value.is_truthy())),
            PrefixOp::Minus => match value {
                Value::Integer(n) => Ok(Value::Integer(n.wrapping_neg())),
                _ => Err(make(ErrorMsg::TypeMismatch, format!("-{}", value.type_name())).into()),
            },
        }
    }

    fn interpret_infix(&mut self, lhs: &Expr, op: InfixOp, rhs: &Expr) -> Result<Value, Exception> {
        let left = self.interpret_expr(lhs)?;
        let right = self.interpret_expr(rhs)?;

        match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => Ok(Self::interpret_int_infix(*l, op, *r)?),
            (Value::Str(l), Value::Str(r)) => match op {
                InfixOp::Plus => Ok(Value::Str(format!("{l}{r}"))),
                InfixOp::EqualEqual => Ok(Value::Boolean(l == r)),
                InfixOp::BangEqual => Ok(Value::Boolean(l != r)),
                _ => Err(Self::operator_error(ErrorMsg::UnknownOperator, &left, op, &right)),
            },
            _ => match op {
                InfixOp::EqualEqual => Ok(Value::Boolean(left.is_identical(&right))),
                InfixOp::BangEqual => Ok(Value::Boolean(!left.is_identical(&right))),
                _ if left.type_name() != right.type_name() => Err(Self::operator_error(
                    ErrorMsg::TypeMismatch,
                    &left,
                    op,
                    &right,
                )),
                _ => Err(Self::operator_error(ErrorMsg::UnknownOperator, &left, op, &right)),
            },
        }
    }

    /// Arithmetic wraps around on overflow
    fn interpret_int_infix(left: i64, op: InfixOp, right: i64) -> Result<Value, RuntimeError> {
        Ok(match op {
            InfixOp::Plus => Value::Integer(left.wrapping_add(right)),
            InfixOp::Minus => Value::Integer(left.wrapping_sub(right)),
            InfixOp::Star => Value::Integer(left.wrapping_mul(right)),
            InfixOp::Slash => {
                if right == 0 {
                    return Err(make(ErrorMsg::DivisionByZero, format!("{left} {op} {right}")));
                }
                Value::Integer(left.wrapping_div(right))
            }
            InfixOp::Greater => Value::Boolean(left > right),
            InfixOp::Less => Value::Boolean(left < right),
            InfixOp::EqualEqual => Value::Boolean(left == right),
            InfixOp::BangEqual => Value::Boolean(left != right),
        })
    }

    fn operator_error(msg: ErrorMsg, left: &Value, op: InfixOp, right: &Value) -> Exception {
        make(
            msg,
            format!("{} {} {}", left.type_name(), op, right.type_name()),
        )
        .into()
    }

    fn interpret_if_expr(
        &mut self,
        condition: &Expr,
        consequence: &Block,
        alternative: Option<&Block>,
    ) -> Result<Value, Exception> {
        if self.interpret_expr(condition)?.is_truthy() {
            self.interpret_block(consequence)
        } else if let Some(block) = alternative {
            self.interpret_block(block)
        } else {
            Ok(Value::Null)
        }
    }

    /// Evaluate expressions from left to right, stopping at the first exception
    fn interpret_exprs(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, Exception> {
        exprs.iter().map(|expr| self.interpret_expr(expr)).collect()
    }

    fn interpret_func_call(&mut self, fn_expr: &Expr, arg_exprs: &[Expr]) -> Result<Value, Exception> {
        let value = self.interpret_expr(fn_expr)?;
        let func: Box<dyn Callable> = match value {
            Value::Func(f) => Box::new(f),
            Value::Builtin(f) => Box::new(f),
            _ => return Err(make(ErrorMsg::NotAFunction, value.type_name()).into()),
        };
        let args = self.interpret_exprs(arg_exprs)?;

        func.call(self, args)
    }

    pub(crate) fn call_func(&mut self, func: Rc<Func>, args: Vec<Value>) -> Result<Value, Exception> {
        // Ensure the number of arguments matches the function definition
        if func.params.len() != args.len() {
            return Err(make(
                ErrorMsg::WrongArgCount,
                format!("want {}, got {}", func.params.len(), args.len()),
            )
            .into());
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(make(ErrorMsg::CallDepthExceeded, MAX_CALL_DEPTH).into());
        }
        debug!("Call {func} with {args:?}");
        // The call scope hangs off the environment the function was
        // defined in, not the caller's
        let func_env = Env::with_parent(Rc::clone(&func.env));
        for (ident, value) in func.params.iter().zip(args) {
            func_env.borrow_mut().set(ident, value);
        }
        let old_env = std::mem::replace(&mut self.env, func_env);
        self.depth += 1;
        let res = self.interpret_block(&func.body);
        self.depth -= 1;
        // Restore the env
        self.env = old_env;

        // A return value stops at the function boundary,
        // whereas an error keeps propagating
        match res {
            Err(Exception::Return(value)) => Ok(value),
            res => res,
        }
    }

    fn interpret_hash(&mut self, pairs: &[(Expr, Expr)]) -> Result<Value, Exception> {
        let mut hash = HashMap::with_capacity(pairs.len());
        for (key_expr, value_expr) in pairs {
            let key = self.interpret_expr(key_expr)?;
            let Some(hash_key) = key.to_hash_key() else {
                return Err(make(ErrorMsg::NotHashable, key.type_name()).into());
            };
            let value = self.interpret_expr(value_expr)?;
            hash.insert(hash_key, value);
        }
        Ok(Value::Hash(Rc::new(hash)))
    }

    fn interpret_index(&mut self, expr: &Expr, index: &Expr) -> Result<Value, Exception> {
        let value = self.interpret_expr(expr)?;
        let index = self.interpret_expr(index)?;
        match (&value, &index) {
            // Out of range indices yield null rather than an error
            (Value::Array(elems), Value::Integer(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| elems.get(i))
                .cloned()
                .unwrap_or(Value::Null)),
            (Value::Hash(pairs), _) => {
                let Some(key) = index.to_hash_key() else {
                    return Err(make(ErrorMsg::NotHashable, index.type_name()).into());
                };
                Ok(pairs.get(&key).cloned().unwrap_or(Value::Null))
            }
            _ => Err(make(
                ErrorMsg::IndexNotSupported,
                format!("{}[{}]", value.type_name(), index.type_name()),
            )
            .into()),
        }
    }
}
