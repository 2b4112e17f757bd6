use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{Debug, Display},
    rc::Rc,
};

use monkey_syntax::ast::Block;

use crate::{
    environment::Env,
    error::{make, ErrorMsg, Exception, RuntimeError},
    interpret::Interpreter,
};

/// Arrays, hashes and functions sit behind an `Rc` so that
/// copying a value shares it, and `==` can compare identity.
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Str(String),
    Array(Rc<Vec<Value>>),
    Hash(Rc<HashMap<HashKey, Value>>),
    Func(Rc<Func>),
    Builtin(Builtin),
    Null,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "INTEGER",
            Self::Boolean(_) => "BOOLEAN",
            Self::Str(_) => "STRING",
            Self::Array(_) => "ARRAY",
            Self::Hash(_) => "HASH",
            Self::Func(_) => "FUNCTION",
            Self::Builtin(_) => "BUILTIN",
            Self::Null => "NULL",
        }
    }

    /// Only `false` and `null` are falsy, every other value
    /// (including `0` and the empty string) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(b) => *b,
            _ => true,
        }
    }

    pub fn to_hash_key(&self) -> Option<HashKey> {
        let key = match self {
            Self::Integer(n) => HashKey::Integer(*n),
            Self::Boolean(b) => HashKey::Boolean(*b),
            Self::Str(s) => HashKey::Str(s.clone()),
            _ => return None,
        };
        Some(key)
    }

    /// Equality as seen by the `==` operator: scalars compare by
    /// value, compound values by identity, and values of different
    /// kinds are never equal.
    pub fn is_identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(m), Self::Integer(n)) => m == n,
            (Self::Boolean(m), Self::Boolean(n)) => m == n,
            (Self::Str(m), Self::Str(n)) => m == n,
            (Self::Null, Self::Null) => true,
            (Self::Array(m), Self::Array(n)) => Rc::ptr_eq(m, n),
            (Self::Hash(m), Self::Hash(n)) => Rc::ptr_eq(m, n),
            (Self::Func(m), Self::Func(n)) => Rc::ptr_eq(m, n),
            (Self::Builtin(m), Self::Builtin(n)) => m == n,
            _ => false,
        }
    }
}

/// Structural equality, which is what tests want to assert on.
/// The language's own `==` goes through [`Value::is_identical`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array(m), Self::Array(n)) => m == n,
            (Self::Hash(m), Self::Hash(n)) => m == n,
            _ => self.is_identical(other),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
            Self::Array(elems) => {
                let elems = elems.iter().map(|e| e.to_string()).collect::<Vec<_>>();
                write!(f, "[{}]", elems.join(", "))
            }
            Self::Hash(pairs) => {
                let pairs = pairs
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Self::Func(func) => write!(f, "{func}"),
            Self::Builtin(builtin) => write!(f, "{builtin}"),
            Self::Null => f.write_str("null"),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => f.debug_tuple("Integer").field(n).finish(),
            Self::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Array(elems) => f.debug_tuple("Array").field(elems).finish(),
            Self::Hash(pairs) => f.debug_tuple("Hash").field(pairs).finish(),
            Self::Func(func) => f.debug_tuple("Func").field(func).finish(),
            Self::Builtin(builtin) => f.debug_tuple("Builtin").field(builtin).finish(),
            Self::Null => f.write_str("Null"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HashKey {
    Integer(i64),
    Boolean(bool),
    Str(String),
}

impl Display for HashKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

pub trait Callable {
    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception>;
}

pub struct Func {
    pub params: Vec<String>,
    pub body: Block,
    /// The environment the function was defined in
    pub env: Rc<RefCell<Env>>,
}

/// The captured environment is left out, since it may well
/// contain the function itself.
impl Debug for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Func")
            .field("params", &self.params)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl Display for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn({}) {}", self.params.join(", "), self.body)
    }
}

impl Callable for Rc<Func> {
    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
        interpreter.call_func(Rc::clone(self), args)
    }
}

/// A function provided by the host. The body only ever sees
/// argument lists of the declared arity.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    /// The expected number of arguments, or `None` if variadic
    pub(crate) arity: Option<usize>,
    pub(crate) body: fn(Vec<Value>) -> Result<Value, RuntimeError>,
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.arity == other.arity
    }
}

impl Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "builtin fn {}", self.name)
    }
}

impl Callable for Builtin {
    fn call(&self, _: &mut Interpreter, args: Vec<Value>) -> Result<Value, Exception> {
        if let Some(want) = self.arity {
            if args.len() != want {
                return Err(make(
                    ErrorMsg::WrongArgCount,
                    format!("`{}` takes {want}, got {}", self.name, args.len()),
                )
                .into());
            }
        }
        Ok((self.body)(args)?)
    }
}
