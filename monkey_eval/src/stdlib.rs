use std::rc::Rc;

use crate::{
    environment::Env,
    error::{make, ErrorMsg, RuntimeError},
    types::{Builtin, Value},
};

const BUILTINS: [Builtin; 6] = [
    Builtin {
        name: "len",
        arity: Some(1),
        body: len,
    },
    Builtin {
        name: "first",
        arity: Some(1),
        body: first,
    },
    Builtin {
        name: "last",
        arity: Some(1),
        body: last,
    },
    Builtin {
        name: "rest",
        arity: Some(1),
        body: rest,
    },
    Builtin {
        name: "push",
        arity: Some(2),
        body: push,
    },
    Builtin {
        name: "puts",
        arity: None,
        body: puts,
    },
];

pub fn init(env: &mut Env) {
    for builtin in BUILTINS {
        env.set(builtin.name, Value::Builtin(builtin));
    }
}

fn expect_array<'a>(name: &str, arg: &'a Value) -> Result<&'a Rc<Vec<Value>>, RuntimeError> {
    match arg {
        Value::Array(elems) => Ok(elems),
        _ => Err(make(
            ErrorMsg::UnsupportedArg,
            format!("`{name}` expects ARRAY, got {}", arg.type_name()),
        )),
    }
}

fn len(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let len = match &args[0] {
        Value::Str(s) => s.len(),
        Value::Array(elems) => elems.len(),
        arg => {
            return Err(make(
                ErrorMsg::UnsupportedArg,
                format!("`len` expects STRING or ARRAY, got {}", arg.type_name()),
            ))
        }
    };
    Ok(Value::Integer(len as i64))
}

fn first(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let elems = expect_array("first", &args[0])?;
    Ok(elems.first().cloned().unwrap_or(Value::Null))
}

fn last(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let elems = expect_array("last", &args[0])?;
    Ok(elems.last().cloned().unwrap_or(Value::Null))
}

fn rest(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let elems = expect_array("rest", &args[0])?;
    if elems.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Array(Rc::new(elems[1..].to_vec())))
}

fn push(args: Vec<Value>) -> Result<Value, RuntimeError> {
    let elems = expect_array("push", &args[0])?;
    let mut pushed = elems.as_ref().clone();
    pushed.push(args[1].clone());
    Ok(Value::Array(Rc::new(pushed)))
}

fn puts(args: Vec<Value>) -> Result<Value, RuntimeError> {
    for arg in args {
        println!("{arg}");
    }
    Ok(Value::Null)
}
