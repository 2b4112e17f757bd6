use clap::Parser;
use monkey_eval::{interpret::Interpreter, run};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

/// An interpreter for the Monkey programming language
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Script to evaluate. Starts a REPL when left out.
    file: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();
    match args.file {
        Some(path) => run_file(&path),
        None => run_repl(),
    }
}

fn run_repl() -> io::Result<()> {
    let (stdin, mut stdout) = (io::stdin(), io::stdout());
    let mut interpreter = Interpreter::default();
    loop {
        let mut line = String::default();
        print!(">> ");
        stdout.flush()?;
        // If zero bytes are read, then exit (usually triggered by Ctrl-D)
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        match run(&line, &mut interpreter) {
            Ok(value) => println!("{value}"),
            Err(errors) => errors.iter().for_each(|e| eprintln!("{e}")),
        }
    }
    Ok(())
}

fn run_file(path: &Path) -> io::Result<()> {
    let source = fs::read_to_string(path)?;
    let mut interpreter = Interpreter::default();
    match run(&source, &mut interpreter) {
        Ok(value) => println!("{value}"),
        Err(errors) => errors.iter().for_each(|e| eprintln!("{e}")),
    }
    Ok(())
}
