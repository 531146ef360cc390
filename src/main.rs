use std::fs;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;

use quill::{Interpreter, QuillError};

fn main() -> Result<ExitCode> {
    let mut args = std::env::args().skip(1);
    match args.next() {
        Some(path) => {
            if args.next().is_some() {
                bail!("Only one script file is supported");
            }
            run_file(&path)
        }
        None => read_loop(),
    }
}

fn run_file(path: &str) -> Result<ExitCode> {
    let source = fs::read_to_string(path).with_context(|| format!("Reading {path}"))?;
    let mut interpreter = Interpreter::new(source);
    let result = interpreter.interpret();
    flush_output(&mut interpreter);
    match result {
        Ok(value) => {
            if !value.is_none() {
                println!("{}", value.to_output().yellow());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            report(&error);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn read_loop() -> Result<ExitCode> {
    let stdin = io::stdin();
    loop {
        print!(">>> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        let mut interpreter = Interpreter::new(input);
        let result = interpreter.interpret();
        flush_output(&mut interpreter);
        match result {
            Ok(value) if !value.is_none() => println!("{}", value.to_output().yellow()),
            Ok(_) => {}
            Err(error) => report(&error),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn flush_output(interpreter: &mut Interpreter) {
    for printed in interpreter.take_output() {
        println!("{printed}");
    }
}

fn report(error: &QuillError) {
    eprintln!("{}: {}", error.stage().red(), error.red());
}
