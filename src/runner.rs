use std::fs;
use std::io::{self, Write};

use encoding_rs::UTF_8;

use crate::environment::{Environment, EnvironmentRef};
use crate::evaluator::evaluate;
use crate::lexer::Lexer;
use crate::object::Value;
use crate::parser::Parser;

/*
This module is the ambient shell around the three core subsystems: it is what a caller
outside the language (a file runner, an interactive prompt) looks like when it drives
`Lexer` → `Parser` → `evaluate`. None of the language's own invariants live here — only
process-level wiring, which is why its failures (a missing file, a malformed byte stream)
surface as ordinary `io::Result` errors rather than the language's own parse-error list or
`Value::Error`.
*/

pub const EXIT_OK: i32 = 0;
pub const EXIT_PARSE_ERROR: i32 = 65;
pub const EXIT_IO_ERROR: i32 = 74;

pub fn run_file(path: &str) -> i32 {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::error!("no se pudo leer {}: {}", path, err);
            return EXIT_IO_ERROR;
        }
    };

    // Scripts are expected to be UTF-8, but `encoding_rs` gives us graceful, panic-free
    // decoding of whatever bytes a user actually hands the interpreter instead of an
    // `expect()` that would abort the whole process on a stray invalid byte.
    let (source, _encoding, had_errors) = UTF_8.decode(&bytes);
    if had_errors {
        log::warn!("{} contiene bytes que no son UTF-8 válido; se reemplazaron", path);
    }

    let env = Environment::new();
    match run(&source, &env) {
        Ok(value) => {
            println!("{}", value.inspect());
            EXIT_OK
        }
        Err(errors) => {
            for error in errors {
                eprintln!("{}", error);
            }
            EXIT_PARSE_ERROR
        }
    }
}

pub fn run_prompt() {
    // Routed through `encoding_rs_io` rather than a plain `BufReader` so a terminal that
    // feeds the prompt non-UTF-8 bytes degrades to lossy replacement instead of a `read_line`
    // that errors out and kills the whole session.
    let mut stdin = io::BufReader::new(
        encoding_rs_io::DecodeReaderBytesBuilder::new()
            .encoding(Some(UTF_8))
            .build(io::stdin()),
    );
    let mut stdout = io::stdout();
    let env = Environment::new();

    loop {
        print!(">> ");
        if stdout.flush().is_err() {
            log::error!("no se pudo escribir en la salida estándar");
            return;
        }

        let mut line = String::new();
        let bytes_read = match io::BufRead::read_line(&mut stdin, &mut line) {
            Ok(n) => n,
            Err(err) => {
                log::error!("no se pudo leer la entrada estándar: {}", err);
                return;
            }
        };
        if bytes_read == 0 {
            // EOF (Ctrl-D).
            return;
        }

        let source = line.trim_end_matches(['\n', '\r']);

        match source {
            "salir()" => return,
            "limpiar()" => clear_screen(),
            "historia()" => {
                println!("el historial de la sesión no está disponible en esta versión.")
            }
            _ => match run(source, &env) {
                Ok(value) => println!("{}", value.inspect()),
                Err(errors) => errors.iter().for_each(|error| println!("{}", error)),
            },
        }
    }
}

fn clear_screen() {
    // ANSI clear-and-home; portable enough for the terminals the prompt targets.
    print!("\x1B[2J\x1B[1;1H");
    let _ = io::stdout().flush();
}

fn run(source: &str, env: &EnvironmentRef) -> Result<Value, Vec<String>> {
    let lexer = Lexer::new(source);
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();

    if !parser.errors.is_empty() {
        log::debug!("{} error(es) de análisis sintáctico", parser.errors.len());
        return Err(parser.errors);
    }

    Ok(evaluate(&program, env))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_evaluates_a_program_against_the_given_environment() {
        let env = Environment::new();
        let value = run("variable x = 5; x;", &env).expect("should evaluate cleanly");
        assert_eq!(value.inspect(), "5");
    }

    #[test]
    fn run_collects_every_parse_error() {
        let env = Environment::new();
        let errors = run("variable x 5;", &env).expect_err("should fail to parse");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn bindings_persist_across_independent_run_calls_sharing_an_environment() {
        let env = Environment::new();
        run("variable x = 10;", &env).unwrap();
        let value = run("x + 1;", &env).unwrap();
        assert_eq!(value.inspect(), "11");
    }
}
