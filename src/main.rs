use std::env;

use lpp::runner::{run_file, run_prompt};

pub fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    // args always includes the program name in args[0]
    match args.len() {
        1 => run_prompt(),
        2 => {
            let exit_code = run_file(&args[1]);
            std::process::exit(exit_code);
        }
        _ => {
            eprintln!("uso: lpp [script]");
            std::process::exit(64);
        }
    }
}
