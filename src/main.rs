//! tcrecipe - resolve anchored toolchain build recipes

use std::process::ExitCode;

fn main() -> ExitCode {
    match tcrecipe::cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
