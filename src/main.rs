//! NasCatalog command-line entry point.

use clap::Parser;
use nascatalog::{
    cli::Cli,
    error::{ExitCode, StructuredError},
};

fn main() {
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match nascatalog::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let prefix = ExitCode::GeneralError.code_prefix();
            if json_errors {
                let structured = StructuredError::new(&err, ExitCode::GeneralError);
                if let Ok(json) = serde_json::to_string_pretty(&structured) {
                    eprintln!("{}", json);
                } else {
                    eprintln!("[{}] Error: {}", prefix, err);
                }
            } else {
                eprintln!("[{}] Error: {}", prefix, err);
            }

            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    }
}
