use std::process::ExitCode;

fn main() -> ExitCode {
    pantry_cli::run()
}
