use std::process::ExitCode;

fn main() -> ExitCode {
    dbcopy_lib::run()
}
