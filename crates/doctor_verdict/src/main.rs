#![forbid(unsafe_code)]

fn main() {
    let integration = doctor_verdict::util::OutputIntegration::detect();
    if let Err(error) = doctor_verdict::run_from_env() {
        if integration.should_emit_json() {
            eprintln!(
                "{}",
                serde_json::json!({
                    "status": "error",
                    "kind": error.kind(),
                    "error": error.to_string(),
                    "problems": error.problems(),
                    "exit_code": error.exit_code(),
                    "integration": integration,
                })
            );
        } else if error.problems().is_empty() {
            eprintln!("{error}");
        } else {
            eprintln!("invalid verdict configuration:");
            for problem in error.problems() {
                eprintln!("  - {problem}");
            }
        }
        std::process::exit(error.exit_code());
    }
}
