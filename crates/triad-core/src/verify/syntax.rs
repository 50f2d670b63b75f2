//! Stage 1: structural validity of the action payload.

use async_trait::async_trait;

use super::{Stage, StageResult, VerificationContext, Verifier};

/// Checks that the action is structurally well-formed before anything
/// looks at its meaning: the payload is a JSON object, a declared
/// command is non-empty with balanced quoting, and claimed output is
/// not an empty string.
pub struct SyntaxVerifier;

#[async_trait]
impl Verifier for SyntaxVerifier {
    fn stage(&self) -> Stage {
        Stage::Syntax
    }

    async fn verify(&self, ctx: &VerificationContext) -> StageResult {
        let action = &ctx.action;

        if !action.payload.is_object() {
            return StageResult::fail(Stage::Syntax, "action payload must be a JSON object");
        }

        if let Some(command) = &action.command {
            if command.trim().is_empty() {
                return StageResult::fail(Stage::Syntax, "declared command is empty");
            }
            if !balanced_quotes(command) {
                return StageResult::fail(
                    Stage::Syntax,
                    format!("command has unbalanced quoting: {command}"),
                );
            }
        }

        if action.output_text.as_deref() == Some("") {
            return StageResult::fail(
                Stage::Syntax,
                "action claims generated output but the text is empty",
            );
        }

        StageResult::pass(Stage::Syntax, "action payload well-formed")
    }
}

/// Whether every single and double quote in `command` is closed.
/// Backslash escapes are honored outside single quotes, matching shell
/// rules closely enough for a structural check.
fn balanced_quotes(command: &str) -> bool {
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;

    for c in command.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if !in_single => escaped = true,
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            _ => {}
        }
    }

    !in_single && !in_double
}
