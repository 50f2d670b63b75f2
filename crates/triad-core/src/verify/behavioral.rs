//! Stage 3: observed effects match declared effects.

use async_trait::async_trait;

use super::{Stage, StageResult, VerificationContext, Verifier};

/// Compares what actually happened (in a sandbox or simulation) with
/// what the action declared. Every observed write must have been
/// declared, and nothing may spawn processes unless the action declared
/// a command. No observations at all is a pass: there is nothing to
/// contradict the declaration.
pub struct BehavioralVerifier;

#[async_trait]
impl Verifier for BehavioralVerifier {
    fn stage(&self) -> Stage {
        Stage::Behavioral
    }

    async fn verify(&self, ctx: &VerificationContext) -> StageResult {
        let undeclared: Vec<&String> = ctx
            .observed
            .writes
            .iter()
            .filter(|w| !ctx.action.file_writes.contains(w))
            .collect();
        if !undeclared.is_empty() {
            let paths: Vec<&str> = undeclared.iter().map(|s| s.as_str()).collect();
            return StageResult::fail(
                Stage::Behavioral,
                format!("undeclared writes observed: {}", paths.join(", ")),
            );
        }

        if !ctx.observed.spawns.is_empty() && ctx.action.command.is_none() {
            return StageResult::fail(
                Stage::Behavioral,
                format!(
                    "processes spawned without a declared command: {}",
                    ctx.observed.spawns.join(", ")
                ),
            );
        }

        StageResult::pass(Stage::Behavioral, "observed effects match declared effects")
    }
}
