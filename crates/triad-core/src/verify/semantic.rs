//! Stage 2: internal consistency with the classification.

use async_trait::async_trait;

use triad_types::{Destination, Semantics};

use super::{Stage, StageResult, VerificationContext, Verifier};

/// Checks that the shape of the action agrees with what the operation
/// was classified as: file-destination actions touch files,
/// process-destination actions declare a command, stream-destination
/// actions carry output, and read-semantics actions declare no writes.
pub struct SemanticVerifier;

#[async_trait]
impl Verifier for SemanticVerifier {
    fn stage(&self) -> Stage {
        Stage::Semantic
    }

    async fn verify(&self, ctx: &VerificationContext) -> StageResult {
        let Some(classification) = &ctx.operation.classification else {
            return StageResult::fail(Stage::Semantic, "operation has no classification");
        };
        let action = &ctx.action;

        match classification.destination {
            Destination::File => {
                if action.file_reads.is_empty() && action.file_writes.is_empty() {
                    return StageResult::fail(
                        Stage::Semantic,
                        "file-destination action declares no file effects",
                    );
                }
            }
            Destination::Process => {
                if action.command.is_none() {
                    return StageResult::fail(
                        Stage::Semantic,
                        "process-destination action declares no command",
                    );
                }
            }
            Destination::Stream => {
                if action.output_text.is_none() {
                    return StageResult::fail(
                        Stage::Semantic,
                        "stream-destination action declares no output",
                    );
                }
            }
        }

        if classification.semantics == Semantics::Read && !action.file_writes.is_empty() {
            return StageResult::fail(
                Stage::Semantic,
                format!(
                    "read-semantics action declares writes: {}",
                    action.file_writes.join(", ")
                ),
            );
        }

        StageResult::pass(
            Stage::Semantic,
            format!("action consistent with {}", classification.triple()),
        )
    }
}
