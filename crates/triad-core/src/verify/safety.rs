//! Stage 4: the fatal safety gate.
//!
//! A small table of pattern checks over the action's command, payload,
//! and summary. Any hit fails the stage, and a safety failure is never
//! downgraded: it halts the pipeline and forces rejection in both
//! modes.

use async_trait::async_trait;
use regex::Regex;

use super::{Stage, StageResult, VerificationContext, Verifier};

/// One safety pattern check.
struct SafetyCheck {
    id: &'static str,
    name: &'static str,
    pattern: Regex,
}

fn check(id: &'static str, name: &'static str, pattern: &str) -> SafetyCheck {
    SafetyCheck {
        id,
        name,
        pattern: Regex::new(pattern).unwrap(),
    }
}

/// Destructive, irreversible, and policy-violating action patterns.
fn built_in_checks() -> Vec<SafetyCheck> {
    vec![
        check(
            "SF-001",
            "recursive force delete",
            r"(?i)\brm\s+-[a-z]*(?:r[a-z]*f|f[a-z]*r)",
        ),
        check(
            "SF-002",
            "filesystem reformat",
            r"(?i)\bmkfs(?:\.[a-z0-9]+)?\b",
        ),
        check(
            "SF-003",
            "fork bomb",
            r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}",
        ),
        check(
            "SF-004",
            "raw device write",
            r"(?i)\bof=/dev/(?:sd|hd|nvme|mmcblk)|>\s*/dev/(?:sd|hd|nvme|mmcblk)",
        ),
        check(
            "SF-005",
            "world-writable root permissions",
            r"(?i)\bchmod\s+(?:-[a-z]+\s+)*777\s+/(?:\s|$|')",
        ),
        check(
            "SF-006",
            "remote script piped to shell",
            r"(?i)\b(?:curl|wget)\b[^|\n]*\|\s*(?:ba|z|da)?sh\b",
        ),
        check(
            "SF-007",
            "credential file access",
            r"(?i)/etc/shadow|\.ssh/id_[a-z0-9]+|\.aws/credentials",
        ),
        check(
            "SF-008",
            "privilege escalation to a root shell",
            r"(?i)\bsudo\s+(?:su|bash|sh|-i)\b",
        ),
    ]
}

/// The hard gate. The only fatal stage by design.
pub struct SafetyVerifier {
    checks: Vec<SafetyCheck>,
}

impl SafetyVerifier {
    /// A verifier with the built-in pattern table.
    pub fn new() -> Self {
        Self {
            checks: built_in_checks(),
        }
    }
}

impl Default for SafetyVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Verifier for SafetyVerifier {
    fn stage(&self) -> Stage {
        Stage::Safety
    }

    fn fatal(&self) -> bool {
        true
    }

    async fn verify(&self, ctx: &VerificationContext) -> StageResult {
        let mut text = String::new();
        if let Some(command) = &ctx.action.command {
            text.push_str(command);
            text.push('\n');
        }
        text.push_str(&ctx.action.payload.to_string());
        text.push('\n');
        text.push_str(&ctx.action.summary);

        for check in &self.checks {
            if check.pattern.is_match(&text) {
                return StageResult::fail(
                    Stage::Safety,
                    format!("{}: {}", check.id, check.name),
                );
            }
        }

        StageResult::pass(Stage::Safety, "no destructive or policy-violating patterns")
    }
}
