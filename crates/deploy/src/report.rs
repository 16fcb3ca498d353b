//! Operator-facing summary of a run.

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};

use crate::orchestrator::RunReport;

/// Render a report as a table, one row per step in completion order.
///
/// A failed step is listed last with its error in place of an identifier.
pub fn summary_table(report: &RunReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Step", "Kind", "Result"]);

    for outcome in &report.completed {
        table.add_row(vec![
            outcome.index.to_string(),
            outcome.name.clone(),
            outcome.kind.to_string(),
            outcome.output.identifier(),
        ]);
    }

    if let Some(failure) = &report.failure {
        table.add_row(vec![
            failure.index.to_string(),
            failure.name.clone(),
            failure.kind.to_string(),
            format!("FAILED: {}", failure.error),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artifact::CodeArtifact,
        gateway::{CodeId, Receipt},
        orchestrator::{StepFailure, StepOutcome, StepOutput},
        recipe::StepKind,
    };

    #[test]
    fn test_summary_lists_completed_and_failed_steps() {
        let report = RunReport {
            recipe: "presale-vesting".to_string(),
            completed: vec![
                StepOutcome {
                    index: 0,
                    name: "upload_vesting".to_string(),
                    kind: StepKind::Upload,
                    output: StepOutput::Code(CodeArtifact {
                        code_id: CodeId::new(281),
                        source_path: "artifacts/vesting.wasm".into(),
                        checksum: "ab".repeat(32),
                    }),
                },
                StepOutcome {
                    index: 1,
                    name: "set_worker".to_string(),
                    kind: StepKind::Execute,
                    output: StepOutput::Receipt(Receipt {
                        tx_hash: "0A1B".to_string(),
                        gas_used: 120_000,
                    }),
                },
            ],
            failure: Some(StepFailure {
                index: 2,
                name: "set_start_time".to_string(),
                kind: StepKind::Execute,
                error: "rejected: unauthorized".to_string(),
                rejected: true,
            }),
        };

        let mut table = summary_table(&report);
        table.set_width(200);
        let rendered = table.to_string();
        assert!(rendered.contains("upload_vesting"));
        assert!(rendered.contains("281"));
        assert!(rendered.contains("0A1B"));
        assert!(rendered.contains("FAILED: rejected: unauthorized"));
    }
}
