//! Size recalculation.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use cabinet_core::result::AppResult;
use cabinet_service::relocation::NodeStatus;

use super::Session;
use crate::output::{self, OutputFormat};

/// Arguments for the recalculate command
#[derive(Debug, Args)]
pub struct RecalculateArgs {
    /// Report without writing the results back
    #[arg(long)]
    pub dry_run: bool,
}

/// Unreadable blob row
#[derive(Debug, Serialize, Tabled)]
struct FailureRow {
    /// Node
    node: String,
    /// Reason
    reason: String,
}

/// Execute the recalculate command
pub async fn execute(
    args: &RecalculateArgs,
    session: &Session,
    format: OutputFormat,
) -> AppResult<()> {
    let report = session.cabinet().propagator().recalculate_all().await?;
    if !args.dry_run {
        session.persist().await?;
    }

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_kv("Files checked", &report.files_checked.to_string());
            output::print_kv("Sizes changed", &report.sizes_changed.to_string());
            if !report.failures.is_empty() {
                output::print_warning(&format!(
                    "{} blobs could not be read; their cached sizes were kept",
                    report.failures.len()
                ));
                let rows: Vec<FailureRow> = report
                    .failures
                    .iter()
                    .map(|o| FailureRow {
                        node: o.node.to_string(),
                        reason: match &o.status {
                            NodeStatus::Failed(f) => f.message.clone(),
                            _ => String::new(),
                        },
                    })
                    .collect();
                output::print_list(&rows, format);
            }
        }
    }
    Ok(())
}
