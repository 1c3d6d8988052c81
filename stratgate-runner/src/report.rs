//! Markdown validation report — the durable artifact for one evaluation
//! cycle.
//!
//! Rendering is presentation only; every number comes from the typed result
//! structs upstream.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use stratgate_core::AggregateMetrics;

use crate::lifecycle::{StrategyStatus, TransitionDecision};
use crate::risk::ModelRiskReport;

/// Everything that goes into one report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub strategy_name: String,
    pub config_hash: String,
    pub aggregate: AggregateMetrics,
    pub risk: ModelRiskReport,
    pub decision: TransitionDecision,
    pub status: StrategyStatus,
}

impl ValidationReport {
    /// Render the report as markdown.
    pub fn render_markdown(&self) -> String {
        let m = &self.aggregate;
        let mut report = format!(
            "# Validation Report: {}\n\n\
Config hash: `{}`\n\n\
## Walk-Forward Summary\n\
- Windows: {}\n\
- Mean OOS Sharpe: {:.2}\n\
- Median OOS Sharpe: {:.2}\n\
- OOS Sharpe Std: {:.2}\n\
- Mean OOS Return: {:+.2}%\n\
- Stability Score: {:.2}\n\
- Win Rate: {:.1}% ({} up / {} down)\n\
- Overfit Index: {}\n",
            self.strategy_name,
            self.config_hash,
            m.window_count,
            m.mean_oos_sharpe,
            m.median_oos_sharpe,
            m.std_oos_sharpe,
            m.mean_oos_return * 100.0,
            m.stability_score,
            m.win_rate * 100.0,
            m.positive_windows,
            m.negative_windows,
            format_ratio(m.overfit_index),
        );

        report.push_str(&format!(
            "\n## Model Risk — rating {}\n\n\
| Detector | Triggered | Score | Detail |\n\
|----------|-----------|-------|--------|\n",
            self.risk.rating
        ));
        for finding in self.risk.findings.values() {
            report.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                finding.detector,
                if finding.triggered { "YES" } else { "no" },
                format_ratio(finding.score),
                finding.detail
            ));
        }

        report.push_str(&format!(
            "\n## Lifecycle\n\
- State: {} (cycle {} in state)\n\
- Decision: {} → {}\n\
- Reason: {}\n",
            self.status.state,
            self.status.days_in_state,
            self.decision.from,
            self.decision.to,
            self.decision.reason
        ));

        report
    }

    /// Write the markdown report to `<dir>/<strategy>_validation.md`.
    pub fn save(&self, dir: &Path) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}_validation.md", self.strategy_name));
        std::fs::write(&path, self.render_markdown())?;
        Ok(path)
    }
}

fn format_ratio(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else if value > 0.0 {
        "inf".to_string()
    } else {
        "-inf".to_string()
    }
}
