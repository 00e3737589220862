use crate::{CandidateMacro, SolveStatus, SolverConfig, SolverError};
use craftplan_core::{ActionCatalog, CraftState, NoRandom, Recipe, Simulator};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One macro step as replayed through the deterministic simulator, paired
/// with the reliability of the macro prefix ending at this step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub step: u32,
    pub action: String,
    pub progress: u32,
    pub quality: u32,
    pub durability: i32,
    pub cp: i32,
    #[serde(default)]
    pub reliability: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    pub steps: u32,
    pub total_simulations: u64,
    pub wall_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveReport {
    pub status: SolveStatus,
    pub completion: String,
    pub steps: Vec<StepReport>,
    pub summary: SummaryStats,
}

impl SolveReport {
    pub fn from_candidate(
        catalog: &ActionCatalog,
        recipe: &Recipe,
        start: &CraftState,
        config: &SolverConfig,
        candidate: &CandidateMacro,
    ) -> Self {
        let mut sim = Simulator::new(catalog, *recipe, config.max_step_count, NoRandom);
        let mut state = start.clone();
        let mut steps = Vec::with_capacity(candidate.actions.len());
        for (idx, action) in candidate.actions.iter().enumerate() {
            let (next, _) = sim.apply(&state, *action);
            steps.push(StepReport {
                step: next.step,
                action: action.name().to_string(),
                progress: next.progress,
                quality: next.quality,
                durability: next.durability,
                cp: next.cp,
                reliability: candidate.reliability.get(idx).copied(),
            });
            state = next;
        }
        Self {
            status: candidate.status,
            completion: format!("{:?}", candidate.completion),
            steps,
            summary: SummaryStats {
                steps: candidate.actions.len() as u32,
                total_simulations: candidate.simulations,
                wall_time_ms: candidate.wall_time_ms,
            },
        }
    }

    pub fn to_text_report(&self) -> String {
        let mut lines = vec![
            format!("status: {}", status_label(&self.status)),
            format!("completion: {}", self.completion),
            format!(
                "summary: steps={} simulations={} wall_ms={}",
                self.summary.steps, self.summary.total_simulations, self.summary.wall_time_ms
            ),
            String::new(),
            "steps:".to_string(),
        ];
        if self.steps.is_empty() {
            lines.push("  (none)".to_string());
        }
        for step in &self.steps {
            lines.push(format!("  step {:>3} | {}", step.step, step.action));
            lines.push(format!(
                "    progress={} quality={} durability={} cp={}",
                step.progress, step.quality, step.durability, step.cp
            ));
            if let Some(reliability) = step.reliability {
                lines.push(format!("    reliability={:.3}", reliability));
            }
        }
        lines.join("\n")
    }
}

fn status_label(status: &SolveStatus) -> &'static str {
    match status {
        SolveStatus::TargetReached => "TargetReached",
        SolveStatus::Failed => "Failed",
        SolveStatus::NoMoreActions => "NoMoreActions",
        SolveStatus::BudgetExhausted => "BudgetExhausted",
        SolveStatus::MaxSteps => "MaxSteps",
        SolveStatus::Cancelled => "Cancelled",
    }
}

pub fn write_json(path: &Path, report: &SolveReport) -> Result<(), SolverError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(report)?;
    fs::write(path, body)?;
    Ok(())
}

pub fn write_text(path: &Path, report: &SolveReport) -> Result<(), SolverError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, report.to_text_report())?;
    Ok(())
}
