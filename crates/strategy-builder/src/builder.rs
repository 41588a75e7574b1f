use std::collections::HashSet;

use testpilot_core_types::Intent;
use tracing::debug;

use crate::templates::{base_url, template_for};
use crate::types::{estimate_duration_ms, Step, Strategy};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Drop optional and screenshot steps.
    pub fast_mode: bool,
}

impl BuilderConfig {
    pub fn fast() -> Self {
        Self { fast_mode: true }
    }
}

/// Compiles an [`Intent`] into a [`Strategy`]. Pure: the same intent
/// and configuration always produce the same strategy.
#[derive(Debug, Clone, Default)]
pub struct StrategyBuilder {
    config: BuilderConfig,
}

impl StrategyBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> BuilderConfig {
        self.config
    }

    /// Never fails; an unknown platform yields the generic
    /// navigate-and-capture strategy.
    pub fn build(&self, intent: &Intent) -> Strategy {
        let template = template_for(intent);
        let template_len = template.len();
        let mut steps = template.into_steps();
        if self.config.fast_mode {
            steps = trim_for_fast_mode(steps);
        }

        debug!(
            platform = %intent.platform,
            test_type = %intent.test_type,
            template_steps = template_len,
            steps = steps.len(),
            fast_mode = self.config.fast_mode,
            "strategy built"
        );

        Strategy {
            platform: intent.platform,
            test_type: intent.test_type,
            priority: intent.priority,
            base_url: base_url(intent),
            estimated_duration_ms: estimate_duration_ms(&steps),
            steps,
            fast_mode: self.config.fast_mode,
        }
    }
}

/// Remove optional and screenshot steps, keeping the relative order of
/// the rest. Dependencies on removed steps are dropped.
pub fn trim_for_fast_mode(steps: Vec<Step>) -> Vec<Step> {
    let kept: Vec<Step> = steps
        .into_iter()
        .filter(|step| !step.optional && !step.is_screenshot())
        .collect();
    let ids: HashSet<String> = kept.iter().map(|s| s.id.clone()).collect();
    kept.into_iter()
        .map(|mut step| {
            if step
                .depends_on
                .as_ref()
                .is_some_and(|dep| !ids.contains(dep))
            {
                step.depends_on = None;
            }
            step
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StepKind, StepParams};

    fn step(id: &str, kind: StepKind, optional: bool, depends_on: Option<&str>) -> Step {
        Step {
            id: id.to_string(),
            kind,
            description: id.to_string(),
            target: None,
            params: StepParams::default(),
            depends_on: depends_on.map(str::to_string),
            optional,
        }
    }

    #[test]
    fn fast_mode_keeps_order_and_clears_dangling_dependencies() {
        let steps = vec![
            step("step-01", StepKind::Navigate, false, None),
            step("step-02", StepKind::CaptureScreenshot, false, None),
            step("step-03", StepKind::LocateElement, true, None),
            step("step-04", StepKind::Interact, false, Some("step-03")),
            step("step-05", StepKind::LocateElement, false, None),
            step("step-06", StepKind::Interact, false, Some("step-05")),
        ];
        let trimmed = trim_for_fast_mode(steps);
        let ids: Vec<_> = trimmed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["step-01", "step-04", "step-05", "step-06"]);
        assert_eq!(trimmed[1].depends_on, None);
        assert_eq!(trimmed[3].depends_on.as_deref(), Some("step-05"));
    }
}
