use std::path::PathBuf;

use serde::Serialize;

use crate::analyzer::ScreenshotAnalyzer;

/// Analysis of one screenshot in a guided run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GuidedStep {
    pub step: usize,
    pub screenshot: String,
    pub analysis: String,
}

pub fn step_prompt(screenshot: &str, goal: &str) -> String {
    format!("Analyze screenshot {screenshot} and determine the next action to achieve: {goal}")
}

/// Walks a sequence of screenshots toward a goal, one analysis per screenshot.
pub struct GuidedAnalysis {
    analyzer: ScreenshotAnalyzer,
    goal: String,
}

impl GuidedAnalysis {
    pub fn new(analyzer: ScreenshotAnalyzer, goal: impl Into<String>) -> Self {
        Self {
            analyzer,
            goal: goal.into(),
        }
    }

    pub async fn run(&self, screenshots: &[PathBuf]) -> Vec<GuidedStep> {
        let mut steps = Vec::with_capacity(screenshots.len());
        for (i, path) in screenshots.iter().enumerate() {
            let screenshot = path.display().to_string();
            tracing::info!(step = i + 1, %screenshot, "guided analysis");
            let analysis = self
                .analyzer
                .analyze(path, &step_prompt(&screenshot, &self.goal))
                .await;
            steps.push(GuidedStep {
                step: i + 1,
                screenshot,
                analysis,
            });
        }
        steps
    }
}
