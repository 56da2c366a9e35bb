//! Standalone snippet analysis: prompt and reply parsing.

use explainer_core::models::{CodeComponent, CodeExplanation};
use serde::Deserialize;

use crate::question::strip_fences;

pub fn build_explain_prompt(code: &str) -> String {
    format!(
        r#"You are an expert code analyzer. Analyze the following code and provide:
1. A brief overview of what the code does
2. Key components (functions, classes, modules) with their type and purpose
3. Potential issues or bugs
4. Suggested improvements

Code:
```
{}
```

Format your response as JSON with the following structure:
{{
    "overview": "brief overview",
    "key_components": [
        {{"name": "component_name", "type": "function/class/module", "purpose": "what it does"}}
    ],
    "potential_issues": ["issue 1", "issue 2"],
    "suggested_improvements": ["improvement 1", "improvement 2"]
}}"#,
        code
    )
}

#[derive(Debug, Deserialize)]
struct ModelAnalysis {
    overview: Option<String>,
    #[serde(default)]
    key_components: Vec<CodeComponent>,
    #[serde(default)]
    potential_issues: Vec<String>,
    #[serde(default)]
    suggested_improvements: Vec<String>,
}

/// Structured explanation from the model's reply. A reply that is not the
/// requested JSON becomes the overview as-is.
pub fn parse_explanation(raw: &str) -> CodeExplanation {
    let body = strip_fences(raw);
    match serde_json::from_str::<ModelAnalysis>(body) {
        Ok(analysis) => CodeExplanation {
            overview: analysis
                .overview
                .unwrap_or_else(|| "No overview generated".to_string()),
            key_components: analysis
                .key_components
                .into_iter()
                .filter(|c| !c.name.trim().is_empty())
                .collect(),
            potential_issues: analysis.potential_issues,
            suggested_improvements: analysis.suggested_improvements,
        },
        Err(_) => {
            tracing::warn!(
                preview = %body.chars().take(100).collect::<String>(),
                "Non-JSON explanation from model"
            );
            CodeExplanation {
                overview: raw.trim().to_string(),
                key_components: Vec::new(),
                potential_issues: Vec::new(),
                suggested_improvements: Vec::new(),
            }
        }
    }
}
