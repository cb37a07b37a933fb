use crate::error::{GlassboxError, Result};
use crate::models::RepoSnapshot;
use super::StageDefinition;

macro_rules! repo_context {
    () => {
        "Repository: {repo_name}
Description: {description}

README:
{readme}

File Tree (partial):
{file_tree}

Languages: {languages}

Config/Package Files:
{config_files}"
    };
}

const SYSTEM_OVERVIEW: &str = concat!(
    "You are an expert software architect analyzing an open source repository.

Analyze the following repository content and produce a comprehensive system overview.

",
    repo_context!(),
    r#"

Respond with ONLY valid JSON matching this exact structure:
{
  "reasoning_steps": ["step 1 of your analysis...", "step 2...", "step 3..."],
  "purpose": "One paragraph describing what this project does and why it exists",
  "components": [
    {
      "name": "Component name",
      "description": "What this component does",
      "tech": ["technology1", "technology2"]
    }
  ],
  "architecture_type": "monolith|microservice|library|cli|framework|other",
  "data_flows": [
    "Description of data flow 1",
    "Description of data flow 2"
  ],
  "key_dependencies": [
    {
      "name": "dependency name",
      "purpose": "why it's used"
    }
  ]
}"#
);

const SETUP_RISK_RADAR: &str = concat!(
    "You are a DevOps risk analyst. Analyze this repository for setup and operational risks.

",
    repo_context!(),
    r#"

Respond with ONLY valid JSON matching this exact structure:
{
  "reasoning_steps": ["step 1...", "step 2...", "step 3..."],
  "overall_risk": "low|medium|high|critical",
  "risks": [
    {
      "category": "dependency|configuration|environment|compatibility|data|infrastructure",
      "title": "Short risk title",
      "description": "Detailed description of the risk",
      "severity": "low|medium|high|critical",
      "likelihood": "low|medium|high"
    }
  ],
  "env_requirements": [
    {
      "name": "Requirement name",
      "required": true,
      "notes": "Additional details"
    }
  ],
  "estimated_setup_time": "5 minutes|15 minutes|30 minutes|1 hour|2+ hours",
  "complexity_score": 7
}"#
);

const FAILURE_TIMELINE: &str = concat!(
    "You are a chaos engineering specialist. Simulate a failure timeline for deploying and running this repository in production.

",
    repo_context!(),
    r#"

Create a realistic timeline from Day 1 to Month 3 showing how things could go wrong. Each node should represent a specific time point with a realistic scenario.

Respond with ONLY valid JSON matching this exact structure:
{
  "reasoning_steps": ["step 1...", "step 2...", "step 3..."],
  "timeline": [
    {
      "time_label": "Day 1",
      "title": "Short event title",
      "description": "What happens at this point",
      "status": "ok|warning|critical",
      "probability": "Low 15%|Medium 40%|High 70%|Very High 90%",
      "mitigation": "How to prevent or handle this"
    }
  ],
  "overall_survival_rate": "85%",
  "critical_period": "Week 2-4: dependency conflicts most likely to surface"
}"#
);

const SECURITY_RISK: &str = concat!(
    "You are a security auditor performing a threat assessment of this open source repository.

",
    repo_context!(),
    r#"

Respond with ONLY valid JSON matching this exact structure:
{
  "reasoning_steps": ["step 1...", "step 2...", "step 3..."],
  "security_rating": "low|medium|high|critical",
  "findings": [
    {
      "title": "Finding title",
      "severity": "info|low|medium|high|critical",
      "description": "Detailed description",
      "recommendation": "What to do about it"
    }
  ],
  "positive_practices": [
    "Good security practice found in the repo"
  ],
  "missing_protections": [
    "Security measure that should be added"
  ],
  "data_exposure_risk": "low|medium|high",
  "supply_chain_risk": "low|medium|high"
}"#
);

const SAFE_RUN_PLAN: &str = concat!(
    "You are a senior engineer creating a safe step-by-step execution plan for running this repository locally.

",
    repo_context!(),
    r#"

Respond with ONLY valid JSON matching this exact structure:
{
  "reasoning_steps": ["step 1...", "step 2...", "step 3..."],
  "steps": [
    {
      "step_number": 1,
      "title": "Step title",
      "commands": ["command1", "command2"],
      "notes": "Important notes about this step",
      "risk_level": "safe|caution|danger"
    }
  ],
  "env_vars": [
    {
      "name": "ENV_VAR_NAME",
      "description": "What this variable is for",
      "required": true,
      "example": "example_value"
    }
  ],
  "sandbox_recommendation": "docker|vm|none",
  "smoke_test": {
    "command": "test command to verify it works",
    "expected_output": "what you should see"
  },
  "estimated_time": "10 minutes"
}"#
);

const RECOVERY_STRATEGY: &str = concat!(
    "You are a site reliability engineer creating a recovery playbook for this repository.

",
    repo_context!(),
    r#"

Respond with ONLY valid JSON matching this exact structure:
{
  "reasoning_steps": ["step 1...", "step 2...", "step 3..."],
  "rollback_plan": [
    {
      "step_number": 1,
      "action": "What to do",
      "command": "specific command if applicable",
      "notes": "Additional context"
    }
  ],
  "recovery_scenarios": [
    {
      "scenario": "Scenario name (e.g., Database corruption)",
      "severity": "low|medium|high|critical",
      "steps": ["Step 1", "Step 2"],
      "estimated_recovery_time": "15 minutes"
    }
  ],
  "nuclear_option": {
    "description": "Complete teardown and rebuild procedure",
    "steps": ["Step 1", "Step 2"],
    "data_loss_risk": "none|partial|complete"
  },
  "monitoring_recommendations": [
    "Recommendation 1",
    "Recommendation 2"
  ]
}"#
);

/// The analysis passes, in the order they run
pub static STAGES: [StageDefinition; 6] = [
    StageDefinition { name: "system_overview", title: "The Big Picture", template: SYSTEM_OVERVIEW },
    StageDefinition { name: "setup_risk_radar", title: "Getting Started", template: SETUP_RISK_RADAR },
    StageDefinition { name: "failure_timeline", title: "What Could Go Wrong", template: FAILURE_TIMELINE },
    StageDefinition { name: "security_risk", title: "Safety Check", template: SECURITY_RISK },
    StageDefinition { name: "safe_run_plan", title: "Let's Run It", template: SAFE_RUN_PLAN },
    StageDefinition { name: "recovery_strategy", title: "If Things Break", template: RECOVERY_STRATEGY },
];

/// Builds the prompt for the stage at `stage_index`
pub fn build_stage_prompt(stage_index: usize, snapshot: &RepoSnapshot) -> Result<String> {
    STAGES
        .get(stage_index)
        .map(|stage| stage.render(snapshot))
        .ok_or_else(|| {
            GlassboxError::Message(format!(
                "No analysis stage at index {} (have {})",
                stage_index,
                STAGES.len()
            ))
        })
}
