use crate::models::DiscoveryRequest;
use super::render_template;

/// Prompt for the single-round recommendation request
pub const DISCOVERY_TEMPLATE: &str = r#"You are an expert open source advisor. A user is looking for open source projects that match their needs.

Analyze their request and recommend real, existing GitHub repositories. Only recommend repositories you are confident actually exist on GitHub.

User's Query:
{query}

Filters:
- Preferred Languages: {languages}
- Domain/Category: {domain}
- Scale/Size: {scale}
- License Preference: {license_preference}
- Actively Maintained Only: {actively_maintained}

Number of recommendations requested: {max_results}

Respond with ONLY valid JSON matching this exact structure:
{
  "reasoning_steps": ["step 1 of your analysis...", "step 2...", "step 3..."],
  "query_interpretation": "One sentence summarizing what the user is looking for",
  "summary": "A brief paragraph about the recommendations and how they fit the user's needs",
  "recommendations": [
    {
      "rank": 1,
      "repo_name": "owner/repo",
      "github_url": "https://github.com/owner/repo",
      "stars": 15000,
      "language": "Primary language",
      "license": "MIT",
      "description": "What this project does",
      "reasoning": "Why this is a good match for the user's query",
      "strengths": ["Strength 1", "Strength 2", "Strength 3"],
      "considerations": ["Thing to be aware of 1", "Thing to be aware of 2"],
      "match_score": 92,
      "tags": ["tag1", "tag2", "tag3"]
    }
  ]
}

Important:
- Only recommend real repositories that exist on GitHub
- match_score should be 0-100 reflecting how well the repo matches the query
- Order recommendations by match_score descending
- Be honest about considerations/trade-offs
- Star counts should be approximate but realistic
"#;

const ANY: &str = "Any";

fn or_any(value: &str) -> &str {
    if value.trim().is_empty() {
        ANY
    } else {
        value
    }
}

fn maintenance_label(actively_maintained: Option<bool>) -> &'static str {
    match actively_maintained {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "No preference",
    }
}

/// Builds the recommendation prompt, rendering unset filters as human readable defaults
pub fn build_discovery_prompt(request: &DiscoveryRequest) -> String {
    let filters = &request.filters;
    let languages = if filters.languages.is_empty() {
        ANY.to_string()
    } else {
        filters.languages.join(", ")
    };
    let max_results = request.max_results.to_string();

    render_template(
        DISCOVERY_TEMPLATE,
        &[
            ("query", request.query.as_str()),
            ("languages", languages.as_str()),
            ("domain", or_any(&filters.domain)),
            ("scale", or_any(&filters.scale)),
            ("license_preference", or_any(&filters.license_preference)),
            ("actively_maintained", maintenance_label(filters.actively_maintained)),
            ("max_results", max_results.as_str()),
        ],
    )
}
