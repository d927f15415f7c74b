use serde::Deserialize;

/// Planner output normalized into an ordered list of task descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanResponse {
    pub tasks: Vec<String>,
}

/// Accepted JSON shapes: `["a", "b"]`, `[{"name": .., "description": ..}]`
/// or `{"tasks": [...]}` with either item form.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPlan {
    List(Vec<RawTask>),
    Object { tasks: Vec<RawTask> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTask {
    Text(String),
    Structured {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl RawTask {
    fn into_text(self) -> Option<String> {
        let text = match self {
            RawTask::Text(s) => s,
            RawTask::Structured { name, description } => match (name, description) {
                (Some(n), Some(d)) => format!("{}: {}", n, d),
                (Some(n), None) => n,
                (None, Some(d)) => d,
                (None, None) => return None,
            },
        };
        let text = text.trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

impl PlanResponse {
    /// Parse planner output, tolerating markdown wrapping and leading prose.
    /// Non-JSON output falls back to one task per list-like line.
    pub fn parse(raw: &str) -> Self {
        if let Some(plan) = Self::parse_json(raw) {
            return plan;
        }
        Self::from_lines(raw)
    }

    fn parse_json(raw: &str) -> Option<Self> {
        for (open, close) in [('[', ']'), ('{', '}')] {
            let (Some(start), Some(end)) = (raw.find(open), raw.rfind(close)) else {
                continue;
            };
            if end <= start {
                continue;
            }
            if let Ok(parsed) = serde_json::from_str::<RawPlan>(&raw[start..=end]) {
                let items = match parsed {
                    RawPlan::List(items) | RawPlan::Object { tasks: items } => items,
                };
                let tasks: Vec<String> = items.into_iter().filter_map(RawTask::into_text).collect();
                return Some(Self { tasks });
            }
        }
        None
    }

    fn from_lines(raw: &str) -> Self {
        let tasks = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("```"))
            .map(|l| {
                l.trim_start_matches(|c: char| {
                    c.is_ascii_digit() || matches!(c, '-' | '*' | '.' | ')' | ' ')
                })
                .trim()
                .to_string()
            })
            .filter(|l| !l.is_empty())
            .collect();
        Self { tasks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_array() {
        let plan = PlanResponse::parse(r#"["Parse args", "Fetch forecast", "Send email"]"#);
        assert_eq!(plan.tasks, vec!["Parse args", "Fetch forecast", "Send email"]);
    }

    #[test]
    fn test_parse_object_with_structured_tasks() {
        let json = r#"{
            "tasks": [
                {"name": "CLI", "description": "argparse entry point"},
                {"description": "HTTP client for the weather API"},
                {"name": "Alerts"}
            ]
        }"#;
        let plan = PlanResponse::parse(json);
        assert_eq!(
            plan.tasks,
            vec![
                "CLI: argparse entry point",
                "HTTP client for the weather API",
                "Alerts"
            ]
        );
    }

    #[test]
    fn test_parse_with_markdown_wrapping() {
        let wrapped = "Here's the plan:\n```json\n[\"a\", \"b\"]\n```\nGood luck";
        let plan = PlanResponse::parse(wrapped);
        assert_eq!(plan.tasks, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_drops_empty_items() {
        let plan = PlanResponse::parse(r#"["a", "  ", {}]"#);
        assert_eq!(plan.tasks, vec!["a"]);
    }

    #[test]
    fn test_fallback_numbered_lines() {
        let text = "1. Set up the project\n2) Write the fetcher\n- Add tests\n\n* Package it";
        let plan = PlanResponse::parse(text);
        assert_eq!(
            plan.tasks,
            vec![
                "Set up the project",
                "Write the fetcher",
                "Add tests",
                "Package it"
            ]
        );
    }

    #[test]
    fn test_fallback_on_invalid_json() {
        let plan = PlanResponse::parse("{not json at all}");
        assert_eq!(plan.tasks, vec!["{not json at all}"]);
    }

    #[test]
    fn test_empty_output() {
        assert!(PlanResponse::parse("").tasks.is_empty());
    }
}
