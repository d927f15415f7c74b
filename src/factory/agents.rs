//! Agent roles and the crew that runs their tasks against a chat model.
//!
//! An `Agent` is a role/goal/backstory triple rendered into a system prompt;
//! a `Task` is a description plus the expected output shape. `Crew::kickoff`
//! runs one task for one agent, bounded by a shared semaphore so that at most
//! `max_concurrent` model calls are in flight across every session.

use std::sync::Arc;

use tokio::sync::Semaphore;

use super::llm::ChatModel;
use crate::errors::LlmError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl Agent {
    pub fn new(role: &str, goal: &str, backstory: &str) -> Self {
        Self {
            role: role.to_string(),
            goal: goal.to_string(),
            backstory: backstory.to_string(),
        }
    }

    pub fn planner() -> Self {
        Self::new(
            "Planner",
            "Break down project spec into tasks",
            "You are a senior engineer who turns loose product ideas into small, ordered implementation tasks.",
        )
    }

    pub fn coder() -> Self {
        Self::new(
            "Coder",
            "Generate high-quality Python code",
            "You write complete, runnable, production-quality Python programs.",
        )
    }

    pub fn reviewer() -> Self {
        Self::new(
            "Reviewer",
            "Review and improve code",
            "You review code for bugs, missing error handling and clarity, and return the improved program.",
        )
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are the {role}.\n\n{backstory}\n\nYour goal: {goal}.",
            role = self.role,
            backstory = self.backstory,
            goal = self.goal,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
}

impl Task {
    pub fn new(description: impl Into<String>, expected_output: &str) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.to_string(),
        }
    }

    pub fn plan(spec: &str) -> Self {
        Self::new(
            format!("Break down: {}", spec),
            "A JSON array of short task descriptions",
        )
    }

    pub fn code(spec: &str) -> Self {
        Self::new(
            format!("Generate production-quality Python code: {}", spec),
            "python_code: a single complete Python file, no commentary",
        )
    }

    pub fn review(code: &str) -> Self {
        Self::new(
            format!("Review and improve the code:\n{}", code),
            "refined_code: the full improved Python file, no commentary",
        )
    }

    pub fn refine(suggestion: &str, current_code: &str) -> Self {
        Self::new(
            format!(
                "Refine code based on: {}\n\nCurrent code:\n{}",
                suggestion, current_code
            ),
            "refined_code: the full updated Python file, no commentary",
        )
    }

    pub fn prompt(&self) -> String {
        format!(
            "{}\n\nExpected output: {}",
            self.description, self.expected_output
        )
    }
}

/// Raw output of a single task run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
    pub raw: String,
}

impl TaskOutput {
    /// The output with a surrounding markdown code fence removed, if any.
    pub fn code(&self) -> String {
        strip_code_fence(&self.raw)
    }
}

/// Remove a leading ```lang fence and its closing ``` when the whole text is fenced.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return text.to_string();
    };
    let Some(newline) = rest.find('\n') else {
        return text.to_string();
    };
    let body = &rest[newline + 1..];
    match body.rfind("```") {
        Some(end) if body[end + 3..].trim().is_empty() => body[..end].trim_end().to_string(),
        _ => text.to_string(),
    }
}

pub struct Crew {
    model: Arc<dyn ChatModel>,
    permits: Arc<Semaphore>,
}

impl Crew {
    pub fn new(model: Arc<dyn ChatModel>, max_concurrent: usize) -> Self {
        Self {
            model,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn kickoff(&self, agent: &Agent, task: &Task) -> Result<TaskOutput, LlmError> {
        // The semaphore is never closed, so acquire only fails if that invariant breaks.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| LlmError::Parse(format!("crew semaphore closed: {}", e)))?;
        tracing::info!(role = %agent.role, "Running agent task");
        let raw = self
            .model
            .complete(&agent.system_prompt(), &task.prompt())
            .await?;
        tracing::debug!(role = %agent.role, output_len = raw.len(), "Agent task finished");
        Ok(TaskOutput { raw })
    }
}
