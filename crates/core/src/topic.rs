use serde::{Deserialize, Serialize};

/// Who authored a message in a topic's conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
}

/// A single entry in a topic's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// An interview theme and the scripted question that opens it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub opening_prompt: String,
}

impl Topic {
    pub fn new(name: impl Into<String>, opening_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            opening_prompt: opening_prompt.into(),
        }
    }
}

/// The phrase the model is instructed to say once it is done with a topic.
pub const DEFAULT_TERMINAL_PHRASE: &str = "let's move on";

/// The five behavioural topics every candidate is screened on, in order.
pub fn default_topics() -> Vec<Topic> {
    vec![
        Topic::new(
            "Problem Solving",
            "Tell me about a time you were faced with a complex or unfamiliar problem. How did you approach solving it, and what was the result?",
        ),
        Topic::new(
            "Leadership",
            "Describe a situation where you took initiative or led a group, even if it wasn’t in a formal leadership role. What was the outcome?",
        ),
        Topic::new(
            "Strategic Thinking",
            "Tell me about a time you had to make a decision that required thinking beyond the immediate task. How did you consider the bigger picture?",
        ),
        Topic::new(
            "Work Ethic",
            "Give an example of a time you had to push through a difficult challenge or long hours to get something done. What motivated you?",
        ),
        Topic::new(
            "Communication",
            "Tell me about a time when you had to explain something complex to someone with less knowledge of the topic. How did you do it?",
        ),
    ]
}

/// The fixed sequence of topics plus the phrase that closes each one.
#[derive(Debug, Clone)]
pub struct InterviewScript {
    topics: Vec<Topic>,
    terminal_phrase: String,
}

impl InterviewScript {
    /// Creates a script. The terminal phrase is stored lowercased so matching
    /// stays case-insensitive regardless of how it was configured.
    pub fn new(topics: Vec<Topic>, terminal_phrase: &str) -> Self {
        Self {
            topics,
            terminal_phrase: terminal_phrase.to_lowercase(),
        }
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn topic(&self, index: usize) -> Option<&Topic> {
        self.topics.get(index)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Returns true if the model reply signals the end of the current topic.
    ///
    /// This is a plain case-insensitive substring test: a reply that merely
    /// mentions the phrase mid-sentence also counts as a topic change.
    pub fn is_terminal(&self, reply: &str) -> bool {
        reply.to_lowercase().contains(&self.terminal_phrase)
    }
}

impl Default for InterviewScript {
    fn default() -> Self {
        Self::new(default_topics(), DEFAULT_TERMINAL_PHRASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_script_has_five_topics_in_order() {
        let script = InterviewScript::default();
        let names: Vec<&str> = script.topics().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Problem Solving",
                "Leadership",
                "Strategic Thinking",
                "Work Ethic",
                "Communication"
            ]
        );
        assert!(script.topics().iter().all(|t| !t.opening_prompt.is_empty()));
    }

    #[test]
    fn test_terminal_phrase_matches_any_case_and_position() {
        let script = InterviewScript::default();
        assert!(script.is_terminal("Thank you, let's move on."));
        assert!(script.is_terminal("THANK YOU, LET'S MOVE ON"));
        assert!(script.is_terminal("Before we say let's Move On, one more thing?"));
        assert!(!script.is_terminal("Can you tell me more about the outcome?"));
        assert!(!script.is_terminal("let us move on"));
    }

    #[test]
    fn test_configured_phrase_is_case_insensitive() {
        let script = InterviewScript::new(default_topics(), "NEXT TOPIC");
        assert!(script.is_terminal("Great, next topic please."));
        assert!(script.is_terminal("GREAT, NEXT TOPIC PLEASE."));
        assert!(!script.is_terminal("Thank you, let's move on."));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
        let assistant = serde_json::to_value(Role::Assistant).unwrap();
        assert_eq!(assistant, "assistant");
    }
}
