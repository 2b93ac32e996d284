//! Configuration schema for errand.toml (TOML-based).

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrandConfig {
    /// Display name used in the terminal prompt.
    pub name: String,

    /// OpenAI-compatible backend base URL.
    pub api_url: String,

    /// API key for the backend (LM Studio accepts any value).
    pub api_key: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// System prompt prepended to every session.
    pub system_prompt: String,

    /// Maximum tokens per completion.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f64,

    /// Maximum tool rounds per user turn before forcing a plain reply.
    pub max_tool_rounds: u32,

    /// Wall-clock deadline per tool invocation in seconds (0 = none).
    pub tool_timeout_secs: u64,

    /// Toolkit identifiers to load, in advertisement order.
    pub toolkits: Vec<String>,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for ErrandConfig {
    fn default() -> Self {
        Self {
            name: "errand".into(),
            api_url: "http://127.0.0.1:1234".into(),
            api_key: "lm-studio".into(),
            model: "qwen2.5-7b-instruct-1m".into(),
            system_prompt: "You are an assistant that can retrieve Wikipedia articles and \
                            execute shell commands. When asked about a topic, you can retrieve \
                            Wikipedia articles and cite information from them, or if necessary, \
                            execute shell commands after obtaining user confirmation."
                .into(),
            max_tokens: 4096,
            temperature: 0.7,
            max_tool_rounds: 8,
            tool_timeout_secs: 120,
            toolkits: vec!["wikipedia".into(), "shell".into(), "utility".into()],
            log_level: "info".into(),
        }
    }
}

impl ErrandConfig {
    /// Per-tool deadline, if one is configured.
    pub fn tool_timeout(&self) -> Option<std::time::Duration> {
        if self.tool_timeout_secs == 0 {
            None
        } else {
            Some(std::time::Duration::from_secs(self.tool_timeout_secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_advertise_the_builtin_toolkits() {
        let cfg = ErrandConfig::default();
        assert_eq!(cfg.toolkits, ["wikipedia", "shell", "utility"]);
        assert_eq!(cfg.tool_timeout(), Some(std::time::Duration::from_secs(120)));
    }

    #[test]
    fn zero_timeout_means_none() {
        let cfg = ErrandConfig {
            tool_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(cfg.tool_timeout(), None);
    }
}
