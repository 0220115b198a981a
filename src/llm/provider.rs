use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The tagged set of LLM backends this client supports. A tagged-variant
/// enum rather than a trait hierarchy: every provider speaks a
/// chat-completion-shaped HTTP API, and the differences (auth header, base
/// path, function-call support) are data, not behavior, per the redesign
/// guidance carried into this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    DeepSeek,
    Google,
    AzureOpenAi,
    Ollama,
}

impl LlmProvider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Google => "google",
            Self::AzureOpenAi => "azure_openai",
            Self::Ollama => "ollama",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "deepseek" => Ok(Self::DeepSeek),
            "google" => Ok(Self::Google),
            "azure_openai" => Ok(Self::AzureOpenAi),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for provider in [
            LlmProvider::OpenAi,
            LlmProvider::DeepSeek,
            LlmProvider::Google,
            LlmProvider::AzureOpenAi,
            LlmProvider::Ollama,
        ] {
            assert_eq!(provider.as_str().parse::<LlmProvider>().unwrap(), provider);
        }
    }

    #[test]
    fn unknown_provider_fails_to_parse() {
        assert!("grok".parse::<LlmProvider>().is_err());
    }
}
