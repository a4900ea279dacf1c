//! The `Generator` trait: a text-in, text-out generative model endpoint.

use std::future::Future;

/// One call to the generative endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
  pub prompt:            String,
  pub temperature:       f32,
  pub max_output_tokens: u32,
  /// Ask the endpoint to emit `application/json` instead of free text.
  pub json:              bool,
}

impl GenerationRequest {
  /// A free-text request with conversational defaults.
  pub fn text(prompt: impl Into<String>) -> Self {
    Self {
      prompt:            prompt.into(),
      temperature:       0.7,
      max_output_tokens: 1024,
      json:              false,
    }
  }

  /// A forced-JSON request with lower temperature.
  pub fn json(prompt: impl Into<String>) -> Self {
    Self {
      prompt:            prompt.into(),
      temperature:       0.3,
      max_output_tokens: 1024,
      json:              true,
    }
  }

  pub fn with_temperature(mut self, temperature: f32) -> Self {
    self.temperature = temperature;
    self
  }

  pub fn with_max_tokens(mut self, max_output_tokens: u32) -> Self {
    self.max_output_tokens = max_output_tokens;
    self
  }
}

/// Abstraction over a generative-AI backend (e.g. Gemini).
///
/// Responses are free text even in JSON mode; callers parse them defensively
/// with [`crate::parse`].
pub trait Generator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn generate(
    &self,
    request: GenerationRequest,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}
