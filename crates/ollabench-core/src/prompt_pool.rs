use std::collections::HashSet;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::prompts::DEFAULT_PROMPTS;
use crate::{BenchError, Result};

/// Deduplicated, immutable set of benchmark prompts.
#[derive(Debug, Clone)]
pub struct PromptPool {
    prompts: Vec<String>,
}

impl PromptPool {
    /// Build a pool, dropping blank entries and repeated text (first occurrence wins).
    pub fn new<I, S>(prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let prompts = prompts
            .into_iter()
            .map(Into::into)
            .map(|p: String| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .filter(|p| seen.insert(p.clone()))
            .collect();

        Self { prompts }
    }

    pub fn builtin() -> Self {
        Self::new(DEFAULT_PROMPTS.iter().copied())
    }

    /// One prompt per line; blank lines and `#` comments are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let pool = Self::new(
            content
                .lines()
                .filter(|line| !line.trim_start().starts_with('#')),
        );

        if pool.is_empty() {
            return Err(BenchError::Config(format!(
                "prompt file {} contains no prompts",
                path.display()
            )));
        }

        tracing::info!("Loaded {} prompts from {}", pool.len(), path.display());
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn contains(&self, prompt: &str) -> bool {
        self.prompts.iter().any(|p| p == prompt)
    }

    /// Draw `n` distinct prompts using the thread's lazily seeded generator.
    pub fn sample(&self, n: usize) -> Result<Vec<String>> {
        self.sample_with(&mut rand::thread_rng(), n)
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<Vec<String>> {
        if n > self.prompts.len() {
            return Err(BenchError::InsufficientPool {
                requested: n,
                available: self.prompts.len(),
            });
        }

        Ok(self.prompts.choose_multiple(rng, n).cloned().collect())
    }
}

impl Default for PromptPool {
    fn default() -> Self {
        Self::builtin()
    }
}
