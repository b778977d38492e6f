//! Size-bounded batching of source files into model prompts.

use crate::model::SourceFile;

/// Estimated tokens a single batch may spend on file content
pub const MAX_TOKENS_PER_BATCH: usize = 30_000;
/// Rough characters-per-token ratio used to turn the token budget into bytes
pub const CHARS_PER_TOKEN_ESTIMATE: usize = 4;

/// Content budget for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchBudget {
    pub max_tokens_per_batch: usize,
    pub chars_per_token: usize,
}

impl Default for BatchBudget {
    fn default() -> Self {
        Self {
            max_tokens_per_batch: MAX_TOKENS_PER_BATCH,
            chars_per_token: CHARS_PER_TOKEN_ESTIMATE,
        }
    }
}

impl BatchBudget {
    pub fn max_chars(&self) -> usize {
        self.max_tokens_per_batch
            .saturating_mul(self.chars_per_token)
    }
}

/// Partition `files` into contiguous, non-empty batches.
///
/// Files are added greedily while the running content size stays within
/// `max_chars`. A file never straddles two batches; one that exceeds the
/// budget on its own gets a batch to itself. Concatenating the returned
/// slices yields `files` unchanged.
pub fn create_batches(files: &[SourceFile], max_chars: usize) -> Vec<&[SourceFile]> {
    let mut batches = Vec::new();
    let mut start = 0usize;
    let mut current_size = 0usize;

    for (idx, file) in files.iter().enumerate() {
        let size = file.size();
        if idx > start && current_size.saturating_add(size) > max_chars {
            batches.push(&files[start..idx]);
            start = idx;
            current_size = 0;
        }
        current_size = current_size.saturating_add(size);
    }

    if start < files.len() {
        batches.push(&files[start..]);
    }

    batches
}
