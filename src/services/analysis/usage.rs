//! Usage Accounting
//!
//! Running token and cost totals for one analysis. Owned by the coordinator
//! and never shared, so there is no locking.
//!
//! While a chunk streams, each count is the larger of the character-based
//! estimate and the latest reported (cumulative) snapshot, since providers
//! report early placeholders such as `output_tokens: 1`. Once the chunk is
//! finished the reported counts replace the estimate.

use anr_analyzer_llm::ModelPricing;

/// Characters per token used for estimates.
pub const CHARS_PER_TOKEN: usize = 4;

/// Token estimate for `chars` characters of text.
pub fn estimate_tokens(chars: usize) -> u64 {
    chars.div_ceil(CHARS_PER_TOKEN) as u64
}

#[derive(Debug, Clone, Copy, Default)]
struct ChunkUsage {
    prompt_chars: usize,
    output_chars: usize,
    reported_input: u64,
    reported_output: u64,
}

impl ChunkUsage {
    fn live_input(&self) -> u64 {
        self.reported_input.max(estimate_tokens(self.prompt_chars))
    }

    fn live_output(&self) -> u64 {
        self.reported_output.max(estimate_tokens(self.output_chars))
    }

    fn final_input(&self) -> u64 {
        if self.reported_input > 0 {
            self.reported_input
        } else {
            estimate_tokens(self.prompt_chars)
        }
    }

    fn final_output(&self) -> u64 {
        if self.reported_output > 0 {
            self.reported_output
        } else {
            estimate_tokens(self.output_chars)
        }
    }
}

/// Input/output token counts and cost across every chunk so far.
#[derive(Debug, Clone)]
pub struct UsageAccumulator {
    pricing: ModelPricing,
    committed_input: u64,
    committed_output: u64,
    current: ChunkUsage,
}

impl UsageAccumulator {
    pub fn new(pricing: ModelPricing) -> Self {
        Self {
            pricing,
            committed_input: 0,
            committed_output: 0,
            current: ChunkUsage::default(),
        }
    }

    /// Start accounting for a chunk whose prompt has `prompt_chars` characters.
    pub fn begin_chunk(&mut self, prompt_chars: usize) {
        self.current = ChunkUsage {
            prompt_chars,
            ..ChunkUsage::default()
        };
    }

    /// Record a generated fragment; returns its character count.
    pub fn record_text(&mut self, text: &str) -> usize {
        let chars = text.chars().count();
        self.current.output_chars += chars;
        chars
    }

    /// Fold in a cumulative usage snapshot for the current chunk.
    pub fn record_usage(&mut self, input_tokens: u32, output_tokens: u32) {
        let current = &mut self.current;
        current.reported_input = current.reported_input.max(u64::from(input_tokens));
        current.reported_output = current.reported_output.max(u64::from(output_tokens));
    }

    /// Close the current chunk and move its counts into the totals.
    pub fn finish_chunk(&mut self) {
        self.committed_input += self.current.final_input();
        self.committed_output += self.current.final_output();
        self.current = ChunkUsage::default();
    }

    pub fn input_tokens(&self) -> u64 {
        self.committed_input + self.current.live_input()
    }

    pub fn output_tokens(&self) -> u64 {
        self.committed_output + self.current.live_output()
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens() + self.output_tokens()
    }

    pub fn cost(&self) -> f64 {
        self.pricing.cost(self.input_tokens(), self.output_tokens())
    }

    /// `Some((spent, ceiling))` once the accumulated cost passes `ceiling`.
    pub fn over_budget(&self, ceiling: Option<f64>) -> Option<(f64, f64)> {
        let ceiling = ceiling?;
        let spent = self.cost();
        (spent > ceiling).then_some((spent, ceiling))
    }
}
