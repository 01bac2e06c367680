//! Analysis Prompts
//!
//! Builds the system prompt and per-chunk user prompt for each log category
//! and analysis mode.

use anr_analyzer_core::{AnalysisMode, LogCategory, ModeProfile};
use anr_analyzer_llm::CompletionRequest;

use crate::services::chunker::Chunk;
use crate::services::log_signature::{extract_key_info, KeyInfo};

/// Build the system prompt for a category.
pub fn build_system_prompt(category: LogCategory) -> String {
    match category {
        LogCategory::Anr => r#"You are an Android performance engineer specializing in ANR (Application Not Responding) diagnosis.

You read ANR traces (traces.txt and ActivityManager output) and explain:
- what the main thread was doing when the ANR fired
- which locks, Binder calls or I/O it was waiting on
- which other threads hold the resources the main thread needs

Be concrete. Quote thread names, states and stack frames from the trace. Write in Markdown."#
            .to_string(),
        LogCategory::Tombstone => r#"You are an Android native crash engineer specializing in tombstone analysis.

You read tombstones (native crash dumps) and explain:
- which signal killed the process and what the fault address means
- which frame in the backtrace is the most likely culprit
- what memory or concurrency bug produces this pattern

Be concrete. Quote frames, registers and abort messages from the tombstone. Write in Markdown."#
            .to_string(),
    }
}

fn instructions(category: LogCategory, mode: AnalysisMode) -> &'static str {
    match (category, mode) {
        (LogCategory::Anr, AnalysisMode::Quick) => {
            "Give a short analysis with these sections:\n\
             1. Summary: one paragraph on what blocked the main thread\n\
             2. Root cause\n\
             3. Quick fixes: the two or three most effective changes"
        }
        (LogCategory::Anr, AnalysisMode::Intelligent) => {
            "Give a thorough analysis with these sections:\n\
             1. Summary\n\
             2. Thread state analysis: main thread block point, related threads, deadlock check\n\
             3. Root cause\n\
             4. Fixes: short-term mitigation and long-term solution\n\
             5. Prevention: coding practices and tooling that would catch this earlier"
        }
        (LogCategory::Anr, AnalysisMode::LargeFile) => {
            "This is a large trace. Give a structured report with these sections:\n\
             1. Executive summary\n\
             2. Detailed thread analysis: main thread, blocked threads, lock owners\n\
             3. System state: CPU load, memory pressure, I/O wait\n\
             4. Complete solution with code-level guidance\n\
             5. Monitoring: metrics and alerts to detect recurrence"
        }
        (LogCategory::Anr, AnalysisMode::MaxToken) => {
            "Give an exhaustive analysis with these sections:\n\
             1. Timeline of events leading to the ANR\n\
             2. Complete thread analysis: every thread in a waiting or blocked state\n\
             3. System analysis: CPU, memory, I/O\n\
             4. Binder and IPC analysis\n\
             5. Code-level localization of the blocking call\n\
             6. Root cause with supporting evidence\n\
             7. Fixes ranked by impact and risk\n\
             8. Regression tests and monitoring"
        }
        (LogCategory::Tombstone, AnalysisMode::Quick) => {
            "Give a short analysis with these sections:\n\
             1. Crash cause\n\
             2. Crash location: library and function\n\
             3. Quick fix"
        }
        (LogCategory::Tombstone, AnalysisMode::Intelligent) => {
            "Give a thorough analysis with these sections:\n\
             1. Stack analysis: the culprit frame and how execution got there\n\
             2. Signal meaning: what the signal and code imply\n\
             3. Memory issues: use-after-free, overflow, null dereference\n\
             4. Concurrency issues: data races, lock misuse\n\
             5. Fixes\n\
             6. Debugging tips: sanitizers, symbolization, reproduction"
        }
        (LogCategory::Tombstone, AnalysisMode::LargeFile) => {
            "This is a large tombstone. Give a structured report with these sections:\n\
             1. Full stack analysis of the crashing thread and other relevant threads\n\
             2. Register state\n\
             3. Memory map around the fault address\n\
             4. Diagnosis\n\
             5. Solutions with code-level guidance"
        }
        (LogCategory::Tombstone, AnalysisMode::MaxToken) => {
            "Give an exhaustive analysis with these sections:\n\
             1. Timeline leading to the crash\n\
             2. Disassembly-level reading of the faulting frame\n\
             3. Memory analysis: maps, fault address, heap state\n\
             4. System state\n\
             5. Code review of the suspected component\n\
             6. Fixes ranked by impact and risk\n\
             7. Tests that reproduce the crash\n\
             8. Monitoring to catch recurrence"
        }
    }
}

fn log_label(category: LogCategory) -> &'static str {
    match category {
        LogCategory::Anr => "ANR trace",
        LogCategory::Tombstone => "tombstone",
    }
}

fn render_key_info(info: &KeyInfo) -> String {
    let mut out = String::from("Key information:\n");
    for (name, value) in &info.fields {
        out.push_str(&format!("- {}: {}\n", name, value));
    }
    out
}

/// Build the user prompt for one chunk.
///
/// Key information extracted from the whole log is included with the first
/// chunk only. Multi-chunk analyses get a "part i of N" header.
pub fn build_user_prompt(
    category: LogCategory,
    mode: AnalysisMode,
    chunk: &Chunk<'_>,
    key_info: Option<&KeyInfo>,
) -> String {
    let mut prompt = String::new();

    if chunk.total > 1 {
        prompt.push_str(&format!(
            "This is part {} of {} of the {}. Analyze this part; earlier parts have already been covered.\n\n",
            chunk.number(),
            chunk.total,
            log_label(category)
        ));
    }

    prompt.push_str(instructions(category, mode));
    prompt.push_str("\n\n");

    if let Some(info) = key_info.filter(|info| !info.is_empty()) {
        prompt.push_str(&render_key_info(info));
        prompt.push('\n');
    }

    prompt.push_str(&format!("```\n{}\n```", chunk.text));
    prompt
}

/// Build the completion request for one chunk.
pub fn build_chunk_request(
    category: LogCategory,
    mode: AnalysisMode,
    profile: &ModeProfile,
    chunk: &Chunk<'_>,
    full_content: &str,
) -> CompletionRequest {
    let key_info = (chunk.index == 0).then(|| extract_key_info(full_content, category));
    CompletionRequest::new(
        build_system_prompt(category),
        build_user_prompt(category, mode, chunk, key_info.as_ref()),
    )
    .with_max_tokens(profile.max_output_tokens)
}
