//! Log Signatures
//!
//! Cheap regex heuristics that tell whether content looks like the log
//! category it was submitted as, and pull a few headline facts out of it
//! for the prompt.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use anr_analyzer_core::LogCategory;

const ANR_MARKERS: &[&str] = &[
    r"----- pid \d+ at",
    r"Cmd line:",
    r"DALVIK THREADS",
    r#""main" prio=\d+ tid=\d+"#,
    r"at android\.",
    r"at com\.android\.",
    r"ActivityManager: ANR in",
];

const TOMBSTONE_MARKERS: &[&str] = &[
    r"\*\*\* \*\*\* \*\*\*",
    r"Build fingerprint:",
    r"ABI:",
    r"signal \d+ \(SIG\w+\)",
    r"backtrace:",
    r"#\d+ pc [0-9a-f]+",
    r"Tombstone written to:",
    r"pid: \d+, tid: \d+",
    r"Abort message:",
];

/// Minimum number of markers for content to count as the category.
fn required_matches(category: LogCategory) -> usize {
    match category {
        LogCategory::Anr => 2,
        LogCategory::Tombstone => 3,
    }
}

fn compile_case_insensitive(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| RegexBuilder::new(p).case_insensitive(true).build().ok())
        .collect()
}

fn markers(category: LogCategory) -> &'static [Regex] {
    static ANR: OnceLock<Vec<Regex>> = OnceLock::new();
    static TOMBSTONE: OnceLock<Vec<Regex>> = OnceLock::new();
    match category {
        LogCategory::Anr => ANR.get_or_init(|| compile_case_insensitive(ANR_MARKERS)),
        LogCategory::Tombstone => {
            TOMBSTONE.get_or_init(|| compile_case_insensitive(TOMBSTONE_MARKERS))
        }
    }
}

/// Result of checking content against a category's markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureCheck {
    pub category: LogCategory,
    pub matched: usize,
    pub required: usize,
}

impl SignatureCheck {
    pub fn is_match(&self) -> bool {
        self.matched >= self.required
    }
}

/// Count how many of the category's markers appear in `content`.
pub fn check_signature(content: &str, category: LogCategory) -> SignatureCheck {
    let matched = markers(category)
        .iter()
        .filter(|re| re.is_match(content))
        .count();
    SignatureCheck {
        category,
        matched,
        required: required_matches(category),
    }
}

/// Headline facts extracted from a log, rendered into the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfo {
    pub fields: Vec<(&'static str, String)>,
}

impl KeyInfo {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

struct Extractor {
    name: &'static str,
    regex: Regex,
    group: usize,
}

fn extractor(name: &'static str, pattern: &str, group: usize) -> Option<Extractor> {
    Regex::new(pattern)
        .ok()
        .map(|regex| Extractor { name, regex, group })
}

fn extractors(category: LogCategory) -> &'static [Extractor] {
    static ANR: OnceLock<Vec<Extractor>> = OnceLock::new();
    static TOMBSTONE: OnceLock<Vec<Extractor>> = OnceLock::new();
    match category {
        LogCategory::Anr => ANR.get_or_init(|| {
            [
                extractor("pid", r"----- pid (\d+) at ([\d-]+ [\d:.]+)", 1),
                extractor("timestamp", r"----- pid (\d+) at ([\d-]+ [\d:.]+)", 2),
                extractor("package", r"Cmd line: ([\w.:]+)", 1),
                extractor("main_thread_state", r#""main".*?tid=\d+ (\w+)"#, 1),
                extractor("anr_reason", r"Reason: ([^\n]+)", 1),
            ]
            .into_iter()
            .flatten()
            .collect()
        }),
        LogCategory::Tombstone => TOMBSTONE.get_or_init(|| {
            [
                extractor("pid", r"pid: (\d+), tid: (\d+)", 1),
                extractor("tid", r"pid: (\d+), tid: (\d+)", 2),
                extractor("signal", r"signal (\d+ \(\w+\))", 1),
                extractor("abort_message", r"Abort message: '([^']+)'", 1),
                extractor("fault_address", r"fault addr (0x[0-9a-fA-F]+)", 1),
                extractor("process_name", r">>> ([\w.:/]+) <<<", 1),
                extractor("build_fingerprint", r"Build fingerprint: '([^']+)'", 1),
            ]
            .into_iter()
            .flatten()
            .collect()
        }),
    }
}

fn thread_count_regex() -> Option<&'static Regex> {
    static THREADS: OnceLock<Option<Regex>> = OnceLock::new();
    THREADS
        .get_or_init(|| Regex::new(r#"(?m)^".*?" .*?prio=\d+ tid=\d+"#).ok())
        .as_ref()
}

/// Extract the category's key facts from `content`.
pub fn extract_key_info(content: &str, category: LogCategory) -> KeyInfo {
    let mut fields: Vec<(&'static str, String)> = extractors(category)
        .iter()
        .filter_map(|ex| {
            ex.regex
                .captures(content)
                .and_then(|caps| caps.get(ex.group))
                .map(|m| (ex.name, m.as_str().trim().to_string()))
        })
        .collect();

    if category == LogCategory::Anr {
        if let Some(re) = thread_count_regex() {
            let threads = re.find_iter(content).count();
            if threads > 0 {
                fields.push(("total_threads", threads.to_string()));
            }
        }
    }

    KeyInfo { fields }
}
