//! Greeting deduplication.
//!
//! Once a chat has been greeted the model is told not to greet again, but it
//! still sometimes opens with "Hello! ...". This filter strips that lead-in.
//! It is a string heuristic, not a parser: a reply that starts with a greeting
//! word loses everything up to the first `!` (or `.` when there is no `!`),
//! even if that punctuation belongs to a later sentence.

/// Ordered list of greeting lead-ins. The first matching phrase wins.
#[derive(Debug, Clone)]
pub struct GreetingFilter {
    phrases: Vec<String>,
}

impl GreetingFilter {
    pub fn new(phrases: Vec<String>) -> Self {
        let phrases = phrases.into_iter().filter(|p| !p.is_empty()).collect();
        Self { phrases }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn clean(&self, text: &str, already_greeted: bool) -> String {
        clean_response(text, already_greeted, &self.phrases)
    }

    /// Remove only a leading greeting phrase and the punctuation right after
    /// it. Used when [`clean`](Self::clean) would leave nothing.
    pub fn strip_phrase(&self, text: &str) -> String {
        let lead = text.trim_start();
        match self.phrases.iter().find(|p| lead.starts_with(p.as_str())) {
            Some(phrase) => lead[phrase.len()..]
                .trim_start_matches(|c: char| {
                    c.is_whitespace() || matches!(c, '!' | '.' | ',' | ';' | ':')
                })
                .trim_end()
                .to_string(),
            None => text.to_string(),
        }
    }
}

/// Strip a redundant greeting from `text` when `already_greeted` is set.
///
/// On the first phrase that the trimmed text starts with, `text` is split
/// once at the first `!` (or the first `.` if there is no `!`) and the
/// trimmed remainder is returned, which may be empty. Without either
/// delimiter every occurrence of the phrase is removed instead.
pub fn clean_response<S: AsRef<str>>(text: &str, already_greeted: bool, phrases: &[S]) -> String {
    if !already_greeted {
        return text.to_string();
    }

    let lead = text.trim_start();
    let matched = phrases
        .iter()
        .map(|p| p.as_ref())
        .find(|p| !p.is_empty() && lead.starts_with(*p));

    let Some(phrase) = matched else {
        return text.to_string();
    };

    let delimiter = if text.contains('!') { '!' } else { '.' };
    match text.split_once(delimiter) {
        Some((_, rest)) => rest.trim().to_string(),
        None => text.replace(phrase, "").trim().to_string(),
    }
}
