//! The shared template set consumed by the scripting stage.
//!
//! One template set exists process-wide. Its only writer is the template
//! adaptation engine; scripting runs only read it. Updates must be applied
//! with whole-document replace so a reader never observes a half-written
//! set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Substitution slot every hook pattern must contain exactly once.
pub const HOOK_SLOT: &str = "{}";

/// Structural validation failures for a template set.
#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("hook style pool is empty")]
    EmptyHookPool,

    #[error("transition phrase pool is empty")]
    EmptyTransitionPool,

    #[error("ending phrase pool is empty")]
    EmptyEndingPool,

    #[error("hook pattern for style '{style}' must contain exactly one {HOOK_SLOT} slot")]
    BadHookPattern { style: String },
}

/// The pool of phrase patterns used to assemble narration scripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSet {
    /// Hook style name -> phrase pattern with one `{}` slot
    pub hook: BTreeMap<String, String>,

    /// Transition phrase pool
    pub transition: Vec<String>,

    /// Ending phrase pool
    pub ending: Vec<String>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        let mut hook = BTreeMap::new();
        hook.insert("question".to_string(), "{}?".to_string());
        hook.insert("warning".to_string(), "주의하세요! {}".to_string());
        hook.insert("shocking".to_string(), "충격! {}".to_string());
        hook.insert("interesting".to_string(), "놀라운 사실! {}".to_string());

        Self {
            hook,
            transition: vec![
                "자세히 알아보겠습니다.".to_string(),
                "지금 바로 알려드립니다.".to_string(),
                "함께 살펴보겠습니다.".to_string(),
                "이것이 전체 내용입니다.".to_string(),
            ],
            ending: vec![
                "이상 글로벌 뉴스 단신이었습니다.".to_string(),
                "더 자세한 내용은 링크를 참고하세요.".to_string(),
                "구독과 좋아요 부탁드립니다.".to_string(),
                "다음 소식에서 다시 만나요.".to_string(),
            ],
        }
    }
}

impl TemplateSet {
    /// Validate the structural invariants: non-empty pools and exactly one
    /// substitution slot per hook pattern.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.hook.is_empty() {
            return Err(TemplateError::EmptyHookPool);
        }
        if self.transition.is_empty() {
            return Err(TemplateError::EmptyTransitionPool);
        }
        if self.ending.is_empty() {
            return Err(TemplateError::EmptyEndingPool);
        }

        for (style, pattern) in &self.hook {
            if pattern.matches(HOOK_SLOT).count() != 1 {
                return Err(TemplateError::BadHookPattern {
                    style: style.clone(),
                });
            }
        }

        Ok(())
    }

    /// Split the pattern for a style into (prefix, suffix) around the slot.
    ///
    /// Returns `None` for unknown styles.
    pub fn pattern_parts(&self, style: &str) -> Option<(&str, &str)> {
        self.hook.get(style)?.split_once(HOOK_SLOT)
    }

    /// Check whether a hook already structurally matches a style, e.g.
    /// already ends in a question mark for the question style.
    pub fn hook_matches_style(&self, hook: &str, style: &str) -> bool {
        match self.pattern_parts(style) {
            Some((prefix, suffix)) => hook.starts_with(prefix) && hook.ends_with(suffix),
            None => false,
        }
    }

    /// Detect which style a hook matches, if any.
    ///
    /// Styles with longer prefixes win over the bare question suffix so a
    /// hook like "주의하세요! ...?" is classified as warning.
    pub fn detect_style(&self, hook: &str) -> Option<&str> {
        self.hook
            .iter()
            .filter(|(style, _)| self.hook_matches_style(hook, style))
            .max_by_key(|(_, pattern)| pattern.len())
            .map(|(style, _)| style.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_is_valid() {
        assert_eq!(TemplateSet::default().validate(), Ok(()));
    }

    #[test]
    fn test_empty_pool_rejected() {
        let mut set = TemplateSet::default();
        set.transition.clear();
        assert_eq!(set.validate(), Err(TemplateError::EmptyTransitionPool));
    }

    #[test]
    fn test_missing_slot_rejected() {
        let mut set = TemplateSet::default();
        set.hook
            .insert("broken".to_string(), "no slot here".to_string());

        assert_eq!(
            set.validate(),
            Err(TemplateError::BadHookPattern {
                style: "broken".to_string()
            })
        );
    }

    #[test]
    fn test_double_slot_rejected() {
        let mut set = TemplateSet::default();
        set.hook
            .insert("broken".to_string(), "{} and {}".to_string());
        assert!(set.validate().is_err());
    }

    #[test]
    fn test_hook_matches_style() {
        let set = TemplateSet::default();
        assert!(set.hook_matches_style("금리가 또 올랐습니다?", "question"));
        assert!(set.hook_matches_style("충격! 금리가 또 올랐습니다", "shocking"));
        assert!(!set.hook_matches_style("금리가 또 올랐습니다", "question"));
    }

    #[test]
    fn test_detect_style_prefers_longest_pattern() {
        let set = TemplateSet::default();
        assert_eq!(set.detect_style("주의하세요! 폭우가 옵니다"), Some("warning"));
        assert_eq!(set.detect_style("폭우가 옵니다?"), Some("question"));
        assert_eq!(set.detect_style("폭우가 옵니다"), None);
    }
}
