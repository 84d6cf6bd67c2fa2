//! Hook enhancement and phrase selection against the active template set.

use rand::prelude::IndexedRandom;
use rand::Rng;
use tracing::debug;

use shorts_models::TemplateSet;

/// Applies a hook style pattern to a raw hook line.
///
/// A hook that already structurally matches the style is returned
/// unchanged, which makes the operation idempotent. Otherwise the
/// trailing period is dropped and the hook is substituted into the
/// pattern slot.
pub fn enhance_hook(hook: &str, style: &str, templates: &TemplateSet) -> String {
    if templates.hook_matches_style(hook, style) {
        return hook.to_string();
    }
    let Some((prefix, suffix)) = templates.pattern_parts(style) else {
        return hook.to_string();
    };
    let core = hook.trim().trim_end_matches('.');
    format!("{prefix}{core}{suffix}")
}

/// Picks a random hook style name from the set.
pub fn choose_style<'a, R: Rng>(templates: &'a TemplateSet, rng: &mut R) -> &'a str {
    let styles: Vec<&str> = templates.hook.keys().map(String::as_str).collect();
    // Validation guarantees a non-empty pool.
    let style = styles[rng.random_range(0..styles.len())];
    debug!(style, "selected hook style");
    style
}

/// Picks a random transition phrase.
pub fn choose_transition<'a, R: Rng>(templates: &'a TemplateSet, rng: &mut R) -> &'a str {
    templates
        .transition
        .choose(rng)
        .map(String::as_str)
        .unwrap_or_default()
}

/// Picks a random ending phrase.
pub fn choose_ending<'a, R: Rng>(templates: &'a TemplateSet, rng: &mut R) -> &'a str {
    templates
        .ending
        .choose(rng)
        .map(String::as_str)
        .unwrap_or_default()
}
