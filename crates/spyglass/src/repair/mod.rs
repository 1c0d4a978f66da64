//! Syntax validation and repair
//!
//! Generated diagram text is often almost right. Before anything is handed to
//! the renderer it goes through two tiers of deterministic fixes:
//!
//! 1. **Pre-pass**: fixes that are always safe (missing header, unquoted
//!    path or non-Latin labels, runs of blank lines). Each runs at most once,
//!    in order, whether or not the text would have parsed without it.
//! 2. **Recovery**: only when the pre-pass output fails to parse. Each fix is
//!    applied on its own to the pre-pass output and re-parsed; the first one
//!    that parses wins. Fixes are never chained.
//!
//! When nothing helps, the result carries the pre-pass text and the error
//! from the *first* parse, since that is the one that describes the input.

use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, info, span, trace, warn, Instrument, Level};

use crate::core::{DiagramError, DiagramKind, DiagramSource, ErrorKind};
use crate::service::RenderService;

mod prepass;
mod recovery;

/// A named, pure text fix
#[derive(Clone, Copy)]
pub struct RepairAttempt {
    pub name: &'static str,
    /// Whether the fix would change anything
    pub applies: fn(&str) -> bool,
    pub apply: fn(&str) -> String,
}

impl std::fmt::Debug for RepairAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairAttempt")
            .field("name", &self.name)
            .finish()
    }
}

impl RepairAttempt {
    /// Apply the fix if its predicate matches
    pub fn run(&self, text: &str) -> Option<String> {
        (self.applies)(text).then(|| (self.apply)(text))
    }
}

/// The ordered pre-pass fixes
pub fn pre_pass_fixes() -> &'static [RepairAttempt] {
    &prepass::PRE_PASS
}

/// The ordered recovery fixes
pub fn recovery_fixes() -> &'static [RepairAttempt] {
    &recovery::RECOVERY
}

/// Run the pre-pass over `text`
///
/// Pure and idempotent: `pre_pass(&pre_pass(t)) == pre_pass(t)`.
pub fn pre_pass(text: &str) -> String {
    pre_pass_fixes()
        .iter()
        .fold(text.to_string(), |current, fix| match fix.run(&current) {
            Some(fixed) => {
                trace!(fix = fix.name, "Applied pre-pass fix");
                fixed
            }
            None => current,
        })
}

/// Outcome of validating one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub is_valid: bool,
    /// Text to render (valid) or to show for diagnosis (invalid)
    pub code: String,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Recovery fix that made the text parse, if one was needed
    pub applied_fix: Option<&'static str>,
}

impl Validation {
    fn valid(code: String, applied_fix: Option<&'static str>) -> Self {
        Self {
            is_valid: true,
            code,
            error: None,
            error_kind: None,
            applied_fix,
        }
    }

    fn invalid(code: String, error: &DiagramError) -> Self {
        Self {
            is_valid: false,
            code,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            applied_fix: None,
        }
    }
}

/// Repairs and checks diagram text against a [`RenderService`] grammar
#[derive(Clone)]
pub struct Validator {
    service: Rc<dyn RenderService>,
}

impl Validator {
    pub fn new(service: Rc<dyn RenderService>) -> Self {
        Self { service }
    }

    /// Validate a source; tree dumps only get the empty check
    pub async fn validate(&self, source: &DiagramSource) -> Validation {
        match source.kind {
            DiagramKind::Tree if source.is_blank() => {
                Validation::invalid(String::new(), &DiagramError::MissingSource)
            }
            DiagramKind::Tree => Validation::valid(source.raw_text.clone(), None),
            DiagramKind::Graph => self.validate_text(&source.raw_text).await,
        }
    }

    /// Validate graph text
    pub async fn validate_text(&self, raw_text: &str) -> Validation {
        let span = span!(Level::DEBUG, "validate", input_len = raw_text.len());
        self.repair(raw_text).instrument(span).await
    }

    async fn repair(&self, raw_text: &str) -> Validation {
        if raw_text.trim().is_empty() {
            debug!("Empty diagram source");
            return Validation::invalid(String::new(), &DiagramError::MissingSource);
        }

        let normalized = pre_pass(raw_text);
        let original_error = match self.service.parse(&normalized).await {
            Ok(()) => {
                debug!("Source parsed after pre-pass");
                return Validation::valid(normalized, None);
            }
            Err(err) => err,
        };
        debug!(error = %original_error, "Parse failed, trying recovery fixes");

        for fix in recovery_fixes() {
            let Some(candidate) = fix.run(&normalized) else {
                trace!(fix = fix.name, "Recovery fix does not apply");
                continue;
            };
            match self.service.parse(&candidate).await {
                Ok(()) => {
                    info!(fix = fix.name, "Recovered diagram source");
                    return Validation::valid(candidate, Some(fix.name));
                }
                Err(err) => trace!(fix = fix.name, error = %err, "Recovery fix did not help"),
            }
        }

        warn!(error = %original_error, "Diagram source could not be repaired");
        Validation::invalid(normalized, &original_error)
    }
}
