#![warn(missing_docs)]

//! # navguard-sanitizer
//!
//! Removes statements that could redirect the host page's navigation context
//! from untrusted JavaScript, leaving everything else untouched.
//!
//! ## Pipeline
//!
//! `source → parse → classify + strip (in place) → codegen → normalize`
//!
//! - **Syntactic only**: assignment targets are classified by shape; no
//!   expression is ever evaluated, so computed keys driven by variables are a
//!   known gap rather than an execution risk
//! - **Whole statements**: removal always drops the nearest enclosing
//!   statement from its list, never part of an expression; a statement in a
//!   single-statement slot (`if` branch, loop body) becomes an empty block
//! - **Bounded depth**: nesting is measured lexically before parsing, and the
//!   parse runs on a stack sized from that measurement
//! - **Verbatim when clean**: if nothing was removed the input is returned
//!   byte-for-byte
//! - **Fail-safe**: unparsable input yields the empty string by default
//!
//! Every call owns its own arena and tree, so a [`Sanitizer`] can be shared
//! across threads without locking.

pub mod classifier;
pub mod depth;
pub mod error;
pub mod normalize;
pub mod parse;
pub mod stripper;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;

pub use classifier::{LocationPropertyPolicy, NavigationClassifier, DEFAULT_NAVIGATION_GLOBALS};
pub use error::SanitizeError;
pub use parse::{DEFAULT_MAX_NESTING_DEPTH, DEFAULT_MAX_SYNTAX_DEPTH};

use crate::normalize::collapse_blank_lines;
use crate::stripper::NavigationStripper;

/// Stack reserved for parse, strip and codegen regardless of input.
const SANITIZE_STACK_BASE: usize = 1024 * 1024;

/// Extra stack per level of measured syntax depth.
const STACK_PER_LEVEL: usize = 64 * 1024;

/// What to return when the input cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailSafePolicy {
    /// Return the empty string. Callers must read an empty result as
    /// "input rejected", not "input was empty".
    #[default]
    Reject,
    /// Return the input unchanged. Only for callers that treat a failure as
    /// "not yet sanitized" and handle it separately.
    Passthrough,
}

impl FailSafePolicy {
    fn apply(self, code: &str) -> String {
        match self {
            Self::Reject => String::new(),
            Self::Passthrough => code.to_string(),
        }
    }
}

/// Sanitizer settings.
#[derive(Debug, Clone)]
pub struct SanitizerConfig {
    /// Output policy for unparsable input.
    pub fail_safe: FailSafePolicy,
    /// Which location property writes count as navigation.
    pub location_properties: LocationPropertyPolicy,
    /// Identifiers treated as the global navigation object.
    pub navigation_globals: Vec<String>,
    /// Bracket nesting limit checked before parsing.
    pub max_nesting_depth: usize,
    /// Syntax-tree depth limit checked before parsing.
    pub max_syntax_depth: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            fail_safe: FailSafePolicy::default(),
            location_properties: LocationPropertyPolicy::default(),
            navigation_globals: DEFAULT_NAVIGATION_GLOBALS
                .iter()
                .map(|g| (*g).to_string())
                .collect(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_syntax_depth: DEFAULT_MAX_SYNTAX_DEPTH,
        }
    }
}

/// How a sanitize call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing matched; the input was returned verbatim.
    Clean,
    /// One or more statements were removed and the code regenerated.
    Stripped {
        /// Number of statements removed.
        removed: usize,
    },
    /// The input could not be processed; the fail-safe policy chose the output.
    Rejected(SanitizeError),
}

impl Outcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Stripped { .. } => "stripped",
            Self::Rejected(_) => "rejected",
        }
    }

    /// Number of statements removed (zero unless [`Outcome::Stripped`]).
    pub fn removed(&self) -> usize {
        match self {
            Self::Stripped { removed } => *removed,
            _ => 0,
        }
    }
}

/// Result of a sanitize call: the output text and how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    /// Text to hand to the downstream consumer.
    pub code: String,
    /// How the text was produced.
    pub outcome: Outcome,
}

/// Reusable, thread-safe sanitizer.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    classifier: NavigationClassifier,
    fail_safe: FailSafePolicy,
    max_nesting_depth: usize,
    max_syntax_depth: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(SanitizerConfig::default())
    }
}

struct Rewrite {
    removed: usize,
    generated: String,
}

impl Sanitizer {
    /// Create a sanitizer from its settings.
    pub fn new(config: SanitizerConfig) -> Self {
        Self {
            classifier: NavigationClassifier::new(
                config.navigation_globals,
                config.location_properties,
            ),
            fail_safe: config.fail_safe,
            max_nesting_depth: config.max_nesting_depth,
            max_syntax_depth: config.max_syntax_depth,
        }
    }

    /// The active fail-safe policy.
    pub fn fail_safe(&self) -> FailSafePolicy {
        self.fail_safe
    }

    /// Sanitize `code`. Never panics and never fails: parse errors and
    /// internal faults are resolved by the fail-safe policy.
    pub fn sanitize(&self, code: &str) -> Sanitized {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.rewrite(code)))
            .unwrap_or_else(|payload| {
                Err(SanitizeError::Internal {
                    message: panic_message(payload.as_ref()),
                })
            });

        match result {
            Ok(None) => Sanitized {
                code: code.to_string(),
                outcome: Outcome::Clean,
            },
            Ok(Some(rewrite)) => Sanitized {
                code: collapse_blank_lines(&rewrite.generated),
                outcome: Outcome::Stripped {
                    removed: rewrite.removed,
                },
            },
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    code = err.code(),
                    policy = ?self.fail_safe,
                    "input rejected by sanitizer"
                );
                Sanitized {
                    code: self.fail_safe.apply(code),
                    outcome: Outcome::Rejected(err),
                }
            }
        }
    }

    /// Returns `None` when nothing had to be removed.
    fn rewrite(&self, code: &str) -> Result<Option<Rewrite>, SanitizeError> {
        let depth =
            parse::check_nesting_depth(code, self.max_nesting_depth, self.max_syntax_depth)?;

        // Parse, walk and print all recurse once per tree level.
        let stack = depth
            .syntax
            .saturating_mul(STACK_PER_LEVEL)
            .saturating_add(SANITIZE_STACK_BASE);
        stacker::maybe_grow(stack, stack, || self.rewrite_tree(code))
    }

    fn rewrite_tree(&self, code: &str) -> Result<Option<Rewrite>, SanitizeError> {
        let allocator = Allocator::default();
        let mut program = parse::parse_permissive(&allocator, code)?;

        let removed = NavigationStripper::new(&self.classifier, &allocator).strip(&mut program);
        if removed == 0 {
            return Ok(None);
        }
        tracing::debug!(removed, "navigation-redirect statements removed");

        let generated = Codegen::new().build(&program).code;
        Ok(Some(Rewrite { removed, generated }))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".into()
    }
}

/// Sanitize `code` with the default configuration.
///
/// Returns the empty string when the input cannot be parsed.
pub fn sanitize_code(code: &str) -> String {
    Sanitizer::default().sanitize(code).code
}
