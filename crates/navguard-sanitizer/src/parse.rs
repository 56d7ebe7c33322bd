//! Permissive parsing of untrusted JavaScript fragments.
//!
//! Submitted code is rarely a complete, strict program. The module grammar is
//! tried first (top-level `await`, `import`, `export`); when it rejects the
//! input, a sloppy-mode script parse is attempted so that constructs such as
//! `with` or legacy octal literals are still sanitized. `return` is accepted
//! outside functions under both grammars.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::{ParseOptions, Parser};
use oxc_span::SourceType;

use crate::depth::{self, NestingDepth};
use crate::error::SanitizeError;

/// Bracket nesting limit checked before parsing.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 256;

/// Syntax-tree depth limit checked before parsing.
pub const DEFAULT_MAX_SYNTAX_DEPTH: usize = 4096;

/// Measure nesting BEFORE parsing and reject input past either limit.
///
/// Both figures come from [`depth::measure`], which skips string, template,
/// comment and regex contents. The returned depth sizes the stack the parse
/// runs on.
pub fn check_nesting_depth(
    code: &str,
    max_brackets: usize,
    max_syntax: usize,
) -> Result<NestingDepth, SanitizeError> {
    let depth = depth::measure(code);
    if depth.brackets > max_brackets {
        return Err(SanitizeError::NestingTooDeep {
            max: max_brackets,
            actual: depth.brackets,
        });
    }
    if depth.syntax > max_syntax {
        return Err(SanitizeError::NestingTooDeep {
            max: max_syntax,
            actual: depth.syntax,
        });
    }
    Ok(depth)
}

/// Parse `code` as a module, falling back to a sloppy-mode script.
///
/// Returns the module grammar's error when both attempts fail.
pub fn parse_permissive<'a>(
    allocator: &'a Allocator,
    code: &'a str,
) -> Result<Program<'a>, SanitizeError> {
    let module_err = match parse_as(allocator, code, SourceType::mjs()) {
        Ok(program) => return Ok(program),
        Err(err) => err,
    };
    match parse_as(allocator, code, SourceType::mjs().with_module(false)) {
        Ok(program) => {
            tracing::debug!(error = %module_err, "module grammar rejected input, parsed as script");
            Ok(program)
        }
        Err(_) => Err(module_err),
    }
}

fn parse_as<'a>(
    allocator: &'a Allocator,
    code: &'a str,
    source_type: SourceType,
) -> Result<Program<'a>, SanitizeError> {
    let options = ParseOptions {
        allow_return_outside_function: true,
        ..ParseOptions::default()
    };
    let ret = Parser::new(allocator, code, source_type)
        .with_options(options)
        .parse();

    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser panicked on malformed input".into());
        return Err(SanitizeError::Parse { message });
    }

    Ok(ret.program)
}
