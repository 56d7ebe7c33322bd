//! Output cleanup after statements have been removed.

/// Drop lines that are blank after trimming and join the rest with `\n`.
///
/// Surviving lines keep their indentation and content.
pub fn collapse_blank_lines(generated: &str) -> String {
    generated
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
