//! Inline diagnostic placeholders.
//!
//! Unknown names at compile time and data-resolution failures at run time are
//! written into the output instead of aborting, so a large generation job
//! still produces a complete, self-documenting result.

/// Format a placeholder: `[?subject: reason]`.
pub fn placeholder(subject: &str, reason: &str) -> String {
    format!("[?{subject}: {reason}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format() {
        assert_eq!(placeholder("user.name", "unknown variable"), "[?user.name: unknown variable]");
    }
}
