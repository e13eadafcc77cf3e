//! Source location of a log statement

use std::path::Path;

/// Where a log call was made
///
/// Built at compile time by [`call_site!`](crate::call_site), which every
/// logging macro expands to. Callers of the client methods pass one in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
    /// Path of the enclosing function
    pub function: &'static str,
}

impl CallSite {
    pub const fn new(file: &'static str, line: u32, function: &'static str) -> Self {
        Self {
            file,
            line,
            function,
        }
    }

    /// File name without its directories
    pub fn basename(&self) -> &'static str {
        Path::new(self.file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename_strips_directories() {
        assert_eq!(CallSite::new("src/core/client.rs", 1, "f").basename(), "client.rs");
        assert_eq!(CallSite::new("lib.rs", 1, "f").basename(), "lib.rs");
    }

    #[test]
    fn test_call_site_macro_points_here() {
        let line = line!() + 1;
        let site = crate::call_site!();
        assert_eq!(site.basename(), "call_site.rs");
        assert_eq!(site.line, line);
    }

    #[test]
    fn test_call_site_macro_knows_function() {
        let site = crate::call_site!();
        assert_eq!(site.basename(), "call_site.rs");
        let function = site.function;
        assert!(
            function.ends_with("test_call_site_macro_knows_function"),
            "unexpected function path {}",
            function
        );
    }
}
