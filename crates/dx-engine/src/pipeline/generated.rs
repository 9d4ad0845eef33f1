use regex::Regex;

/// Lines of a file inspected for a generator banner.
pub const SCAN_LINES: usize = 100;

/// Recognizes machine-generated Java by the banners common generators write
/// near the top of their output.
pub struct GeneratedCodeDetector {
    banners: Vec<Regex>,
}

impl Default for GeneratedCodeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratedCodeDetector {
    pub fn new() -> Self {
        let banners = [
            // ANTLR
            r"//\s*\$ANTLR",
            // JavaCC / JJTree
            r"/\*\s*Generated.*(JavaCC|JJTree)",
            // IDL-to-Java compiler
            r"\*\s*Generated by the IDL-to-Java compiler",
            // Apache Axis
            r"\*\s*This file was auto-generated",
            // protoc
            r"Generated by the protocol buffer compiler",
            // Jython
            r"generated by make_pydocs\.py",
            r"Generated file, do not modify",
        ];
        Self {
            banners: banners
                .iter()
                .map(|pattern| Regex::new(pattern).expect("invalid banner regex"))
                .collect(),
        }
    }

    pub fn is_generated_line(&self, line: &str) -> bool {
        self.banners.iter().any(|re| re.is_match(line))
    }

    /// Scans the first [`SCAN_LINES`] lines of `source`.
    pub fn is_generated(&self, source: &str) -> bool {
        source
            .lines()
            .take(SCAN_LINES)
            .any(|line| self.is_generated_line(line))
    }
}
