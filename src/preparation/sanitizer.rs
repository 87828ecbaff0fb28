//! SQL script sanitizer
//!
//! Strips the noise SSMS-generated scripts carry before procedures are sent
//! to a model: `IF EXISTS ... DROP PROCEDURE ... GO` guards, block comments
//! and blank lines. Remaining lines are trimmed.

use regex::Regex;

use crate::types::{Result, WeaveError};

pub(crate) fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| WeaveError::Config(format!("invalid pattern {}: {}", pattern, e)))
}

pub struct SqlSanitizer {
    drop_guard: Regex,
    block_comment: Regex,
}

impl SqlSanitizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            drop_guard: compile(
                r"(?s)IF\s+EXISTS\s*\(\s*SELECT\s*\*.*?OBJECT_ID\(N'.*?'\).*?\)\s*\n.*?DROP\s+PROCEDURE\s+.*?\nGO\r?\n",
            )?,
            block_comment: compile(r"/\*[\s\S]*?\*/")?,
        })
    }

    pub fn sanitize(&self, script: &str) -> String {
        let script = self.drop_guard.replace_all(script, "");
        let script = self.block_comment.replace_all(&script, "");

        script
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_drop_guard() {
        let script = "IF EXISTS (SELECT * FROM sys.objects WHERE object_id = OBJECT_ID(N'[dbo].[sp_a]') AND type in (N'P'))\n\
                      DROP PROCEDURE [dbo].[sp_a]\n\
                      GO\n\
                      CREATE PROCEDURE sp_a AS\n\
                      SELECT 1\n";

        let clean = SqlSanitizer::new().unwrap().sanitize(script);
        assert_eq!(clean, "CREATE PROCEDURE sp_a AS\nSELECT 1");
    }

    #[test]
    fn test_removes_block_comments_and_blank_lines() {
        let script = "/** header\n * author\n */\n\n   SELECT a /* inline */ FROM t  \n\n\nEXEC sp_b\n";

        let clean = SqlSanitizer::new().unwrap().sanitize(script);
        assert_eq!(clean, "SELECT a  FROM t\nEXEC sp_b");
    }

    #[test]
    fn test_line_comments_are_kept() {
        let clean = SqlSanitizer::new().unwrap().sanitize("-- keep me\nSELECT 1");
        assert_eq!(clean, "-- keep me\nSELECT 1");
    }
}
