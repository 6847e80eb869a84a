/*
 * spin.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Conversion of bare scripts into literate documents.
 */

//! Script spinning.
//!
//! A bare R script becomes a literate document by treating roxygen-style
//! comments as prose:
//!
//! - `#' text` lines are prose (the `#' ` prefix is removed)
//! - `#+ options` / `#- options` lines start a new code chunk with the given
//!   chunk header
//! - everything else is code, grouped into chunks between prose lines

/// Transforms a bare script into literate-document text.
pub trait ScriptSpinner: Send + Sync {
    fn spin(&self, script: &str) -> String;
}

/// Spinner for roxygen-commented R scripts.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoxygenSpinner;

struct Chunk {
    header: String,
    lines: Vec<String>,
}

impl Chunk {
    fn new(options: &str) -> Self {
        let options = options.trim().trim_start_matches(',').trim();
        let header = if options.is_empty() {
            "```{r}".to_string()
        } else {
            format!("```{{r {}}}", options)
        };
        Self {
            header,
            lines: Vec::new(),
        }
    }

    fn is_default(&self) -> bool {
        self.header == "```{r}"
    }

    /// Append the fenced chunk to `out`. Empty default chunks are dropped.
    fn emit(mut self, out: &mut String) {
        while self.lines.last().is_some_and(|l| l.trim().is_empty()) {
            self.lines.pop();
        }
        let first_code = self
            .lines
            .iter()
            .position(|l| !l.trim().is_empty())
            .unwrap_or(self.lines.len());
        let lines = &self.lines[first_code..];
        if lines.is_empty() && self.is_default() {
            return;
        }

        if !out.is_empty() && !out.ends_with("\n\n") {
            out.push('\n');
        }
        out.push_str(&self.header);
        out.push('\n');
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("```\n\n");
    }
}

impl ScriptSpinner for RoxygenSpinner {
    fn spin(&self, script: &str) -> String {
        let mut out = String::new();
        let mut chunk: Option<Chunk> = None;

        for line in script.lines() {
            if let Some(prose) = line.strip_prefix("#'") {
                if let Some(open) = chunk.take() {
                    open.emit(&mut out);
                }
                out.push_str(prose.strip_prefix(' ').unwrap_or(prose));
                out.push('\n');
            } else if let Some(options) = line
                .strip_prefix("#+")
                .or_else(|| line.strip_prefix("#-"))
            {
                if let Some(open) = chunk.take() {
                    open.emit(&mut out);
                }
                chunk = Some(Chunk::new(options));
            } else if let Some(open) = chunk.as_mut() {
                open.lines.push(line.to_string());
            } else if line.trim().is_empty() {
                out.push('\n');
            } else {
                let mut open = Chunk::new("");
                open.lines.push(line.to_string());
                chunk = Some(open);
            }
        }

        if let Some(open) = chunk.take() {
            open.emit(&mut out);
        }
        out
    }
}
