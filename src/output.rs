//! Report types and writers for the driver

use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use crate::core::errors::Result;
use crate::matching::BodyMapper;
use crate::replacement::Replacement;

/// One replacement, flattened for serialization
#[derive(Debug, Clone, Serialize)]
pub struct ReplacementView {
    pub before: String,
    pub after: String,
    pub kind: String,
}

impl From<&Replacement> for ReplacementView {
    fn from(replacement: &Replacement) -> Self {
        Self {
            before: replacement.before().to_string(),
            after: replacement.after().to_string(),
            kind: format!("{:?}", replacement.kind()),
        }
    }
}

/// One accepted mapping, by text
#[derive(Debug, Clone, Serialize)]
pub struct MappingView {
    pub before: String,
    pub after: String,
    pub exact: bool,
    pub composite: bool,
    pub replacements: Vec<ReplacementView>,
}

/// The diff of one function pair
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDiff {
    pub function: String,
    pub mappings: Vec<MappingView>,
    pub exact_matches: usize,
    pub added_statements: Vec<String>,
    pub deleted_statements: Vec<String>,
}

impl FunctionDiff {
    pub fn from_mapper(mapper: &BodyMapper) -> Self {
        let mappings = mapper
            .mappings()
            .iter()
            .map(|mapping| MappingView {
                before: mapping.text1.trim_end().to_string(),
                after: mapping.text2.trim_end().to_string(),
                exact: mapping.is_exact(),
                composite: !matches!(mapping.kind, crate::matching::MappingKind::Leaf),
                replacements: mapping.replacements().iter().map(Into::into).collect(),
            })
            .collect();
        let deleted_statements = mapper
            .non_mapped_leaves_t1()
            .iter()
            .map(|&id| mapper.operation1().body.get(id).text.trim_end().to_string())
            .collect();
        let added_statements = mapper
            .non_mapped_leaves_t2()
            .iter()
            .map(|&id| mapper.operation2().body.get(id).text.trim_end().to_string())
            .collect();
        Self {
            function: mapper.operation2().name.clone(),
            mappings,
            exact_matches: mapper.exact_matches(),
            added_statements,
            deleted_statements,
        }
    }

    pub fn has_differences(&self) -> bool {
        !self.added_statements.is_empty()
            || !self.deleted_statements.is_empty()
            || self.mappings.iter().any(|m| !m.replacements.is_empty())
    }
}

/// The whole run
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub functions: Vec<FunctionDiff>,
    /// Functions present only in the before file
    pub removed_functions: Vec<String>,
    /// Functions present only in the after file
    pub added_functions: Vec<String>,
}

pub fn write_json(report: &DiffReport, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}

pub fn write_terminal(report: &DiffReport, writer: &mut dyn Write) -> Result<()> {
    for function in &report.functions {
        writeln!(writer, "{} {}", "fn".bold(), function.function.bold())?;
        for mapping in &function.mappings {
            if mapping.composite {
                continue;
            }
            if mapping.exact {
                writeln!(writer, "  {} {}", "=".dimmed(), mapping.before.dimmed())?;
            } else {
                writeln!(writer, "  {} {}", "~".yellow(), mapping.before)?;
                writeln!(writer, "    {} {}", "->".yellow(), mapping.after)?;
                for replacement in &mapping.replacements {
                    writeln!(
                        writer,
                        "       {} `{}` -> `{}`",
                        replacement.kind.cyan(),
                        replacement.before,
                        replacement.after
                    )?;
                }
            }
        }
        for deleted in &function.deleted_statements {
            writeln!(writer, "  {} {}", "-".red(), deleted.red())?;
        }
        for added in &function.added_statements {
            writeln!(writer, "  {} {}", "+".green(), added.green())?;
        }
    }
    for name in &report.removed_functions {
        writeln!(writer, "{} fn {}", "-".red(), name.red())?;
    }
    for name in &report.added_functions {
        writeln!(writer, "{} fn {}", "+".green(), name.green())?;
    }
    Ok(())
}
