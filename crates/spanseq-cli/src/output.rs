//! Output formatting for `explain` and `search`.

use crate::corpus::Corpus;
use anyhow::Result;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde_json::json;
use spanseq_core::{Clause, CombineStep, SearchOutcome};

/// Output format of a subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

/// Prints a pattern, its optimized tree and the combines that produced it.
pub fn print_explain(
    pattern: &Clause,
    optimized: &Clause,
    steps: &[CombineStep],
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        let value = json!({
            "pattern": pattern,
            "optimized": optimized,
            "steps": steps,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{} {}", "Pattern:  ".bold(), pattern);
    println!("{} {}", "Optimized:".bold(), optimized);
    if steps.is_empty() {
        println!("{}", "No combines.".dimmed());
        return Ok(());
    }

    let mut table = new_table(&["#", "rule", "priority", "left", "right", "result"]);
    for (i, step) in steps.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(step.rule),
            Cell::new(step.priority),
            Cell::new(&step.left),
            Cell::new(&step.right),
            Cell::new(&step.result),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Prints the hits of a search with their text.
pub fn print_hits(outcome: &SearchOutcome, corpus: &Corpus, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        let hits: Vec<_> = outcome
            .hits
            .iter()
            .map(|h| {
                json!({
                    "shard": h.shard,
                    "doc": h.doc,
                    "start": h.start,
                    "end": h.end,
                    "text": corpus.text(h.shard, h.doc, h.start, h.end),
                })
            })
            .collect();
        let value = json!({
            "hits": hits,
            "truncated": outcome.truncated,
            "elapsed_ms": outcome.elapsed_ms,
            "optimized": outcome.optimized,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if outcome.hits.is_empty() {
        println!("{}", "No hits.".dimmed());
        return Ok(());
    }

    let mut table = new_table(&["shard", "doc", "start", "end", "text"]);
    for hit in &outcome.hits {
        table.add_row(vec![
            Cell::new(hit.shard),
            Cell::new(hit.doc),
            Cell::new(hit.start),
            Cell::new(hit.end),
            Cell::new(corpus.text(hit.shard, hit.doc, hit.start, hit.end)),
        ]);
    }
    println!("{table}");

    let summary = format!("{} hit(s) in {} ms", outcome.hits.len(), outcome.elapsed_ms);
    if outcome.truncated {
        println!("{} {}", summary.green(), "(truncated by max_hits)".yellow());
    } else {
        println!("{}", summary.green());
    }
    Ok(())
}
