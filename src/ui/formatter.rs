//! Pure formatting functions for UI output.
//!
//! Styled terminal output for command results, separate from user interaction
//! and from the `tracing` log stream.

use console::style;

use crate::domain::Evr;
use crate::promotion::{MergeRecord, PromotionChain, PromotionStatus};

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display the branches of a promotion chain, one per line.
pub fn display_chain(chain: &PromotionChain) {
    println!("{}", style("Promotion chain:").bold());
    for (i, branch) in chain.branches().iter().enumerate() {
        println!("  {}. {}", i + 1, branch);
    }
}

/// Describe a promotion status in a single line.
pub fn format_status(chain: &PromotionChain, status: PromotionStatus) -> String {
    match status {
        PromotionStatus::FullyPromoted => "fully promoted".to_string(),
        PromotionStatus::NotStarted => match chain.pairs().next() {
            Some((src, dest)) => format!("not started ({} is not merged into {})", src, dest),
            None => "not started".to_string(),
        },
        PromotionStatus::PartiallyPromoted { at } => match chain.pairs().nth(at) {
            Some((src, dest)) => format!("partially promoted, stopped at {} -> {}", src, dest),
            None => format!("partially promoted, stopped at hop {}", at + 1),
        },
    }
}

/// Display the merges recorded by a merge-forward run.
pub fn display_merges(records: &[MergeRecord]) {
    if records.is_empty() {
        display_status("Nothing to merge, every branch is already merged forward");
        return;
    }
    for record in records {
        let short = record.commit.get(..7).unwrap_or(&record.commit);
        display_success(&format!(
            "Merged {} into {} ({})",
            record.src,
            record.dest,
            style(short).cyan()
        ));
    }
}

/// Display the string forms of an EVR.
pub fn display_evr(evr: &Evr) {
    println!("{}   {}", style("canonical:").bold(), evr);
    println!("{}        {}", style("dist:").bold(), evr.dist_release());
    println!("{}      {}", style("public:").bold(), evr.python_version());
    if evr.is_nightly() {
        println!("{}     nightly (not tagged)", style("kind:").bold());
    }
}
