//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.
//!
//! ```text
//! 001 Banana Bread → recipes/banana-bread/index.html (added)
//! 002 (no entry) → recipes/pavlova/index.html (unchanged)
//!
//! Generated 2 pages: 1 added, 0 updated, 1 unchanged
//! ```

use crate::generate::{BuildReport, GeneratedPage, PageStatus, RevalidateReport};
use crate::paths::{self, Fallback, StaticPaths};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn status_label(status: PageStatus) -> &'static str {
    match status {
        PageStatus::Added => "added",
        PageStatus::Updated => "updated",
        PageStatus::Unchanged => "unchanged",
    }
}

fn page_line(index: usize, page: &GeneratedPage) -> String {
    let title = page.title.as_deref().unwrap_or("(no entry)");
    format!(
        "{} {} → recipes/{}/index.html ({})",
        format_index(index),
        title,
        page.slug,
        status_label(page.status)
    )
}

fn summary(pages: &[GeneratedPage]) -> String {
    let count = |status: PageStatus| pages.iter().filter(|p| p.status == status).count();
    let noun = if pages.len() == 1 { "page" } else { "pages" };
    format!(
        "Generated {} {}: {} added, {} updated, {} unchanged",
        pages.len(),
        noun,
        count(PageStatus::Added),
        count(PageStatus::Updated),
        count(PageStatus::Unchanged)
    )
}

/// One route per line, followed by the fallback policy.
pub fn format_paths(paths: &StaticPaths) -> Vec<String> {
    let mut lines: Vec<String> = paths
        .slugs
        .iter()
        .enumerate()
        .map(|(i, slug)| format!("{} {}", format_index(i + 1), paths::route_for(slug)))
        .collect();
    lines.push(match paths.fallback {
        Fallback::Placeholder => "Unlisted slugs: generated on first request".to_string(),
        Fallback::NotFound => "Unlisted slugs: 404".to_string(),
    });
    lines
}

pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .pages
        .iter()
        .enumerate()
        .map(|(i, page)| page_line(i + 1, page))
        .collect();
    lines.push(String::new());
    lines.push(summary(&report.pages));
    lines
}

pub fn format_revalidate_output(report: &RevalidateReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .pages
        .iter()
        .filter(|p| p.status != PageStatus::Unchanged)
        .enumerate()
        .map(|(i, page)| page_line(i + 1, page))
        .collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(summary(&report.pages));
    if report.fresh > 0 {
        lines.push(format!("{} fresh pages skipped", report.fresh));
    }
    lines
}

pub fn print_paths(paths: &StaticPaths) {
    for line in format_paths(paths) {
        println!("{}", line);
    }
}

pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

pub fn print_revalidate_output(report: &RevalidateReport) {
    for line in format_revalidate_output(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(slug: &str, title: Option<&str>, status: PageStatus) -> GeneratedPage {
        GeneratedPage {
            slug: slug.to_string(),
            title: title.map(str::to_string),
            status,
        }
    }

    #[test]
    fn paths_listing() {
        let paths = StaticPaths {
            slugs: vec!["toast".into(), "soup".into()],
            fallback: Fallback::Placeholder,
        };
        assert_eq!(
            format_paths(&paths),
            vec![
                "001 /recipes/toast",
                "002 /recipes/soup",
                "Unlisted slugs: generated on first request",
            ]
        );
    }

    #[test]
    fn build_output_lines() {
        let report = BuildReport {
            paths: StaticPaths {
                slugs: vec!["toast".into(), "pavlova".into()],
                fallback: Fallback::Placeholder,
            },
            pages: vec![
                page("toast", Some("Toast"), PageStatus::Added),
                page("pavlova", None, PageStatus::Unchanged),
            ],
        };
        let lines = format_build_output(&report);
        assert_eq!(lines[0], "001 Toast → recipes/toast/index.html (added)");
        assert_eq!(lines[1], "002 (no entry) → recipes/pavlova/index.html (unchanged)");
        assert_eq!(
            lines.last().unwrap(),
            "Generated 2 pages: 1 added, 0 updated, 1 unchanged"
        );
    }

    #[test]
    fn revalidate_output_hides_unchanged() {
        let report = RevalidateReport {
            pages: vec![
                page("toast", Some("Toast"), PageStatus::Unchanged),
                page("soup", Some("Soup"), PageStatus::Updated),
            ],
            fresh: 3,
        };
        let lines = format_revalidate_output(&report);
        assert_eq!(lines[0], "001 Soup → recipes/soup/index.html (updated)");
        assert!(lines.iter().all(|l| !l.contains("Toast")));
        assert_eq!(lines.last().unwrap(), "3 fresh pages skipped");
    }

    #[test]
    fn singular_summary() {
        assert_eq!(
            summary(&[page("toast", Some("Toast"), PageStatus::Updated)]),
            "Generated 1 page: 0 added, 1 updated, 0 unchanged"
        );
    }
}
