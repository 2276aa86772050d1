use console::style;
use repowatch::{ChangeKind, ChangeReport, RepositoryChange};

use super::limits::OutputFormat;

/// One row of the change table.
#[derive(Debug, Clone, tabled::Tabled)]
pub(crate) struct ChangeRow {
    #[tabled(rename = "Repository")]
    pub repository: String,
    #[tabled(rename = "Change")]
    pub kind: String,
    #[tabled(rename = "Stars +")]
    pub stars_added: String,
    #[tabled(rename = "Stars -")]
    pub stars_removed: String,
    #[tabled(rename = "New Issues")]
    pub new_issues: u64,
    #[tabled(rename = "Forks")]
    pub forks_delta: String,
}

fn kind_label(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Added => "added",
        ChangeKind::Removed => "removed",
        ChangeKind::Updated => "updated",
    }
}

/// Logins, truncated after a handful.
fn logins(names: &[String]) -> String {
    const SHOWN: usize = 3;
    match names.len() {
        0 => String::new(),
        n if n <= SHOWN => names.join(", "),
        n => format!("{} (+{} more)", names[..SHOWN].join(", "), n - SHOWN),
    }
}

impl From<&RepositoryChange> for ChangeRow {
    fn from(change: &RepositoryChange) -> Self {
        Self {
            repository: change.repository.clone(),
            kind: kind_label(change.kind).to_string(),
            stars_added: logins(&change.stargazers_added),
            stars_removed: logins(&change.stargazers_removed),
            new_issues: change.new_issues,
            forks_delta: format!("{:+}", change.forks_delta),
        }
    }
}

pub(crate) fn print_report(
    report: &ChangeReport,
    format: OutputFormat,
) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(report)?);
        }
        OutputFormat::Table => {
            let heading = format!(
                "{} changed of {} repositories at {}",
                report.changes.len(),
                report.repositories,
                report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            if report.is_empty() {
                println!("{}", style(heading).dim());
                return Ok(());
            }
            println!("{}", style(heading).bold());
            let rows: Vec<ChangeRow> = report.changes.iter().map(ChangeRow::from).collect();
            let mut table = tabled::Table::new(rows);
            table.with(tabled::settings::Style::rounded());
            println!("{}", table);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(added: &[&str], forks_delta: i64) -> RepositoryChange {
        RepositoryChange {
            repository: "widgets".to_string(),
            kind: ChangeKind::Updated,
            stargazers_added: added.iter().map(|s| s.to_string()).collect(),
            stargazers_removed: Vec::new(),
            new_issues: 2,
            forks_delta,
        }
    }

    #[test]
    fn row_formats_signed_fork_delta() {
        assert_eq!(ChangeRow::from(&change(&[], 3)).forks_delta, "+3");
        assert_eq!(ChangeRow::from(&change(&[], -2)).forks_delta, "-2");
        assert_eq!(ChangeRow::from(&change(&[], 0)).forks_delta, "+0");
    }

    #[test]
    fn row_truncates_long_login_lists() {
        let row = ChangeRow::from(&change(&["a", "b", "c", "d", "e"], 0));
        assert_eq!(row.stars_added, "a, b, c (+2 more)");
        assert_eq!(row.kind, "updated");

        let row = ChangeRow::from(&change(&["a", "b"], 0));
        assert_eq!(row.stars_added, "a, b");
        assert_eq!(row.stars_removed, "");
    }
}
