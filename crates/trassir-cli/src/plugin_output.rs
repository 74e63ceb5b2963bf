use trassir_core::{CheckReport, Status};

/// Renders a report in the Nagios plugin format: one line per finding, then an
/// optional `| ` perfdata line.
pub fn render(report: &CheckReport) -> String {
    let mut lines: Vec<String> = report.findings.clone();

    if lines.is_empty() {
        lines.push(match report.status {
            Status::Ok => "OK: No problems detected.".to_string(),
            status => format!("{status}: Inconsistent output."),
        });
    }

    if !report.metrics.is_empty() {
        let perfdata = report
            .metrics
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("| {perfdata}"));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
