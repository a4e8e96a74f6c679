//! Frame layout: turns a grouped inventory into boxed, fixed-width lines
//!
//! Every line produced here has a visible width equal to the terminal width.
//! Nothing in this module touches the terminal.

use super::ansi::{fit, paint, BLUE, BOLD, GREEN, RED, YELLOW};
use super::DisplaySnapshot;
use crate::grouping::{DeviceGroup, GroupedView};
use crate::models::{ConnectionState, NodeRole, PhysicalDevice};
use chrono::{DateTime, Local};
use std::time::Duration;

/// Tree, name, model, status, address, priority, version
pub const BASE_COLUMN_WIDTHS: [usize; 7] = [3, 25, 15, 15, 12, 13, 8];

/// Share of surplus (or deficit) width each column absorbs
const COLUMN_SHARES: [f64; 7] = [0.0, 0.2, 0.1, 0.1, 0.2, 0.1, 0.3];

/// Each column is followed by a ` │ ` gap in the reference layout
const COLUMN_GAP: usize = 3;

/// Below this width the priority column shows the bare number
const PRIORITY_LABEL_MIN_WIDTH: usize = 12;

pub const TITLE: &str = "Physical Devices Monitor";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Static rendering options, fixed for the lifetime of the dashboard
#[derive(Debug, Clone)]
pub struct FrameOptions {
    pub color: bool,
    pub show_timestamp: bool,
    pub poll_interval: Duration,
    pub mgmt_host: String,
    pub stale_after: Duration,
}

/// What the body of the frame shows
#[derive(Debug, Clone, Copy)]
pub enum FrameBody<'a> {
    Data(&'a GroupedView),
    Failed {
        label: &'a str,
        last: Option<&'a DisplaySnapshot>,
    },
}

/// Column widths for a terminal `width` columns wide.
pub fn column_widths(width: usize) -> [usize; 7] {
    let base_total: usize = BASE_COLUMN_WIDTHS.iter().map(|w| w + COLUMN_GAP).sum();
    let extra = width as i64 - base_total as i64;

    let mut widths = [0; 7];
    for (slot, (base, share)) in widths
        .iter_mut()
        .zip(BASE_COLUMN_WIDTHS.iter().zip(COLUMN_SHARES))
    {
        let grown = *base as i64 + (extra as f64 * share) as i64;
        *slot = grown.max(0) as usize;
    }
    widths
}

/// Host part (with port) of a base URL.
pub fn extract_host(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let host = rest.split('/').next().unwrap_or(rest);
    if host.is_empty() {
        url
    } else {
        host
    }
}

/// Render one complete frame.
pub fn render_frame(
    options: &FrameOptions,
    width: usize,
    now: DateTime<Local>,
    body: FrameBody<'_>,
) -> Vec<String> {
    let mut frame = Frame::new(options, width);

    let total = match body {
        FrameBody::Data(view) => view.total_devices,
        FrameBody::Failed { last: Some(snapshot), .. } => snapshot.view.total_devices,
        FrameBody::Failed { last: None, .. } => 0,
    };
    frame.border('┌', '┐');
    frame.title(now, total);
    frame.border('├', '┤');

    match body {
        FrameBody::Data(view) => frame.groups(view),
        FrameBody::Failed { label, last } => {
            let banner = format!("ERROR: {label}");
            let banner = paint(&banner, RED, options.color);
            frame.boxed(&banner);
            frame.boxed("");
            match last {
                Some(snapshot) => {
                    frame.snapshot_heading(snapshot, now);
                    frame.groups(&snapshot.view);
                }
                None => frame.boxed("Waiting for data..."),
            }
        }
    }

    let healthy = !matches!(body, FrameBody::Failed { .. });
    frame.footer(healthy);
    frame.lines
}

struct Frame<'a> {
    options: &'a FrameOptions,
    width: usize,
    columns: [usize; 7],
    lines: Vec<String>,
}

impl<'a> Frame<'a> {
    fn new(options: &'a FrameOptions, width: usize) -> Self {
        Self {
            options,
            width,
            columns: column_widths(width),
            lines: Vec::new(),
        }
    }

    /// Push `body` between two border characters. Only the body is cut, so
    /// both borders survive any width of 2 or more.
    fn enclosed(&mut self, left: char, body: &str, right: char) {
        let line = match self.width {
            0 => String::new(),
            1 => left.to_string(),
            width => format!("{left}{}{right}", fit(body, width - 2)),
        };
        self.lines.push(line);
    }

    fn border(&mut self, left: char, right: char) {
        let rule = "─".repeat(self.width.saturating_sub(2));
        self.enclosed(left, &rule, right);
    }

    fn boxed(&mut self, content: &str) {
        let inner = self.width.saturating_sub(4);
        self.enclosed('│', &format!(" {} ", fit(content, inner)), '│');
    }

    fn title(&mut self, now: DateTime<Local>, total: usize) {
        let mut title = paint(TITLE, BOLD, self.options.color);
        if self.options.show_timestamp {
            title.push_str(&format!(
                " - Last Updated: {} (Total: {})",
                now.format(TIMESTAMP_FORMAT),
                total
            ));
        }
        self.boxed(&title);
    }

    fn snapshot_heading(&mut self, snapshot: &DisplaySnapshot, now: DateTime<Local>) {
        let mut heading = format!(
            "Last known data (from {}):",
            snapshot.taken_at.format(TIMESTAMP_FORMAT)
        );
        if let Some(marker) = self.stale_marker(snapshot.taken_at, now) {
            heading.push(' ');
            heading.push_str(&marker);
        }
        self.boxed(&heading);
    }

    fn stale_marker(&self, taken_at: DateTime<Local>, now: DateTime<Local>) -> Option<String> {
        let age = (now - taken_at).to_std().ok()?;
        if age <= self.options.stale_after {
            return None;
        }
        let age = humantime::format_duration(Duration::from_secs(age.as_secs()));
        Some(paint(&format!("STALE ({age})"), YELLOW, self.options.color))
    }

    fn groups(&mut self, view: &GroupedView) {
        let groups = view.sorted_groups();
        if groups.is_empty() {
            self.boxed("No devices found");
            return;
        }

        self.column_header();
        self.column_separator();
        for (i, group) in groups.into_iter().enumerate() {
            if i > 0 {
                self.boxed("");
            }
            self.group_header(group);
            let last = group.members.len().saturating_sub(1);
            for (j, device) in group.members.iter().enumerate() {
                self.device_row(device, j == last, group.is_cluster);
            }
        }
    }

    fn column_header(&mut self) {
        let c = self.columns;
        self.row([
            fit("", c[0]),
            fit("Device Name", c[1]),
            fit("Model", c[2]),
            fit("Status", c[3]),
            fit("Address", c[4]),
            fit("Priority", c[5]),
            fit("Version", c[6]),
        ]);
    }

    /// Horizontal rule whose `┼` marks line up with the row separators.
    fn column_separator(&mut self) {
        let [tree, name, rest @ ..] = self.columns;
        let mut rule = "─".repeat(tree + name + 3);
        for width in rest {
            rule.push('┼');
            rule.push_str(&"─".repeat(width + 2));
        }

        let span = self.width.saturating_sub(2);
        let mut rule: String = rule.chars().take(span).collect();
        let missing = span - rule.chars().count();
        rule.extend(std::iter::repeat('─').take(missing));
        self.enclosed('├', &rule, '┤');
    }

    fn row(&mut self, cells: [String; 7]) {
        let [tree, name, model, status, address, priority, version] = cells;
        self.boxed(&format!(
            "{tree} {name} │ {model} │ {status} │ {address} │ {priority} │ {version}"
        ));
    }

    fn group_header(&mut self, group: &DeviceGroup) {
        let logical = &group.logical_device;
        let color = self.options.color;

        let mut header = paint(&format!("LOGICAL DEVICE: {}", logical.name), BOLD, color);
        header.push(' ');
        header.push_str(&paint(
            &format!("({})", logical.topology_type.label()),
            BLUE,
            color,
        ));

        let contexts = logical.contexts_label();
        if !contexts.is_empty() {
            header.push_str(&format!(" - Contexts: {contexts}"));
        }
        if group.is_cluster {
            let active = group.active_node().map(|d| d.name.as_str()).unwrap_or("none");
            header.push_str(&format!(
                " - Active: {}, Standby: {}",
                active,
                group.standby.len()
            ));
        }
        self.boxed(&header);
    }

    fn device_row(&mut self, device: &PhysicalDevice, last: bool, in_cluster: bool) {
        let c = self.columns;

        let mut name = device.name.clone();
        if in_cluster {
            if let Some(role) = device.role() {
                name.push_str(" [");
                name.push_str(&paint(role.label(), role_color(role), self.options.color));
                name.push(']');
            }
        }

        let status = paint(
            &fit(device.connection_state.label(), c[3]),
            status_color(device.connection_state),
            self.options.color,
        );

        let priority = match &device.as_node {
            Some(node) if c[5] >= PRIORITY_LABEL_MIN_WIDTH => format!("Priority: {}", node.priority),
            Some(node) => node.priority.to_string(),
            None => "-".to_string(),
        };

        let address: &str = if device.address.is_empty() { "-" } else { &device.address };
        let model: &str = if device.model.is_empty() { "-" } else { &device.model };

        self.row([
            fit(if last { "└─" } else { "├─" }, c[0]),
            fit(&name, c[1]),
            fit(model, c[2]),
            status,
            fit(address, c[4]),
            fit(&priority, c[5]),
            fit(device.version_label(), c[6]),
        ]);
    }

    fn footer(&mut self, healthy: bool) {
        self.border('├', '┤');
        let host = paint(
            &self.options.mgmt_host,
            if healthy { GREEN } else { RED },
            self.options.color,
        );
        self.boxed(&format!(
            "Poll Interval: {} │ Press Ctrl+C to exit │ MGMT: {}",
            humantime::format_duration(self.options.poll_interval),
            host
        ));
        self.border('└', '┘');
    }
}

fn role_color(role: NodeRole) -> &'static str {
    match role {
        NodeRole::Active => GREEN,
        NodeRole::Standby => YELLOW,
        NodeRole::Unspecified => RED,
    }
}

fn status_color(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connected => GREEN,
        ConnectionState::Disconnected => RED,
        ConnectionState::Connecting | ConnectionState::Unspecified => YELLOW,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::group_at;
    use crate::models::DeviceList;
    use crate::display::ansi::{display_width, strip};
    use chrono::TimeZone;
    use devmon_devkit::fixtures::{device_list, DeviceFixture};

    fn options(color: bool) -> FrameOptions {
        FrameOptions {
            color,
            show_timestamp: true,
            poll_interval: Duration::from_secs(5),
            mgmt_host: "mgmt.example:8443".into(),
            stale_after: Duration::from_secs(60),
        }
    }

    fn at(secs: i64) -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn view(fixtures: Vec<DeviceFixture>) -> GroupedView {
        let list: DeviceList = serde_json::from_value(device_list(fixtures)).unwrap();
        group_at(&list.physical_devices, at(0))
    }

    fn sample() -> GroupedView {
        view(vec![
            DeviceFixture::new("pd-1", "fw-a", "L1", "zeta-edge").clustered().active(1),
            DeviceFixture::new("pd-2", "fw-b", "L1", "zeta-edge").clustered().standby(2),
            DeviceFixture::new("pd-3", "very-long-device-name-1234", "L2", "alpha-branch")
                .model("FG-100F")
                .address("10.0.0.3")
                .version("7.4.1"),
            DeviceFixture::new("pd-4", "fw-d", "L2", "alpha-branch").disconnected(),
        ])
    }

    fn plain(lines: &[String]) -> Vec<String> {
        lines.iter().map(|l| strip(l)).collect()
    }

    #[test]
    fn test_column_widths() {
        assert_eq!(column_widths(112), BASE_COLUMN_WIDTHS);
        assert_eq!(column_widths(122), [3, 27, 16, 16, 14, 14, 11]);
        let narrow = column_widths(80);
        assert_eq!(narrow[1], 19);
        assert_eq!(narrow[6], 0);
        assert_eq!(column_widths(0)[0], 3);
    }

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host("https://10.1.1.1:8443/api/v2/"), "10.1.1.1:8443");
        assert_eq!(extract_host("http://mgmt/api/"), "mgmt");
        assert_eq!(extract_host("mgmt.local/api/"), "mgmt.local");
    }

    #[test]
    fn test_long_name_truncated_at_80_columns() {
        let view = sample();
        let lines = plain(&render_frame(&options(false), 80, at(1), FrameBody::Data(&view)));
        assert!(lines.iter().any(|l| l.contains("very-long-device...")));
        assert!(!lines.iter().any(|l| l.contains("very-long-device-name-1234")));
    }

    #[test]
    fn test_every_line_spans_the_terminal() {
        let view = sample();
        let snapshot = DisplaySnapshot { view: view.clone(), taken_at: at(0) };
        for color in [false, true] {
            let opts = options(color);
            for width in [0, 1, 3, 4, 10, 40, 80, 112, 120, 200] {
                let bodies = [
                    FrameBody::Data(&view),
                    FrameBody::Failed { label: "Connection refused", last: Some(&snapshot) },
                    FrameBody::Failed { label: "Connection refused", last: None },
                ];
                for body in bodies {
                    for line in render_frame(&opts, width, at(300), body) {
                        assert_eq!(display_width(&line), width, "width {width} line {line:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_frame_structure() {
        let view = sample();
        let lines = plain(&render_frame(&options(false), 120, at(1), FrameBody::Data(&view)));

        assert!(lines[0].starts_with('┌') && lines[0].ends_with('┐'));
        assert!(lines[1].contains("Physical Devices Monitor - Last Updated: "));
        assert!(lines[1].contains("(Total: 4)"));
        assert!(lines[3].contains("Device Name") && lines[3].contains("Version"));
        assert!(lines[4].contains('┼'));
        assert!(lines.last().unwrap().starts_with('└'));

        let footer = &lines[lines.len() - 2];
        assert!(footer.contains("Poll Interval: 5s │ Press Ctrl+C to exit │ MGMT: mgmt.example:8443"));
    }

    #[test]
    fn test_separator_aligns_with_rows() {
        let view = sample();
        let lines = plain(&render_frame(&options(false), 140, at(1), FrameBody::Data(&view)));
        let header: Vec<char> = lines[3].chars().collect();
        let separator: Vec<char> = lines[4].chars().collect();
        for (i, ch) in header.iter().enumerate().skip(1).take(header.len() - 2) {
            if *ch == '│' {
                assert_eq!(separator[i], '┼', "column {i}");
            }
        }
    }

    #[test]
    fn test_groups_sorted_and_annotated() {
        let view = sample();
        let lines = plain(&render_frame(&options(false), 160, at(1), FrameBody::Data(&view)));

        let alpha = lines.iter().position(|l| l.contains("LOGICAL DEVICE: alpha-branch")).unwrap();
        let zeta = lines.iter().position(|l| l.contains("LOGICAL DEVICE: zeta-edge")).unwrap();
        assert!(alpha < zeta);
        assert!(lines[zeta - 1].trim_matches(|c| c == '│' || c == ' ').is_empty());

        assert!(lines[zeta].contains("(ACTIVE_STANDBY)"));
        assert!(lines[zeta].contains("Active: fw-a, Standby: 1"));
        assert!(lines[alpha].contains("(STANDALONE)"));
        assert!(!lines[alpha].contains("Active:"));

        assert!(lines[zeta + 1].starts_with("│ ├─") && lines[zeta + 1].contains("fw-a [ACTIVE]"));
        assert!(lines[zeta + 2].starts_with("│ └─") && lines[zeta + 2].contains("fw-b [STANDBY]"));
        assert!(lines[zeta + 1].contains("Priority: 1"));
        assert!(lines[alpha + 2].contains("DISCONNECTED"));
    }

    #[test]
    fn test_short_priority_on_narrow_terminal() {
        let view = sample();
        let lines = plain(&render_frame(&options(false), 90, at(1), FrameBody::Data(&view)));
        let row = lines.iter().find(|l| l.contains("fw-a [ACTIVE]")).unwrap();
        assert!(!row.contains("Priority:"));
    }

    #[test]
    fn test_colors_follow_state() {
        let view = sample();
        let lines = render_frame(&options(true), 160, at(1), FrameBody::Data(&view));
        let active = lines.iter().find(|l| strip(l).contains("fw-a [ACTIVE]")).unwrap();
        assert!(active.contains(&format!("{GREEN}ACTIVE")));
        let standby = lines.iter().find(|l| strip(l).contains("fw-b [STANDBY]")).unwrap();
        assert!(standby.contains(&format!("{YELLOW}STANDBY")));
        let footer = &lines[lines.len() - 2];
        assert!(footer.contains(&format!("{GREEN}mgmt.example:8443")));

        let off = render_frame(&options(false), 160, at(1), FrameBody::Data(&view));
        assert!(off.iter().all(|l| !l.contains('\x1b')));
    }

    #[test]
    fn test_empty_and_waiting() {
        let empty = view(vec![]);
        let lines = plain(&render_frame(&options(false), 80, at(1), FrameBody::Data(&empty)));
        assert!(lines.iter().any(|l| l.contains("No devices found")));
        assert!(lines[1].contains("(Total: 0)"));

        let body = FrameBody::Failed { label: "Connection refused", last: None };
        let lines = plain(&render_frame(&options(false), 80, at(1), body));
        assert!(lines.iter().any(|l| l.contains("Waiting for data...")));
        assert!(lines[1].contains("(Total: 0)"));
    }

    #[test]
    fn test_borders_survive_narrow_widths() {
        let view = sample();
        for width in 2..=12 {
            let lines = plain(&render_frame(&options(false), width, at(1), FrameBody::Data(&view)));
            for line in &lines {
                let first = line.chars().next().unwrap();
                let last = line.chars().last().unwrap();
                assert!("┌├│└".contains(first), "width {width} line {line:?}");
                assert!("┐┤│┘".contains(last), "width {width} line {line:?}");
                assert!(!line.ends_with("..."), "width {width} line {line:?}");
            }
        }

        let lines = plain(&render_frame(&options(false), 1, at(1), FrameBody::Data(&view)));
        assert!(lines.iter().all(|l| l.chars().count() == 1));
    }

    #[test]
    fn test_timestamp_can_be_hidden() {
        let mut opts = options(false);
        opts.show_timestamp = false;
        let empty = view(vec![]);
        let lines = plain(&render_frame(&opts, 80, at(1), FrameBody::Data(&empty)));
        assert!(lines[1].contains(TITLE));
        assert!(!lines[1].contains("Last Updated"));
    }

    #[test]
    fn test_failure_keeps_last_snapshot() {
        let view = sample();
        let snapshot = DisplaySnapshot { view, taken_at: at(0) };
        let body = FrameBody::Failed { label: "Connection refused", last: Some(&snapshot) };

        let colored = render_frame(&options(true), 120, at(10), body);
        let footer = &colored[colored.len() - 2];
        assert!(footer.contains(&format!("{RED}mgmt.example:8443")));

        let lines = plain(&colored);
        assert!(lines[3].contains("ERROR: Connection refused"));
        assert!(lines[4].trim_matches(|c| c == '│' || c == ' ').is_empty());
        assert!(lines[5].contains("Last known data (from "));
        assert!(!lines[5].contains("STALE"));
        assert!(lines.iter().any(|l| l.contains("fw-a [ACTIVE]")));
        assert!(lines[1].contains("(Total: 4)"));
    }

    #[test]
    fn test_stale_marker_after_threshold() {
        let snapshot = DisplaySnapshot { view: sample(), taken_at: at(0) };
        let body = FrameBody::Failed { label: "Connection timeout", last: Some(&snapshot) };
        let lines = plain(&render_frame(&options(false), 120, at(120), body));
        assert!(lines[5].contains("STALE (2m)"));
    }
}
