// SPDX-License-Identifier: Apache-2.0

//! Display helpers shared by several renderers.

use std::io::{self, Write};

use bbnotify_core::GroupedPullRequests;
use console::style;

use crate::table::TablePrinter;

/// Writes one aligned section per destination branch.
///
/// Columns are ticket id (`-` when none), title and author.
pub fn write_grouped(w: &mut dyn Write, grouped: &GroupedPullRequests) -> io::Result<()> {
    for group in grouped.groups() {
        writeln!(
            w,
            "{} {}",
            style(&group.branch).cyan().bold(),
            style(format!("({})", group.pull_requests.len())).dim()
        )?;

        let mut table = TablePrinter::new(3);
        for pr in &group.pull_requests {
            table.add_row(&[
                pr.ticket_id.as_deref().unwrap_or("-"),
                &pr.title,
                &pr.author.display_name,
            ]);
        }
        write!(w, "{}", table.render(2))?;
        writeln!(w)?;
    }
    Ok(())
}

/// Writes a yellow notice that an operation was skipped.
pub fn show_dry_run_message(w: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(w, "{}", style(message).yellow())
}
