// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};

use console::style;

use super::Renderable;
use super::common::write_grouped;
use crate::cli::OutputContext;
use crate::commands::types::PullsResult;

impl Renderable for PullsResult {
    fn render_text(&self, w: &mut dyn Write, _ctx: &OutputContext) -> io::Result<()> {
        writeln!(w)?;
        if self.total_count == 0 {
            writeln!(
                w,
                "{} No matching pull requests in {}",
                style("!").yellow().bold(),
                style(&self.repository).cyan()
            )?;
            return Ok(());
        }

        writeln!(
            w,
            "{} {} pull request(s) in {}",
            style("*").green().bold(),
            self.total_count,
            style(&self.repository).cyan()
        )?;
        writeln!(w)?;
        write_grouped(w, &self.pull_requests)
    }
}
