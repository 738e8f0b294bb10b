// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};

use console::style;

use super::Renderable;
use super::common::{show_dry_run_message, write_grouped};
use crate::cli::OutputContext;
use crate::commands::types::NotifyResult;

impl Renderable for NotifyResult {
    fn render_text(&self, w: &mut dyn Write, ctx: &OutputContext) -> io::Result<()> {
        let report = &self.report;
        writeln!(w)?;
        if report.grouped.is_empty() {
            writeln!(
                w,
                "{} No merged pull requests found, nothing sent",
                style("!").yellow().bold()
            )?;
            return Ok(());
        }

        write_grouped(w, &report.grouped)?;

        if self.dry_run {
            show_dry_run_message(w, "Dry run - email not sent.")?;
            if ctx.verbose
                && let Some(html) = &report.html
            {
                writeln!(w)?;
                writeln!(w, "{html}")?;
            }
            return Ok(());
        }

        if let Some(id) = &report.message_id {
            writeln!(
                w,
                "{} Email sent {}",
                style("*").green().bold(),
                style(format!("(id {id})")).dim()
            )?;
        }

        if self.transitions_declined {
            show_dry_run_message(w, "Tickets not transitioned.")?;
        }
        for outcome in &report.transitioned {
            match &outcome.error {
                None => writeln!(
                    w,
                    "{} Transitioned {}",
                    style("*").green().bold(),
                    style(&outcome.issue_id).cyan()
                )?,
                Some(error) => writeln!(
                    w,
                    "{} Could not transition {}: {error}",
                    style("!").red().bold(),
                    style(&outcome.issue_id).cyan()
                )?,
            }
        }
        Ok(())
    }
}
