// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};

use console::style;

use super::Renderable;
use crate::cli::OutputContext;
use crate::commands::types::TransitionResult;

impl Renderable for TransitionResult {
    fn render_text(&self, w: &mut dyn Write, _ctx: &OutputContext) -> io::Result<()> {
        writeln!(
            w,
            "{} Transitioned {} with transition {}",
            style("*").green().bold(),
            style(&self.issue_id).cyan(),
            style(&self.transition_id).cyan()
        )
    }
}
