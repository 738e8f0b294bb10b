// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};

use console::style;

use super::Renderable;
use crate::cli::OutputContext;
use crate::commands::types::AuthResult;

impl Renderable for AuthResult {
    fn render_text(&self, w: &mut dyn Write, _ctx: &OutputContext) -> io::Result<()> {
        let what = match self.action {
            "obtain" => "Obtained a new Bitbucket token pair",
            _ => "Refreshed the Bitbucket access token",
        };
        writeln!(w, "{} {what}", style("*").green().bold())?;
        writeln!(w, "  Saved to: {}", style(&self.config_path).cyan())?;
        Ok(())
    }
}
