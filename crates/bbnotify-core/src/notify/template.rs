// SPDX-License-Identifier: Apache-2.0

//! HTML rendering of grouped pull requests.
//!
//! Templates are `minijinja` (Jinja2) sources rendered with HTML
//! auto-escaping. The context holds one variable:
//!
//! - `groups` - list of `{ branch, pullRequests }` in first-seen order, each
//!   pull request shaped as `{ title, ticketId, ticketUrl, pullRequestUrl,
//!   author: { displayName, profileUrl } }`
//!
//! # Example Template
//!
//! ```jinja2
//! {% for group in groups %}
//! <h2>{{ group.branch }}</h2>
//! {% for pr in group.pullRequests %}
//! <p><a href="{{ pr.pullRequestUrl }}">{{ pr.title }}</a></p>
//! {% endfor %}
//! {% endfor %}
//! ```

use minijinja::{AutoEscape, Environment, UndefinedBehavior, context};

use crate::bitbucket::GroupedPullRequests;
use crate::error::NotifyError;

/// Built-in template: one table section per destination branch.
pub const DEFAULT_TEMPLATE: &str = r#"<table cellspacing="0" cellpadding="10" style="border-collapse: collapse;font-family: Arial, Helvetica, sans-serif;border: 1px solid #999;text-align: left;">
{% for group in groups %}
  <thead>
    <tr>
      <th colspan="2" style="font-size: 19px;background: #666;border: 1px solid #666;color: #fff;">{{ group.branch }}</th>
      <th style="font-size: 19px;background: #666;border: 1px solid #666;color: #fff;">Author</th>
    </tr>
  </thead>
  <tbody>
  {% for pr in group.pullRequests %}
    <tr>
      <td style="border: 1px solid #999;" valign="top"><a href="{{ pr.ticketUrl }}">{{ pr.ticketId or "-" }}</a></td>
      <td style="border: 1px solid #999;" valign="top"><a href="{{ pr.pullRequestUrl }}">{{ pr.title }}</a></td>
      <td style="border: 1px solid #999;" valign="top"><a href="{{ pr.author.profileUrl }}">{{ pr.author.displayName }}</a></td>
    </tr>
  {% endfor %}
  </tbody>
{% endfor %}
</table>
"#;

/// Renders `grouped` with `template`, or [`DEFAULT_TEMPLATE`] when `None`.
///
/// # Errors
///
/// Returns [`NotifyError::Template`] if the template has syntax errors or
/// references undefined variables.
pub fn render_html(grouped: &GroupedPullRequests, template: Option<&str>) -> Result<String, NotifyError> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    env.add_template("email", template.unwrap_or(DEFAULT_TEMPLATE))
        .map_err(|e| NotifyError::Template {
            message: format!("invalid template syntax: {e}"),
        })?;

    let tmpl = env.get_template("email").map_err(|e| NotifyError::Template {
        message: format!("failed to retrieve template: {e}"),
    })?;

    tmpl.render(context! { groups => grouped.groups() })
        .map_err(|e| NotifyError::Template {
            message: format!("template rendering failed: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbucket::{Author, SerializedPullRequest};

    fn grouped() -> GroupedPullRequests {
        let mut grouped = GroupedPullRequests::new();
        grouped.push(
            "develop",
            SerializedPullRequest {
                title: "FOO-1 <Fix> parser".to_string(),
                ticket_id: Some("FOO-1".to_string()),
                ticket_url: "https://foo.atlassian.net/browse/FOO-1".to_string(),
                pull_request_url: "https://bitbucket.org/team/project/pull-requests/7".to_string(),
                author: Author {
                    display_name: "Jane Doe".to_string(),
                    profile_url: "https://bitbucket.org/jane".to_string(),
                },
            },
        );
        grouped.push(
            "master",
            SerializedPullRequest {
                title: "Release".to_string(),
                ticket_id: None,
                ticket_url: "#".to_string(),
                pull_request_url: "https://bitbucket.org/team/project/pull-requests/8".to_string(),
                author: Author {
                    display_name: "John Roe".to_string(),
                    profile_url: "https://bitbucket.org/john".to_string(),
                },
            },
        );
        grouped
    }

    #[test]
    fn test_default_template_renders_every_branch() {
        let html = render_html(&grouped(), None).unwrap();

        assert!(html.find("develop").unwrap() < html.find("master").unwrap());
        assert!(html.contains(">FOO-1</a>"));
        assert!(html.contains("foo.atlassian.net"));
        assert!(html.contains("Jane Doe"));
        assert!(html.contains(r##"<a href="#">-</a>"##));
    }

    #[test]
    fn test_titles_are_escaped() {
        let html = render_html(&grouped(), None).unwrap();
        assert!(html.contains("FOO-1 &lt;Fix&gt; parser"));
    }

    #[test]
    fn test_custom_template() {
        let html = render_html(
            &grouped(),
            Some("{% for g in groups %}[{{ g.branch }}:{{ g.pullRequests | length }}]{% endfor %}"),
        )
        .unwrap();
        assert_eq!(html, "[develop:1][master:1]");
    }

    #[test]
    fn test_syntax_error() {
        let result = render_html(&grouped(), Some("{% for g in groups %}"));
        assert!(matches!(result, Err(NotifyError::Template { .. })));
    }

    #[test]
    fn test_undefined_variable() {
        let result = render_html(&grouped(), Some("{{ nothing.here }}"));
        assert!(matches!(result, Err(NotifyError::Template { .. })));
    }
}
