//! Rendering of cherry-pick suggestions into a pull request comment.
use serde::Serialize;

use crate::{error::Result, release::ReleaseLine};

/// Default suggestion comment template.
pub const DEFAULT_COMMENT_TEMPLATE: &str = r#"
Hello :smile_cat: This PR contains changelog entries. Please, verify the need of backporting it to the following release branches:
{% for entry in entries -%}
{{ entry.revision }} (release {{ entry.release }})
{% endfor %}"#;

/// One suggested cherry-pick target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionEntry {
    /// Revision or branch of the repository in the release.
    pub revision: String,
    /// Release line label, e.g. `3.1.x`.
    pub release: String,
}

/// Ordered cherry-pick targets, newest release first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CherryPickSuggestion {
    pub entries: Vec<SuggestionEntry>,
}

impl CherryPickSuggestion {
    /// Keep the release lines the repository is part of, in order.
    pub fn from_matrix(matrix: Vec<ReleaseLine>) -> Self {
        let entries = matrix
            .into_iter()
            .filter_map(|line| {
                line.revision.map(|revision| SuggestionEntry {
                    revision,
                    release: line.version,
                })
            })
            .collect();

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Renders suggestions with a Tera template.
pub struct SuggestionComposer {
    template: String,
}

impl Default for SuggestionComposer {
    fn default() -> Self {
        Self::new(DEFAULT_COMMENT_TEMPLATE)
    }
}

impl SuggestionComposer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render the comment body for `suggestion`.
    pub fn compose(&self, suggestion: &CherryPickSuggestion) -> Result<String> {
        let context = tera::Context::from_serialize(suggestion)?;
        let body = tera::Tera::one_off(&self.template, &context, false)?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(version: &str, revision: Option<&str>) -> ReleaseLine {
        ReleaseLine {
            version: version.into(),
            revision: revision.map(Into::into),
        }
    }

    #[test]
    fn drops_lines_without_revision() {
        let suggestion = CherryPickSuggestion::from_matrix(vec![
            line("3.1.x", Some("abc123")),
            line("3.0.x", None),
        ]);

        assert_eq!(
            suggestion.entries,
            vec![SuggestionEntry {
                revision: "abc123".into(),
                release: "3.1.x".into(),
            }]
        );
    }

    #[test]
    fn preserves_matrix_order() {
        let suggestion = CherryPickSuggestion::from_matrix(vec![
            line("3.1.x", Some("4.0.x")),
            line("3.0.x", Some("3.7.x")),
            line("2.6.x", Some("2.3.x")),
        ]);

        let releases = suggestion
            .entries
            .iter()
            .map(|e| e.release.as_str())
            .collect::<Vec<_>>();
        assert_eq!(releases, vec!["3.1.x", "3.0.x", "2.6.x"]);
    }

    #[test]
    fn all_missing_is_empty() {
        let suggestion = CherryPickSuggestion::from_matrix(vec![
            line("3.1.x", None),
            line("3.0.x", None),
        ]);
        assert!(suggestion.is_empty());
    }

    #[test]
    fn renders_one_line_per_entry_after_preamble() {
        let suggestion = CherryPickSuggestion::from_matrix(vec![
            line("3.1.x", Some("4.0.x")),
            line("3.0.x", Some("3.7.x")),
        ]);

        let body = SuggestionComposer::default().compose(&suggestion).unwrap();

        assert_eq!(
            body,
            "\nHello :smile_cat: This PR contains changelog entries. Please, \
verify the need of backporting it to the following release branches:\n\
4.0.x (release 3.1.x)\n3.7.x (release 3.0.x)\n"
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let suggestion =
            CherryPickSuggestion::from_matrix(vec![line("3.1.x", Some("a<b"))]);
        let composer = SuggestionComposer::default();

        let first = composer.compose(&suggestion).unwrap();
        let second = composer.compose(&suggestion).unwrap();

        assert_eq!(first, second);
        assert!(first.contains("a<b (release 3.1.x)"));
    }

    #[test]
    fn custom_template_is_used() {
        let composer = SuggestionComposer::new(
            "{% for e in entries %}* {{ e.release }}: {{ e.revision }}\n\
             {% endfor %}",
        );
        let suggestion = CherryPickSuggestion::from_matrix(vec![line(
            "3.1.x",
            Some("4.0.x"),
        )]);

        assert_eq!(composer.compose(&suggestion).unwrap(), "* 3.1.x: 4.0.x\n");
    }

    #[test]
    fn broken_template_is_an_error() {
        let composer = SuggestionComposer::new("{% for e in entries %}");
        let suggestion = CherryPickSuggestion::from_matrix(vec![line(
            "3.1.x",
            Some("4.0.x"),
        )]);

        let err = composer.compose(&suggestion).unwrap_err();

        assert!(matches!(
            err,
            crate::error::AdvisorError::TemplateError(_)
        ));
    }
}
