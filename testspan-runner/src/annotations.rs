// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording span attributes through test annotations.
//!
//! A test can attach an annotation whose type is `otel:<name>`; the reporter
//! records it on the test span as the attribute `<name>`, with the
//! annotation's description as the value.

use crate::{model::Annotation, reporter::SpanAttribute};
use tracing::debug;

/// Prefix marking annotations that become span attributes.
pub const ANNOTATION_PREFIX: &str = "otel:";

/// Returns the annotation type that records the attribute `name`.
pub fn annotation_label(name: &str) -> String {
    format!("{ANNOTATION_PREFIX}{name}")
}

/// Returns the attributes recorded by `annotations`, in order.
///
/// Annotations without the prefix are ignored. A missing description is
/// recorded as an empty string.
pub(crate) fn annotation_attributes(
    annotations: &[Annotation],
) -> impl Iterator<Item = SpanAttribute> + '_ {
    annotations.iter().filter_map(|annotation| {
        let name = annotation.ty.strip_prefix(ANNOTATION_PREFIX)?;
        if name.is_empty() {
            debug!(ty = %annotation.ty, "ignoring annotation with an empty attribute name");
            return None;
        }
        Some(SpanAttribute::new(
            name.to_owned(),
            annotation.description.as_deref().unwrap_or_default(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_prefixed_annotations_are_recorded() {
        let annotations = vec![
            Annotation::new("issue", Some("https://example.com/1".to_owned())),
            Annotation::new(annotation_label("team"), Some("payments".to_owned())),
            Annotation::new("skip", None),
            Annotation::new(annotation_label("browser.channel"), None),
            Annotation::new(ANNOTATION_PREFIX, Some("no name".to_owned())),
            Annotation::new("xotel:team", Some("ignored".to_owned())),
        ];

        assert_eq!(
            annotation_attributes(&annotations).collect::<Vec<_>>(),
            vec![
                SpanAttribute::new("team", "payments"),
                SpanAttribute::new("browser.channel", ""),
            ],
        );
    }

    #[test]
    fn label_has_prefix() {
        assert_eq!(annotation_label("team"), "otel:team");
    }
}
