use crate::data::osm::{ElementKind, RawElement};
use crate::data::rows::{NodeRow, ShapedElement, TagRow, WayNodeRow, WayRow};
use crate::diagnostics::AuditCounters;
use crate::errors::Result;
use crate::normalize::TagNormalizer;

fn attribute(element: &RawElement, name: &str) -> Option<String> {
    element.attribute(name).map(str::to_string)
}

fn shape_tags(
    element: &RawElement,
    id: &str,
    normalizer: &TagNormalizer,
    counters: &mut AuditCounters,
) -> Vec<TagRow> {
    let mut rows = Vec::with_capacity(element.tags.len());
    for tag in &element.tags {
        counters.record_tag_key(&tag.key);
        let Some(normalized) = normalizer.normalize(&tag.key, &tag.value) else {
            counters.record_dropped_key();
            continue;
        };
        if let Some(suffix) = &normalized.street_issue {
            counters.record_street_issue(suffix);
        }
        rows.push(TagRow {
            id: id.to_string(),
            key: normalized.key,
            value: normalized.value,
            tag_type: normalized.tag_type,
        });
    }
    rows
}

/// Turns one element into the rows of its tables, cleaning every tag on the
/// way. Fails only if the element has no `id`.
pub fn shape_element(
    element: &RawElement,
    normalizer: &TagNormalizer,
    counters: &mut AuditCounters,
) -> Result<ShapedElement> {
    let id = element
        .attribute("id")
        .ok_or_else(|| format!("<{}> element without an 'id' attribute", element.kind.as_str()))?
        .to_string();

    let tags = shape_tags(element, &id, normalizer, counters);

    let shaped = match element.kind {
        ElementKind::Node => ShapedElement::Node {
            node: NodeRow {
                id,
                lat: attribute(element, "lat"),
                lon: attribute(element, "lon"),
                user: attribute(element, "user"),
                uid: attribute(element, "uid"),
                version: attribute(element, "version"),
                changeset: attribute(element, "changeset"),
                timestamp: attribute(element, "timestamp"),
            },
            tags,
        },
        ElementKind::Way => {
            let nodes = element.node_refs
                .iter()
                .enumerate()
                .map(|(position, node_id)| WayNodeRow {
                    id: id.clone(),
                    node_id: node_id.clone(),
                    position,
                })
                .collect();
            ShapedElement::Way {
                way: WayRow {
                    id,
                    user: attribute(element, "user"),
                    uid: attribute(element, "uid"),
                    version: attribute(element, "version"),
                    changeset: attribute(element, "changeset"),
                    timestamp: attribute(element, "timestamp"),
                },
                nodes,
                tags,
            }
        },
    };
    Ok(shaped)
}
