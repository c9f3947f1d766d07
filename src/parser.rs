//! SIRI situation-exchange parser for the subway service status feed.

use std::collections::BTreeSet;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::ParseError;
use crate::lines::{LineCatalog, LineId};

/// Namespace of every element the parser looks at.
pub const SIRI_NS: &str = "http://www.siri.org.uk/siri";

/// Feed-specific strings used while extracting delayed lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFormat {
    /// Prefix the vendor puts in front of every `LineRef`.
    pub vendor_prefix: String,
    /// `Summary` value that marks a situation as an active delay.
    pub delay_indicator: String,
}

impl Default for FeedFormat {
    fn default() -> Self {
        Self {
            vendor_prefix: "MTA NYCT_".to_string(),
            delay_indicator: "Delays".to_string(),
        }
    }
}

/// Extracts the set of delayed lines from a raw SIRI document.
///
/// Only situations whose `Summary` equals [`FeedFormat::delay_indicator`]
/// count; planned work and other partial degradations are ignored. Line
/// references that do not resolve against `catalog` are dropped.
///
/// # Errors
///
/// Returns [`ParseError`] if the bytes are not UTF-8 XML, or the document
/// lacks the `Siri/ServiceDelivery/SituationExchangeDelivery` skeleton.
pub fn parse_delayed_lines(
    bytes: &[u8],
    format: &FeedFormat,
    catalog: &LineCatalog,
) -> Result<BTreeSet<LineId>, ParseError> {
    let text = std::str::from_utf8(bytes)?;
    let doc = Document::parse(text)?;

    let root = doc.root_element();
    if !is_siri(root, "Siri") {
        return Err(ParseError::MissingElement("Siri"));
    }
    let delivery =
        first_child(root, "ServiceDelivery").ok_or(ParseError::MissingElement("ServiceDelivery"))?;
    let exchange = first_child(delivery, "SituationExchangeDelivery")
        .ok_or(ParseError::MissingElement("SituationExchangeDelivery"))?;

    let mut delayed = BTreeSet::new();
    let situations = children(exchange, "Situations")
        .flat_map(|node| children(node, "PtSituationElement"));

    for situation in situations {
        let summary = first_child(situation, "Summary").and_then(|node| node.text());
        if summary != Some(format.delay_indicator.as_str()) {
            continue;
        }

        let journeys = children(situation, "Affects")
            .flat_map(|node| children(node, "VehicleJourneys"))
            .flat_map(|node| children(node, "AffectedVehicleJourney"));

        for journey in journeys {
            let Some(raw) = first_child(journey, "LineRef").and_then(|node| node.text()) else {
                continue;
            };
            let code = strip_line_ref(raw, &format.vendor_prefix);
            if code.is_empty() {
                continue;
            }
            match catalog.resolve(code) {
                Ok(line) => {
                    delayed.insert(line);
                }
                Err(_) => debug!(line_ref = raw, "Ignoring unknown line reference"),
            }
        }
    }

    Ok(delayed)
}

fn strip_line_ref<'a>(raw: &'a str, prefix: &str) -> &'a str {
    let trimmed = raw.trim();
    trimmed.strip_prefix(prefix).unwrap_or(trimmed).trim()
}

fn is_siri(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(SIRI_NS)
}

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| is_siri(*child, name))
}

fn first_child<'a, 'input>(node: Node<'a, 'input>, name: &'static str) -> Option<Node<'a, 'input>> {
    children(node, name).next()
}
