use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::common::error::{ImportError, Result};
use crate::feed::model::FeedNode;

/// Decodes a raw XML feed into the listing nodes under
/// `ListingDataFeed/Listings`. Tag and attribute names are reduced to their
/// local part, so `ns:Title` and `Title` are interchangeable downstream. An
/// empty `Listings` container is a valid feed with zero listings.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedNode>> {
    let (root_name, root) = parse_document(xml)?;

    if root_name != "ListingDataFeed" {
        return Err(ImportError::parse(format!(
            "expected ListingDataFeed root element, found '{root_name}'"
        )));
    }

    let listings = root
        .child("Listings")
        .ok_or_else(|| ImportError::parse("feed has no Listings container"))?;

    Ok(listings.children_named("Listing").cloned().collect())
}

/// Builds the full element tree for the document, returning the root element
/// with its local name.
fn parse_document(xml: &str) -> Result<(String, FeedNode)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(String, FeedNode)> = Vec::new();
    let mut root: Option<(String, FeedNode)> = None;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(start) => {
                let name = local_name(start.name().local_name().as_ref());
                let node = FeedNode::new(read_attributes(&start)?);
                stack.push((name, node));
            }
            Event::Empty(start) => {
                let name = local_name(start.name().local_name().as_ref());
                let node = FeedNode::new(read_attributes(&start)?);
                attach(&mut stack, &mut root, name, node)?;
            }
            Event::Text(text) => {
                if let Some((_, top)) = stack.last_mut() {
                    top.append_text(&text.unescape().map_err(xml_err)?);
                }
            }
            Event::CData(cdata) => {
                if let Some((_, top)) = stack.last_mut() {
                    top.append_text(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::End(end) => {
                let closing = local_name(end.name().local_name().as_ref());
                let (name, node) = stack
                    .pop()
                    .ok_or_else(|| ImportError::parse("closing tag without an open element"))?;
                if name != closing {
                    return Err(ImportError::parse(format!(
                        "mismatched closing tag: expected </{name}>, found </{closing}>"
                    )));
                }
                attach(&mut stack, &mut root, name, node)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes
            // carry no listing data.
            _ => {}
        }
    }

    if let Some((name, _)) = stack.last() {
        return Err(ImportError::parse(format!(
            "document ended with unclosed element <{name}>"
        )));
    }

    root.ok_or_else(|| ImportError::parse("document has no root element"))
}

fn attach(
    stack: &mut [(String, FeedNode)],
    root: &mut Option<(String, FeedNode)>,
    name: String,
    node: FeedNode,
) -> Result<()> {
    match stack.last_mut() {
        Some((_, parent)) => parent.push_child(name, node),
        None if root.is_none() => *root = Some((name, node)),
        None => {
            return Err(ImportError::parse(
                "document has more than one root element",
            ))
        }
    }
    Ok(())
}

fn read_attributes(start: &quick_xml::events::BytesStart<'_>) -> Result<HashMap<String, String>> {
    let mut attributes = HashMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = local_name(attr.key.local_name().as_ref());
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn xml_err(err: impl std::fmt::Display) -> ImportError {
    ImportError::parse(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::model::FieldValue;

    #[test]
    fn parses_listings_with_namespace_prefixes() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <x:ListingDataFeed xmlns:x="urn:feed">
              <x:Listings>
                <x:Listing>
                  <x:Title>Casa com 2 vagas de garagem</x:Title>
                  <x:ListingID>AB-123</x:ListingID>
                </x:Listing>
              </x:Listings>
            </x:ListingDataFeed>"#;

        let listings = parse_feed(xml).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(
            listings[0].field("Title").text(),
            Some("Casa com 2 vagas de garagem")
        );
        assert_eq!(listings[0].field("ListingID").text(), Some("AB-123"));
    }

    #[test]
    fn preserves_attributes_next_to_text_content() {
        let xml = r#"<ListingDataFeed><Listings><Listing>
              <Details>
                <ListPrice currency="BRL">450000</ListPrice>
              </Details>
            </Listing></Listings></ListingDataFeed>"#;

        let listings = parse_feed(xml).unwrap();
        let details = listings[0].child("Details").unwrap();
        match details.field("ListPrice") {
            FieldValue::Attributed { text, attributes } => {
                assert_eq!(text, Some("450000"));
                assert_eq!(attributes.get("currency").map(String::as_str), Some("BRL"));
            }
            other => panic!("expected attributed price, got {other:?}"),
        }
    }

    #[test]
    fn empty_listings_container_is_a_valid_feed() {
        let xml = "<ListingDataFeed><Listings></Listings></ListingDataFeed>";
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = parse_feed("<ListingDataFeed><Listings>").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn mismatched_tags_are_a_parse_error() {
        let err =
            parse_feed("<ListingDataFeed><Listings></Wrong></ListingDataFeed>").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn unexpected_root_is_a_parse_error() {
        let err = parse_feed("<SomethingElse><Listings/></SomethingElse>").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
        assert!(err.to_string().contains("ListingDataFeed"));
    }

    #[test]
    fn missing_listings_container_is_a_parse_error() {
        let err = parse_feed("<ListingDataFeed></ListingDataFeed>").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
        assert!(err.to_string().contains("Listings"));
    }

    #[test]
    fn cdata_titles_survive() {
        let xml = r#"<ListingDataFeed><Listings><Listing>
              <Title><![CDATA[Apartamento & vista]]></Title>
            </Listing></Listings></ListingDataFeed>"#;

        let listings = parse_feed(xml).unwrap();
        assert_eq!(
            listings[0].field("Title").text(),
            Some("Apartamento & vista")
        );
    }
}
