//! SOAP envelope for EWS requests

use crate::xml::Element;

/// Schema version announced to the server
pub const DEFAULT_SERVER_VERSION: &str = "Exchange2010";

/// Wrap an operation element in a SOAP envelope.
///
/// ```xml
/// <s:Envelope>
///   <s:Header><t:RequestServerVersion Version="Exchange2010"/></s:Header>
///   <s:Body>{body}</s:Body>
/// </s:Envelope>
/// ```
pub fn wrap(body: Element, server_version: &str) -> Element {
    Element::s("Envelope")
        .with_child(
            Element::s("Header").with_child(Element::t("RequestServerVersion").with_attr("Version", server_version)),
        )
        .with_child(Element::s("Body").with_child(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BaseShape;
    use crate::request::get_item;

    #[test]
    fn test_wrap_get_item() {
        let envelope = wrap(get_item("AAMk", BaseShape::IdOnly), DEFAULT_SERVER_VERSION);

        let version = envelope.find("s:Header/t:RequestServerVersion").unwrap();
        assert_eq!(version.attr("Version"), Some("Exchange2010"));

        let body = envelope.find("s:Body/m:GetItem/m:ItemIds/t:ItemId").unwrap();
        assert_eq!(body.attr("Id"), Some("AAMk"));
    }

    #[test]
    fn test_wrap_declares_all_prefixes_once() {
        let xml = wrap(get_item("AAMk", BaseShape::IdOnly), "Exchange2010_SP2")
            .to_xml_string()
            .unwrap();
        assert!(xml.starts_with("<s:Envelope xmlns:s="));
        assert_eq!(xml.matches("xmlns:s=").count(), 1);
        assert_eq!(xml.matches("xmlns:m=").count(), 1);
        assert_eq!(xml.matches("xmlns:t=").count(), 1);
        assert!(xml.contains(r#"<t:RequestServerVersion Version="Exchange2010_SP2"/>"#));
    }
}
