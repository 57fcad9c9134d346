//! EWS calendar request builders
//!
//! Each builder is a pure function from domain objects to an [`Element`]
//! tree rooted at the EWS operation element (`m:GetItem`, `m:CreateItem`,
//! `m:DeleteItem`, `m:UpdateItem`). Wrap the result with
//! [`crate::soap::wrap`] before sending it.

use crate::datetime::format_exchange_datetime;
use crate::error::{CalendarError, Result};
use crate::models::{Attendee, BaseShape, CalendarEvent, ItemField, UpdateRequest};
use crate::xml::Element;
use tracing::debug;

/// FieldURI values from the EWS 2010 schema
pub mod field_uri {
    pub const BODY: &str = "item:Body";
    pub const SUBJECT: &str = "item:Subject";
    pub const START: &str = "calendar:Start";
    pub const END: &str = "calendar:End";
    pub const LOCATION: &str = "calendar:Location";
    pub const REQUIRED_ATTENDEES: &str = "calendar:RequiredAttendees";
    pub const OPTIONAL_ATTENDEES: &str = "calendar:OptionalAttendees";
    pub const RESOURCES: &str = "calendar:Resources";
    pub const LEGACY_FREE_BUSY_STATUS: &str = "calendar:LegacyFreeBusyStatus";
}

const SEND_TO_ALL_AND_SAVE_COPY: &str = "SendToAllAndSaveCopy";
const SEND_TO_CHANGED_AND_SAVE_COPY: &str = "SendToChangedAndSaveCopy";

/// Append one `t:Attendee/t:Mailbox/t:EmailAddress` per attendee to
/// `container`, in the order given.
///
/// ```xml
/// <t:OptionalAttendees>
///   <t:Attendee>
///     <t:Mailbox><t:EmailAddress>{email}</t:EmailAddress></t:Mailbox>
///   </t:Attendee>
/// </t:OptionalAttendees>
/// ```
pub fn attendee_group<'a>(mut container: Element, attendees: impl IntoIterator<Item = &'a Attendee>) -> Element {
    for attendee in attendees {
        container.push(
            Element::t("Attendee").with_child(
                Element::t("Mailbox").with_child(Element::t("EmailAddress").with_text(attendee.email.as_str())),
            ),
        );
    }
    container
}

/// Request deletion of a field, as opposed to leaving it untouched
///
/// ```xml
/// <t:DeleteItemField><t:FieldURI FieldURI="calendar:Resources"/></t:DeleteItemField>
/// ```
pub fn delete_field(field_uri: &str) -> Element {
    Element::t("DeleteItemField").with_child(Element::t("FieldURI").with_attr("FieldURI", field_uri))
}

/// Overwrite a field with `node`
///
/// ```xml
/// <t:SetItemField>
///   <t:FieldURI FieldURI="item:Subject"/>
///   <t:CalendarItem><t:Subject>{subject}</t:Subject></t:CalendarItem>
/// </t:SetItemField>
/// ```
pub fn set_item_field(field_uri: &str, node: Element) -> Element {
    Element::t("SetItemField")
        .with_child(Element::t("FieldURI").with_attr("FieldURI", field_uri))
        .with_child(Element::t("CalendarItem").with_child(node))
}

/// Request a calendar item from the store at the given detail level.
///
/// The id is passed through uninterpreted.
pub fn get_item(exchange_id: &str, shape: BaseShape) -> Element {
    debug!("Building GetItem request for {} ({})", exchange_id, shape);

    Element::m("GetItem")
        .with_child(Element::m("ItemShape").with_child(Element::t("BaseShape").with_text(shape.as_str())))
        .with_child(Element::m("ItemIds").with_child(Element::t("ItemId").with_attr("Id", exchange_id)))
}

/// Request a new event in the default calendar, inviting every attendee
/// and keeping a copy in the sender's mailbox.
pub fn new_event(event: &CalendarEvent) -> Result<Element> {
    if non_empty(Some(event.subject.as_str())).is_none() {
        return Err(CalendarError::MissingField("subject"));
    }
    let start = event.require_start()?;
    let end = event.require_end()?;
    if start > end {
        return Err(CalendarError::InvalidTimeRange {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }

    debug!("Building CreateItem request for '{}'", event.subject);

    let body = match (&event.html_body, &event.text_body) {
        (Some(html), _) => body_node(html, "HTML"),
        (None, Some(text)) => body_node(text, "Text"),
        (None, None) => body_node("", "HTML"),
    };

    let mut calendar_item = Element::t("CalendarItem")
        .with_child(Element::t("Subject").with_text(event.subject.as_str()))
        .with_child(body)
        .with_child(Element::t("Start").with_text(format_exchange_datetime(start)))
        .with_child(Element::t("End").with_text(format_exchange_datetime(end)))
        .with_child(Element::t("Location").with_text(event.location.as_deref().unwrap_or_default()));

    let required = event.required_attendees();
    if !required.is_empty() {
        calendar_item.push(attendee_group(Element::t("RequiredAttendees"), required));
    }

    let optional = event.optional_attendees();
    if !optional.is_empty() {
        calendar_item.push(attendee_group(Element::t("OptionalAttendees"), optional));
    }

    let resources = event.resources();
    if !resources.is_empty() {
        calendar_item.push(attendee_group(Element::t("Resources"), resources));
    }

    Ok(Element::m("CreateItem")
        .with_attr("SendMeetingInvitations", SEND_TO_ALL_AND_SAVE_COPY)
        .with_child(
            Element::m("SavedItemFolderId").with_child(Element::t("DistinguishedFolderId").with_attr("Id", "calendar")),
        )
        .with_child(Element::m("Items").with_child(calendar_item)))
}

/// Hard-delete an event, cancelling it for every attendee and removing all
/// of its occurrences.
pub fn delete_event(event: &CalendarEvent) -> Result<Element> {
    let (id, change_key) = event.item_id()?;

    debug!("Building DeleteItem request for {}", id);

    Ok(Element::m("DeleteItem")
        .with_attr("DeleteType", "HardDelete")
        .with_attr("SendMeetingCancellations", SEND_TO_ALL_AND_SAVE_COPY)
        .with_attr("AffectedTaskOccurrences", "AllOccurrences")
        .with_child(Element::m("ItemIds").with_child(item_id_node(id, change_key))))
}

/// Save changes to an event, touching only the fields marked as changed.
///
/// Unless `send_only_to_changed_attendees` is set, the busy/free status is
/// re-asserted so that Exchange resends the invitation to everyone even when
/// no visible field changed.
pub fn update_item(request: &UpdateRequest) -> Result<Element> {
    let event = &request.event;
    let (id, change_key) = event.item_id()?;

    debug!(
        "Building UpdateItem request for {} with fields {:?}",
        id, request.changed
    );

    let send_invitations = if request.send_only_to_changed_attendees {
        SEND_TO_CHANGED_AND_SAVE_COPY
    } else {
        SEND_TO_ALL_AND_SAVE_COPY
    };

    let mut updates = Element::t("Updates");

    if !request.send_only_to_changed_attendees {
        updates.push(set_item_field(
            field_uri::LEGACY_FREE_BUSY_STATUS,
            Element::t("LegacyFreeBusyStatus").with_text("Busy"),
        ));
    }

    // Both variants share item:Body; HTML wins when it is changed and set
    let html_changed = request.is_changed(ItemField::HtmlBody);
    let text_changed = request.is_changed(ItemField::TextBody);
    if html_changed || text_changed {
        let html = non_empty(event.html_body.as_deref())
            .filter(|_| html_changed)
            .map(|html| body_node(html, "HTML"));
        let body = html.or_else(|| {
            non_empty(event.text_body.as_deref())
                .filter(|_| text_changed)
                .map(|text| body_node(text, "Text"))
        });
        updates.push(set_or_delete(field_uri::BODY, body));
    }

    if request.is_changed(ItemField::Subject) {
        updates.push(set_or_delete(
            field_uri::SUBJECT,
            non_empty(Some(event.subject.as_str())).map(|s| Element::t("Subject").with_text(s)),
        ));
    }

    if request.is_changed(ItemField::Start) {
        let start = format_exchange_datetime(event.require_start()?);
        updates.push(set_item_field(field_uri::START, Element::t("Start").with_text(start)));
    }

    if request.is_changed(ItemField::End) {
        let end = format_exchange_datetime(event.require_end()?);
        updates.push(set_item_field(field_uri::END, Element::t("End").with_text(end)));
    }

    if request.is_changed(ItemField::Location) {
        updates.push(set_or_delete(
            field_uri::LOCATION,
            non_empty(event.location.as_deref()).map(|l| Element::t("Location").with_text(l)),
        ));
    }

    let attendees_changed = request.is_changed(ItemField::Attendees);
    if attendees_changed {
        updates.push(attendee_update(
            field_uri::REQUIRED_ATTENDEES,
            "RequiredAttendees",
            event.required_attendees(),
        ));
        updates.push(attendee_update(
            field_uri::OPTIONAL_ATTENDEES,
            "OptionalAttendees",
            event.optional_attendees(),
        ));
    }

    if attendees_changed || request.is_changed(ItemField::Resources) {
        updates.push(attendee_update(field_uri::RESOURCES, "Resources", event.resources()));
    }

    Ok(Element::m("UpdateItem")
        .with_attr("ConflictResolution", "AlwaysOverwrite")
        .with_attr("MessageDisposition", "SendAndSaveCopy")
        .with_attr("SendMeetingInvitationsOrCancellations", send_invitations)
        .with_child(
            Element::m("ItemChanges").with_child(
                Element::t("ItemChange")
                    .with_child(item_id_node(id, change_key))
                    .with_child(updates),
            ),
        ))
}

fn item_id_node(id: &str, change_key: &str) -> Element {
    Element::t("ItemId").with_attr("Id", id).with_attr("ChangeKey", change_key)
}

fn body_node(content: &str, body_type: &'static str) -> Element {
    Element::t("Body").with_attr("BodyType", body_type).with_text(content)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn set_or_delete(field_uri: &str, node: Option<Element>) -> Element {
    match node {
        Some(node) => set_item_field(field_uri, node),
        None => delete_field(field_uri),
    }
}

fn attendee_update(field_uri: &str, container: &'static str, attendees: Vec<&Attendee>) -> Element {
    if attendees.is_empty() {
        delete_field(field_uri)
    } else {
        set_item_field(field_uri, attendee_group(Element::t(container), attendees))
    }
}
