//! Data models for calendar requests

use crate::error::{CalendarError, Result};
use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Role of an attendee within a meeting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeRole {
    #[default]
    Required,
    Optional,
    /// Rooms and equipment
    Resource,
}

/// Meeting attendee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// Mailbox address
    pub email: String,
    /// Attendee classification
    #[serde(default)]
    pub role: AttendeeRole,
}

impl Attendee {
    /// Create an attendee with the given role
    pub fn new(email: impl Into<String>, role: AttendeeRole) -> Self {
        Self {
            email: email.into(),
            role,
        }
    }

    pub fn required(email: impl Into<String>) -> Self {
        Self::new(email, AttendeeRole::Required)
    }

    pub fn optional(email: impl Into<String>) -> Self {
        Self::new(email, AttendeeRole::Optional)
    }

    pub fn resource(email: impl Into<String>) -> Self {
        Self::new(email, AttendeeRole::Resource)
    }
}

/// Amount of detail requested from GetItem
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseShape {
    IdOnly,
    #[default]
    Default,
    AllProperties,
}

impl BaseShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdOnly => "IdOnly",
            Self::Default => "Default",
            Self::AllProperties => "AllProperties",
        }
    }
}

impl fmt::Display for BaseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseShape {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "idonly" => Ok(Self::IdOnly),
            "default" => Ok(Self::Default),
            "allproperties" => Ok(Self::AllProperties),
            _ => Err(CalendarError::InvalidBaseShape(s.to_string())),
        }
    }
}

/// Calendar item as held by the client
///
/// `id` and `change_key` are assigned by the server and only needed for
/// update and delete requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Exchange item id
    #[serde(default)]
    pub id: Option<String>,
    /// Exchange change key
    #[serde(default)]
    pub change_key: Option<String>,
    /// Event subject
    #[serde(default)]
    pub subject: String,
    /// HTML body
    #[serde(default)]
    pub html_body: Option<String>,
    /// Plain-text body
    #[serde(default)]
    pub text_body: Option<String>,
    /// Event start time
    #[serde(default, with = "crate::datetime::serde_aware")]
    pub start: Option<DateTime<FixedOffset>>,
    /// Event end time
    #[serde(default, with = "crate::datetime::serde_aware")]
    pub end: Option<DateTime<FixedOffset>>,
    /// Event location
    #[serde(default)]
    pub location: Option<String>,
    /// Attendees in invitation order
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

impl CalendarEvent {
    /// Create a new calendar event
    pub fn new<Tz: TimeZone>(subject: impl Into<String>, start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self {
            subject: subject.into(),
            start: Some(start.fixed_offset()),
            end: Some(end.fixed_offset()),
            ..Default::default()
        }
    }

    /// Set the server-assigned id and change key
    pub fn with_item_id(mut self, id: impl Into<String>, change_key: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self.change_key = Some(change_key.into());
        self
    }

    pub fn with_html_body(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }

    pub fn with_text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Append an attendee
    pub fn with_attendee(mut self, attendee: Attendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Attendees with the given role, in input order
    pub fn attendees_with_role(&self, role: AttendeeRole) -> Vec<&Attendee> {
        self.attendees.iter().filter(|a| a.role == role).collect()
    }

    pub fn required_attendees(&self) -> Vec<&Attendee> {
        self.attendees_with_role(AttendeeRole::Required)
    }

    pub fn optional_attendees(&self) -> Vec<&Attendee> {
        self.attendees_with_role(AttendeeRole::Optional)
    }

    pub fn resources(&self) -> Vec<&Attendee> {
        self.attendees_with_role(AttendeeRole::Resource)
    }

    /// Id and change key, both required to modify a stored item
    pub fn item_id(&self) -> Result<(&str, &str)> {
        let id = self.id.as_deref().ok_or(CalendarError::MissingField("id"))?;
        let change_key = self
            .change_key
            .as_deref()
            .ok_or(CalendarError::MissingField("change_key"))?;
        Ok((id, change_key))
    }

    pub fn require_start(&self) -> Result<&DateTime<FixedOffset>> {
        self.start.as_ref().ok_or(CalendarError::MissingField("start"))
    }

    pub fn require_end(&self) -> Result<&DateTime<FixedOffset>> {
        self.end.as_ref().ok_or(CalendarError::MissingField("end"))
    }
}

/// Item field an update can touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    HtmlBody,
    TextBody,
    Subject,
    Start,
    End,
    Location,
    /// Required, optional and resource attendees
    Attendees,
    /// Resource attendees only
    Resources,
}

impl ItemField {
    pub const ALL: [ItemField; 8] = [
        Self::HtmlBody,
        Self::TextBody,
        Self::Subject,
        Self::Start,
        Self::End,
        Self::Location,
        Self::Attendees,
        Self::Resources,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HtmlBody => "html_body",
            Self::TextBody => "text_body",
            Self::Subject => "subject",
            Self::Start => "start",
            Self::End => "end",
            Self::Location => "location",
            Self::Attendees => "attendees",
            Self::Resources => "resources",
        }
    }
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemField {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| CalendarError::UnknownField(name.to_string()))
    }
}

/// An event plus the fields that changed since it was fetched
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub event: CalendarEvent,
    pub changed: BTreeSet<ItemField>,
    /// Resend invitations only to attendees whose own entries changed
    pub send_only_to_changed_attendees: bool,
}

impl UpdateRequest {
    /// Create an update request with no changed fields
    pub fn new(event: CalendarEvent) -> Self {
        Self {
            event,
            changed: BTreeSet::new(),
            send_only_to_changed_attendees: false,
        }
    }

    /// Mark a field as changed
    pub fn with_field(mut self, field: ItemField) -> Self {
        self.changed.insert(field);
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = ItemField>) -> Self {
        self.changed.extend(fields);
        self
    }

    pub fn send_only_to_changed_attendees(mut self, enabled: bool) -> Self {
        self.send_only_to_changed_attendees = enabled;
        self
    }

    /// Mark fields as changed by name.
    ///
    /// In strict mode an unknown name is an error; otherwise it is logged
    /// and skipped.
    pub fn with_field_names<I, S>(mut self, names: I, strict: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            if name.trim().is_empty() {
                continue;
            }
            match name.parse::<ItemField>() {
                Ok(field) => {
                    self.changed.insert(field);
                }
                Err(e) if strict => return Err(e),
                Err(_) => {
                    tracing::warn!("Ignoring unknown item field: {}", name);
                }
            }
        }
        Ok(self)
    }

    pub fn is_changed(&self, field: ItemField) -> bool {
        self.changed.contains(&field)
    }
}
