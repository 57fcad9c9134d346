//! ews-calendar: Exchange Web Services calendar request builders
//!
//! This crate builds the XML payloads for EWS calendar operations. It does
//! no network I/O and keeps no state: every builder turns domain objects
//! into a fresh document tree.
//!
//! ## Features
//!
//! - GetItem, CreateItem, DeleteItem and UpdateItem request builders
//! - Partial updates keyed by the set of changed fields
//! - UTC normalization of event times
//! - SOAP envelope wrapping
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ews_calendar::{Attendee, CalendarEvent, ItemField, UpdateRequest, request, soap};
//!
//! let event = CalendarEvent::new("Planning", start, end)
//!     .with_location("Room 4")
//!     .with_attendee(Attendee::required("alice@example.com"));
//!
//! // Create event
//! let xml = request::new_event(&event)?.to_xml_string()?;
//!
//! // Update the subject of a stored event
//! let stored = event.with_item_id(id, change_key);
//! let update = UpdateRequest::new(stored).with_field(ItemField::Subject);
//! let envelope = soap::wrap(request::update_item(&update)?, soap::DEFAULT_SERVER_VERSION);
//! ```

pub mod config;
pub mod datetime;
pub mod error;
pub mod models;
pub mod request;
pub mod soap;
pub mod xml;

pub use config::{Config, OutputConfig, RequestConfig};
pub use error::{CalendarError, Result};
pub use models::{Attendee, AttendeeRole, BaseShape, CalendarEvent, ItemField, UpdateRequest};
pub use xml::{Element, WriteOptions};

/// Re-export models for easy use
pub mod prelude {
    pub use super::request::{delete_event, get_item, new_event, update_item};
    pub use super::{Attendee, BaseShape, CalendarEvent, ItemField, UpdateRequest};
}
