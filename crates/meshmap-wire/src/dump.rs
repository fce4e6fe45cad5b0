//! Typed view of a routing-table dump reply.
//!
//! Extraction is all-or-nothing per page: a row missing `ip`, `path`, or
//! `link` (or carrying the wrong type) rejects the whole page, so the
//! reconstructor never sees a partially valid dump.

use thiserror::Error;

use crate::Value;

/// One physical link observation from the routing table.
///
/// A node may appear in multiple rows when it is reachable via more than one
/// path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTableRow {
    /// Opaque node address.
    pub ip: String,
    /// Dotted-hex route label.
    pub path: String,
    /// Raw link-state reading; zero means a historical, currently dead link.
    pub link: u64,
}

/// One decoded page of the table dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpPage {
    pub rows: Vec<RawTableRow>,
    /// Present on paginated replies that have further pages.
    pub more: bool,
}

/// The reply decoded, but does not have the shape of a table dump.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("reply is not a dictionary")]
    NotADict,
    #[error("daemon reported an error: {0}")]
    DaemonError(String),
    #[error("reply is missing the `routingTable` key")]
    MissingTable,
    #[error("`routingTable` is not a list")]
    TableNotAList,
    #[error("table entry {index} is not a dictionary")]
    EntryNotADict { index: usize },
    #[error("table entry {index} is missing field `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("table entry {index} field `{field}` has the wrong type")]
    WrongFieldType { index: usize, field: &'static str },
    #[error("table entry {index} field `{field}` is not valid UTF-8")]
    NotUtf8 { index: usize, field: &'static str },
    #[error("table entry {index} has a negative `link` value")]
    NegativeLink { index: usize },
}

impl DumpPage {
    /// Extract the typed rows from one decoded reply page.
    pub fn from_value(reply: &Value) -> Result<DumpPage, SchemaError> {
        let dict = reply.as_dict().ok_or(SchemaError::NotADict)?;

        if let Some(message) = reply.get(b"error").and_then(Value::as_str) {
            if message != "none" {
                return Err(SchemaError::DaemonError(message.to_string()));
            }
        }

        let table = reply
            .get(b"routingTable")
            .ok_or(SchemaError::MissingTable)?
            .as_list()
            .ok_or(SchemaError::TableNotAList)?;

        let mut rows = Vec::with_capacity(table.len());
        for (index, entry) in table.iter().enumerate() {
            if entry.as_dict().is_none() {
                return Err(SchemaError::EntryNotADict { index });
            }
            let ip = string_field(entry, index, "ip")?;
            let path = string_field(entry, index, "path")?;
            let link = entry
                .get(b"link")
                .ok_or(SchemaError::MissingField {
                    index,
                    field: "link",
                })?
                .as_int()
                .ok_or(SchemaError::WrongFieldType {
                    index,
                    field: "link",
                })?;
            if link < 0 {
                return Err(SchemaError::NegativeLink { index });
            }
            rows.push(RawTableRow {
                ip,
                path,
                link: link as u64,
            });
        }

        Ok(DumpPage {
            rows,
            more: dict.contains_key(b"more".as_slice()),
        })
    }
}

fn string_field(entry: &Value, index: usize, field: &'static str) -> Result<String, SchemaError> {
    let value = entry
        .get(field.as_bytes())
        .ok_or(SchemaError::MissingField { index, field })?;
    let bytes = value
        .as_bytes()
        .ok_or(SchemaError::WrongFieldType { index, field })?;
    let text = std::str::from_utf8(bytes).map_err(|_| SchemaError::NotUtf8 { index, field })?;
    Ok(text.to_string())
}
