//! Resolution of a message type from serialized descriptor sets.

use crate::error::{Error, Result};
use prost_reflect::{DescriptorPool, MessageDescriptor};
use tracing::debug;

/// Resolve `message_name` inside a serialized `google.protobuf.FileDescriptorSet`.
///
/// A single leading `.` on the name is ignored. The checks run in a fixed
/// order and each failure is reported as its own error variant: empty schema
/// bytes, empty name, unparsable schema, unknown name, and finally a name that
/// resolves to something other than a message.
pub fn resolve_message(schema: &[u8], message_name: &str) -> Result<MessageDescriptor> {
    let name = message_name.strip_prefix('.').unwrap_or(message_name);

    if schema.is_empty() {
        return Err(Error::EmptySchema);
    }
    if name.is_empty() {
        return Err(Error::EmptyMessageName);
    }

    let pool = DescriptorPool::decode(schema)?;
    debug!(
        "Decoded schema with {} files, looking up '{}'",
        pool.files().len(),
        name
    );

    if let Some(message) = pool.get_message_by_name(name) {
        return Ok(message);
    }

    match describe_non_message(&pool, name) {
        Some(found) => Err(Error::NotAMessage {
            name: name.to_string(),
            found,
        }),
        None => Err(Error::MessageNotFound {
            name: name.to_string(),
        }),
    }
}

/// Returns what kind of descriptor `name` refers to, if it exists at all
fn describe_non_message(pool: &DescriptorPool, name: &str) -> Option<&'static str> {
    if pool.get_enum_by_name(name).is_some() {
        return Some("enum");
    }
    if pool.get_service_by_name(name).is_some() {
        return Some("service");
    }
    if pool.get_extension_by_name(name).is_some() {
        return Some("extension");
    }
    if pool.files().any(|file| file.package_name() == name) {
        return Some("package");
    }

    let (parent, leaf) = name.rsplit_once('.')?;
    if let Some(message) = pool.get_message_by_name(parent) {
        if message.get_field_by_name(leaf).is_some() {
            return Some("field");
        }
        if message.oneofs().any(|oneof| oneof.name() == leaf) {
            return Some("oneof");
        }
    }
    if let Some(service) = pool.get_service_by_name(parent) {
        if service.methods().any(|method| method.name() == leaf) {
            return Some("method");
        }
    }
    // Enum values live in the scope enclosing their enum
    if pool
        .all_enums()
        .any(|e| e.get_value_by_name(leaf).is_some() && enclosing_scope(e.full_name()) == parent)
    {
        return Some("enum value");
    }

    None
}

fn enclosing_scope(full_name: &str) -> &str {
    full_name.rsplit_once('.').map_or("", |(scope, _)| scope)
}
