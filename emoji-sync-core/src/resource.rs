//! Typed view of the custom emojis a guild already has.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Opaque identifier assigned by the platform (a snowflake).
pub type RemoteId = String;

/// A custom emoji as reported by the platform's emoji listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteEmojiResource {
    pub id: RemoteId,
    pub name: String,
    /// Roles allowed to use the emoji. Empty means everyone.
    pub roles: Vec<RemoteId>,
    /// Creator payload, kept as-is when the platform includes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    pub require_colons: bool,
    /// Owned by an integration; never touched by a sync.
    pub managed: bool,
    pub animated: bool,
}

impl RemoteEmojiResource {
    /// Validates a raw listing entry field by field.
    ///
    /// `id`, `name`, `require_colons`, `managed` and `animated` are required.
    /// `roles` defaults to empty. Fields this tool does not use are ignored.
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let obj = payload
            .as_object()
            .ok_or_else(|| ValidationError::NotAnObject(payload.to_string()))?;

        let id = snowflake(required(obj, "id")?, "id")?;
        let name = match required(obj, "name")? {
            Value::String(s) => s.clone(),
            other => return Err(wrong_type("name", "a string", other)),
        };
        let roles = match obj.get("roles") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|role| snowflake(role, "roles"))
                .collect::<Result<_, _>>()?,
            Some(other) => return Err(wrong_type("roles", "an array of role ids", other)),
        };
        let user = obj.get("user").filter(|u| !u.is_null()).cloned();

        Ok(Self {
            id,
            name,
            roles,
            user,
            require_colons: flag(obj, "require_colons")?,
            managed: flag(obj, "managed")?,
            animated: flag(obj, "animated")?,
        })
    }
}

impl TryFrom<&Value> for RemoteEmojiResource {
    type Error = ValidationError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_payload(value)
    }
}

/// Parses a whole listing, failing on the first malformed entry.
pub fn parse_listing(payloads: &[Value]) -> Result<Vec<RemoteEmojiResource>, ValidationError> {
    payloads.iter().map(RemoteEmojiResource::try_from).collect()
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, ValidationError> {
    obj.get(field)
        .ok_or(ValidationError::MissingField { field })
}

fn flag(obj: &Map<String, Value>, field: &'static str) -> Result<bool, ValidationError> {
    match required(obj, field)? {
        Value::Bool(b) => Ok(*b),
        other => Err(wrong_type(field, "a boolean", other)),
    }
}

// Snowflakes arrive as strings, but integers are accepted too.
fn snowflake(value: &Value, field: &'static str) -> Result<RemoteId, ValidationError> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Number(n) if n.is_u64() => Ok(n.to_string()),
        other => Err(wrong_type(field, "a snowflake id", other)),
    }
}

fn wrong_type(field: &'static str, expected: &str, got: &Value) -> ValidationError {
    ValidationError::WrongType {
        field,
        detail: format!("expected {expected}, got {got}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "id": "41771983429993937",
            "name": "wave",
            "roles": ["41771983429993000", 41771983429993001u64],
            "user": {"id": "1", "username": "someone"},
            "require_colons": true,
            "managed": false,
            "animated": false,
            "available": true
        })
    }

    #[test]
    fn parses_full_payload_and_ignores_extra_fields() {
        let r = RemoteEmojiResource::from_payload(&payload()).unwrap();
        assert_eq!(r.id, "41771983429993937");
        assert_eq!(r.name, "wave");
        assert_eq!(r.roles, vec!["41771983429993000", "41771983429993001"]);
        assert!(r.user.is_some());
        assert!(r.require_colons);
        assert!(!r.managed);
        assert!(!r.animated);
    }

    #[test]
    fn roles_default_to_empty() {
        let mut p = payload();
        p.as_object_mut().unwrap().remove("roles");
        let r = RemoteEmojiResource::from_payload(&p).unwrap();
        assert!(r.roles.is_empty());
    }

    #[test]
    fn numeric_id_is_normalised_to_string() {
        let mut p = payload();
        p["id"] = json!(12345);
        let r = RemoteEmojiResource::from_payload(&p).unwrap();
        assert_eq!(r.id, "12345");
    }

    #[test]
    fn each_required_field_is_enforced() {
        for field in ["id", "name", "require_colons", "managed", "animated"] {
            let mut p = payload();
            p.as_object_mut().unwrap().remove(field);
            match RemoteEmojiResource::from_payload(&p) {
                Err(ValidationError::MissingField { field: f }) => assert_eq!(f, field),
                other => panic!("expected missing {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        let mut p = payload();
        p["managed"] = json!("yes");
        assert!(matches!(
            RemoteEmojiResource::from_payload(&p),
            Err(ValidationError::WrongType { field: "managed", .. })
        ));

        let mut p = payload();
        p["roles"] = json!("admin");
        assert!(matches!(
            RemoteEmojiResource::from_payload(&p),
            Err(ValidationError::WrongType { field: "roles", .. })
        ));

        assert!(matches!(
            RemoteEmojiResource::from_payload(&json!(["not", "an", "object"])),
            Err(ValidationError::NotAnObject(_))
        ));
    }

    #[test]
    fn listing_fails_on_first_bad_entry() {
        let mut bad = payload();
        bad.as_object_mut().unwrap().remove("id");
        let err = parse_listing(&[payload(), bad]).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { field: "id" }));
    }
}
