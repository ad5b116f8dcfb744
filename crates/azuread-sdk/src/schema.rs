//! Static attribute schemas and the codec between host attributes and
//! resource models.
//!
//! Each resource declares its fields as a `&'static [FieldSpec]` table. The
//! host hands attributes over as a JSON object; [`Attributes::decode`] checks
//! that object against the table before anything else happens, and
//! [`Schema::check_consistency`] verifies the table itself once at provider
//! construction.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::suppress::DiffSuppress;

/// Validator applied to string values (and to each element of string sets).
pub type ValidateFn = fn(&str) -> Result<(), String>;

/// Errors raised while checking a schema or decoding attributes against it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Attributes were not a JSON object.
    #[error("expected an object of attributes")]
    NotAnObject,

    /// An attribute is not declared by the schema.
    #[error("unsupported argument {0:?}")]
    UnknownField(String),

    /// A required attribute is missing.
    #[error("the argument {0:?} is required, but no definition was found")]
    MissingField(String),

    /// An attribute has the wrong JSON type.
    #[error("expected {field:?} to be {expected}")]
    WrongKind {
        field: String,
        expected: &'static str,
    },

    /// A validator rejected the value.
    #[error("invalid value for {field:?}: {message}")]
    InvalidValue { field: String, message: String },

    /// The schema table itself is inconsistent.
    #[error("schema for {resource_type} is inconsistent: {message}")]
    Inconsistent {
        resource_type: String,
        message: String,
    },
}

/// Value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    StringSet,
    StringMap,
    Bool,
    /// List of JSON objects. Only computed fields may use it.
    ObjectList,
}

impl FieldKind {
    fn describe(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::StringSet => "a list of strings",
            Self::StringMap => "a map of strings",
            Self::Bool => "a boolean",
            Self::ObjectList => "a list of objects",
        }
    }
}

/// How a field participates in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    Required,
    Optional,
    Computed,
    OptionalComputed,
}

/// Declaration of one attribute.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub mode: FieldMode,
    pub force_new: bool,
    pub description: &'static str,
    pub validate: Option<ValidateFn>,
    pub diff_suppress: Option<DiffSuppress>,
}

impl FieldSpec {
    const fn base(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            mode: FieldMode::Optional,
            force_new: false,
            description,
            validate: None,
            diff_suppress: None,
        }
    }

    /// A string field.
    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self::base(name, FieldKind::String, description)
    }

    /// A set of strings. Order and duplicates are not significant.
    pub const fn string_set(name: &'static str, description: &'static str) -> Self {
        Self::base(name, FieldKind::StringSet, description)
    }

    /// A map of string keys to string values.
    pub const fn string_map(name: &'static str, description: &'static str) -> Self {
        Self::base(name, FieldKind::StringMap, description)
    }

    /// A boolean field.
    pub const fn bool(name: &'static str, description: &'static str) -> Self {
        Self::base(name, FieldKind::Bool, description)
    }

    /// A list of nested objects, reported by data sources.
    pub const fn object_list(name: &'static str, description: &'static str) -> Self {
        Self::base(name, FieldKind::ObjectList, description)
    }

    pub const fn required(mut self) -> Self {
        self.mode = FieldMode::Required;
        self
    }

    pub const fn computed(mut self) -> Self {
        self.mode = FieldMode::Computed;
        self
    }

    pub const fn optional_computed(mut self) -> Self {
        self.mode = FieldMode::OptionalComputed;
        self
    }

    pub const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub const fn validated(mut self, validate: ValidateFn) -> Self {
        self.validate = Some(validate);
        self
    }

    pub const fn suppress(mut self, suppress: DiffSuppress) -> Self {
        self.diff_suppress = Some(suppress);
        self
    }

    fn check(&self, value: &str) -> Result<(), SchemaError> {
        match self.validate {
            Some(validate) => validate(value).map_err(|message| SchemaError::InvalidValue {
                field: self.name.to_string(),
                message,
            }),
            None => Ok(()),
        }
    }
}

/// Attribute table of one resource or data source.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub fields: &'static [FieldSpec],
}

impl Schema {
    /// Wraps a static field table.
    #[must_use]
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    /// Looks a field up by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Verifies the table: unique names, no computed field forcing
    /// replacement, object lists only as computed fields, validators and
    /// diff suppression only on string kinds.
    pub fn check_consistency(&self, resource_type: &str) -> Result<(), SchemaError> {
        let inconsistent = |message: String| SchemaError::Inconsistent {
            resource_type: resource_type.to_string(),
            message,
        };

        let mut seen = BTreeSet::new();
        for field in self.fields {
            if field.name.is_empty() || field.name == "id" {
                return Err(inconsistent(format!("invalid field name {:?}", field.name)));
            }
            if !seen.insert(field.name) {
                return Err(inconsistent(format!("duplicate field {:?}", field.name)));
            }
            if field.mode == FieldMode::Computed && field.force_new {
                return Err(inconsistent(format!(
                    "computed field {:?} cannot force replacement",
                    field.name
                )));
            }
            if field.kind == FieldKind::ObjectList && field.mode != FieldMode::Computed {
                return Err(inconsistent(format!(
                    "object list field {:?} must be computed",
                    field.name
                )));
            }
            if field.validate.is_some()
                && matches!(field.kind, FieldKind::Bool | FieldKind::ObjectList)
            {
                return Err(inconsistent(format!(
                    "validator declared on non-string field {:?}",
                    field.name
                )));
            }
            if field.diff_suppress.is_some() && field.kind != FieldKind::String {
                return Err(inconsistent(format!(
                    "diff suppression declared on non-string field {:?}",
                    field.name
                )));
            }
        }

        Ok(())
    }

    /// Returns true if a planned change of `field` from `old` to `new` should
    /// be ignored.
    #[must_use]
    pub fn suppresses_diff(&self, field: &str, old: &str, new: &str) -> bool {
        self.field(field)
            .and_then(|f| f.diff_suppress)
            .is_some_and(|s| s.suppresses(old, new))
    }

    /// Names of the fields whose change forces replacement.
    #[must_use]
    pub fn force_new_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.force_new)
            .map(|f| f.name)
            .collect()
    }
}

/// Decoded attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    StringSet(Vec<String>),
    StringMap(BTreeMap<String, String>),
    Bool(bool),
    ObjectList(Vec<Map<String, Value>>),
}

impl AttributeValue {
    fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::StringSet(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            Self::StringMap(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            Self::Bool(b) => Value::Bool(*b),
            Self::ObjectList(items) => {
                Value::Array(items.iter().cloned().map(Value::Object).collect())
            }
        }
    }
}

/// Attributes of one resource instance, keyed by field name.
///
/// String sets are kept sorted and deduplicated so two sets compare equal
/// regardless of the order the remote or the host produced them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    values: BTreeMap<String, AttributeValue>,
}

impl Attributes {
    /// Creates an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes and validates host attributes against `schema`.
    ///
    /// `null` values are treated as absent. An `id` key is ignored so state
    /// objects can be passed back in unchanged.
    pub fn decode(schema: &Schema, raw: &Value) -> Result<Self, SchemaError> {
        let object = raw.as_object().ok_or(SchemaError::NotAnObject)?;
        let mut values = BTreeMap::new();

        for (name, value) in object {
            if name == "id" || value.is_null() {
                continue;
            }

            let spec = schema
                .field(name)
                .ok_or_else(|| SchemaError::UnknownField(name.clone()))?;
            let wrong_kind = || SchemaError::WrongKind {
                field: name.clone(),
                expected: spec.kind.describe(),
            };

            let decoded = match spec.kind {
                FieldKind::String => {
                    let s = value.as_str().ok_or_else(wrong_kind)?;
                    spec.check(s)?;
                    AttributeValue::String(s.to_string())
                }
                FieldKind::StringSet => {
                    let items = value.as_array().ok_or_else(wrong_kind)?;
                    let mut set = Vec::with_capacity(items.len());
                    for item in items {
                        let s = item.as_str().ok_or_else(wrong_kind)?;
                        spec.check(s)?;
                        set.push(s.to_string());
                    }
                    AttributeValue::StringSet(normalize_set(set))
                }
                FieldKind::StringMap => {
                    let entries = value.as_object().ok_or_else(wrong_kind)?;
                    let mut map = BTreeMap::new();
                    for (key, item) in entries {
                        let s = item.as_str().ok_or_else(wrong_kind)?;
                        spec.check(s)?;
                        map.insert(key.clone(), s.to_string());
                    }
                    AttributeValue::StringMap(map)
                }
                FieldKind::Bool => AttributeValue::Bool(value.as_bool().ok_or_else(wrong_kind)?),
                FieldKind::ObjectList => {
                    let items = value.as_array().ok_or_else(wrong_kind)?;
                    let objects = items
                        .iter()
                        .map(|item| item.as_object().cloned().ok_or_else(wrong_kind))
                        .collect::<Result<Vec<_>, _>>()?;
                    AttributeValue::ObjectList(objects)
                }
            };

            values.insert(name.clone(), decoded);
        }

        for spec in schema.fields {
            if spec.mode == FieldMode::Required && !values.contains_key(spec.name) {
                return Err(SchemaError::MissingField(spec.name.to_string()));
            }
        }

        Ok(Self { values })
    }

    /// Encodes the attributes as a JSON object.
    #[must_use]
    pub fn encode(&self) -> Value {
        let object: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(object)
    }

    /// Returns a string attribute.
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(AttributeValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Returns a string attribute that the schema marks as required.
    pub fn required_string(&self, name: &str) -> Result<&str, SchemaError> {
        self.string(name)
            .ok_or_else(|| SchemaError::MissingField(name.to_string()))
    }

    /// Returns a string set, empty when unset.
    #[must_use]
    pub fn string_set(&self, name: &str) -> Vec<String> {
        match self.values.get(name) {
            Some(AttributeValue::StringSet(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Returns a string map, empty when unset.
    #[must_use]
    pub fn string_map(&self, name: &str) -> BTreeMap<String, String> {
        match self.values.get(name) {
            Some(AttributeValue::StringMap(map)) => map.clone(),
            _ => BTreeMap::new(),
        }
    }

    /// Returns a boolean attribute.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(AttributeValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Returns a list of objects, empty when unset.
    #[must_use]
    pub fn object_list(&self, name: &str) -> &[Map<String, Value>] {
        match self.values.get(name) {
            Some(AttributeValue::ObjectList(items)) => items,
            _ => &[],
        }
    }

    /// Returns true if the attribute is set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Sets a string attribute.
    #[must_use]
    pub fn with_string(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values
            .insert(name.to_string(), AttributeValue::String(value.into()));
        self
    }

    /// Sets an optional string attribute; `None` leaves it unset.
    #[must_use]
    pub fn with_optional_string(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.with_string(name, v),
            None => self,
        }
    }

    /// Sets a string set attribute.
    #[must_use]
    pub fn with_string_set<I, S>(mut self, name: &str, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = normalize_set(items.into_iter().map(Into::into).collect());
        self.values
            .insert(name.to_string(), AttributeValue::StringSet(set));
        self
    }

    /// Sets a string map attribute.
    #[must_use]
    pub fn with_string_map<I, K, V>(mut self, name: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.values
            .insert(name.to_string(), AttributeValue::StringMap(map));
        self
    }

    /// Sets a boolean attribute.
    #[must_use]
    pub fn with_bool(mut self, name: &str, value: bool) -> Self {
        self.values
            .insert(name.to_string(), AttributeValue::Bool(value));
        self
    }

    /// Sets a list of objects, keeping the given order.
    #[must_use]
    pub fn with_object_list(mut self, name: &str, items: Vec<Map<String, Value>>) -> Self {
        self.values
            .insert(name.to_string(), AttributeValue::ObjectList(items));
        self
    }
}

/// Sorts and deduplicates a set of identifiers, ignoring ASCII case when
/// deciding what is a duplicate.
#[must_use]
pub fn normalize_set(mut items: Vec<String>) -> Vec<String> {
    items.sort_by_key(|s| s.to_ascii_lowercase());
    items.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::validate_uuid;
    use serde_json::json;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::string("application_id", "The application")
            .required()
            .force_new()
            .validated(validate_uuid)
            .suppress(DiffSuppress::CaseDifference),
        FieldSpec::string_set("role_ids", "App roles").validated(validate_uuid),
        FieldSpec::bool("enabled", "Whether enabled").optional_computed(),
        FieldSpec::string("display_name", "Display name").computed(),
    ];
    const SCHEMA: Schema = Schema::new(FIELDS);

    const APP: &str = "00000000-0000-0000-0000-000000000001";
    const ROLE_A: &str = "aaaaaaaa-0000-0000-0000-000000000000";
    const ROLE_B: &str = "bbbbbbbb-0000-0000-0000-000000000000";

    #[test]
    fn test_schema_is_consistent() {
        SCHEMA.check_consistency("test").unwrap();
        assert_eq!(SCHEMA.force_new_fields(), vec!["application_id"]);
    }

    #[test]
    fn test_duplicate_field_is_inconsistent() {
        const DUPES: &[FieldSpec] = &[
            FieldSpec::string("a", "first"),
            FieldSpec::string("a", "second"),
        ];
        let err = Schema::new(DUPES).check_consistency("dupes").unwrap_err();
        assert!(matches!(err, SchemaError::Inconsistent { .. }));
    }

    #[test]
    fn test_suppress_on_set_is_inconsistent() {
        const BAD: &[FieldSpec] =
            &[FieldSpec::string_set("ids", "ids").suppress(DiffSuppress::CaseDifference)];
        assert!(Schema::new(BAD).check_consistency("bad").is_err());
    }

    #[test]
    fn test_decode_normalizes_sets() {
        let attrs = Attributes::decode(
            &SCHEMA,
            &json!({
                "id": "ignored",
                "application_id": APP,
                "role_ids": [ROLE_B, ROLE_A, ROLE_B.to_uppercase()],
                "enabled": true,
                "display_name": null,
            }),
        )
        .unwrap();

        assert_eq!(attrs.string("application_id"), Some(APP));
        assert_eq!(attrs.string_set("role_ids"), vec![ROLE_A, ROLE_B]);
        assert_eq!(attrs.bool("enabled"), Some(true));
        assert!(!attrs.contains("display_name"));
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert_eq!(
            Attributes::decode(&SCHEMA, &json!([])).unwrap_err(),
            SchemaError::NotAnObject
        );
        assert_eq!(
            Attributes::decode(&SCHEMA, &json!({})).unwrap_err(),
            SchemaError::MissingField("application_id".into())
        );
        assert_eq!(
            Attributes::decode(&SCHEMA, &json!({"application_id": APP, "colour": "red"}))
                .unwrap_err(),
            SchemaError::UnknownField("colour".into())
        );
        assert!(matches!(
            Attributes::decode(&SCHEMA, &json!({"application_id": 42})).unwrap_err(),
            SchemaError::WrongKind { .. }
        ));
        assert!(matches!(
            Attributes::decode(&SCHEMA, &json!({"application_id": "nope"})).unwrap_err(),
            SchemaError::InvalidValue { .. }
        ));
        assert!(matches!(
            Attributes::decode(
                &SCHEMA,
                &json!({"application_id": APP, "role_ids": ["not-a-uuid"]})
            )
            .unwrap_err(),
            SchemaError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_encode_round_trip() {
        let attrs = Attributes::new()
            .with_string("application_id", APP)
            .with_string_set("role_ids", [ROLE_B, ROLE_A])
            .with_bool("enabled", false);

        let encoded = attrs.encode();
        assert_eq!(encoded["role_ids"], json!([ROLE_A, ROLE_B]));
        assert_eq!(Attributes::decode(&SCHEMA, &encoded).unwrap(), attrs);
    }

    #[test]
    fn test_string_map() {
        const MAP_FIELDS: &[FieldSpec] = &[FieldSpec::string_map("result", "Lookup").computed()];
        let schema = Schema::new(MAP_FIELDS);
        schema.check_consistency("map").unwrap();

        let attrs = Attributes::decode(&schema, &json!({"result": {"b": "2", "a": "1"}})).unwrap();
        assert_eq!(attrs.string_map("result").get("a").map(String::as_str), Some("1"));
        assert!(Attributes::decode(&schema, &json!({"result": {"a": 1}})).is_err());

        let built = Attributes::new().with_string_map("result", [("a", "1"), ("b", "2")]);
        assert_eq!(built, attrs);
    }

    #[test]
    fn test_object_list() {
        const LIST_FIELDS: &[FieldSpec] = &[FieldSpec::object_list("domains", "Domains").computed()];
        let schema = Schema::new(LIST_FIELDS);
        schema.check_consistency("list").unwrap();

        let raw = json!({"domains": [{"domain_name": "b.com"}, {"domain_name": "a.com"}]});
        let attrs = Attributes::decode(&schema, &raw).unwrap();
        assert_eq!(attrs.object_list("domains")[0]["domain_name"], "b.com");
        assert_eq!(attrs.encode(), raw);
        assert!(Attributes::decode(&schema, &json!({"domains": ["a.com"]})).is_err());
        assert!(Attributes::new().object_list("domains").is_empty());
    }

    #[test]
    fn test_object_list_must_be_computed() {
        const BAD: &[FieldSpec] = &[FieldSpec::object_list("domains", "Domains")];
        let err = Schema::new(BAD).check_consistency("bad").unwrap_err();
        assert!(matches!(err, SchemaError::Inconsistent { ref message, .. } if message.contains("must be computed")));
    }

    #[test]
    fn test_case_difference_suppression() {
        assert!(SCHEMA.suppresses_diff("application_id", "ABC", "abc"));
        assert!(!SCHEMA.suppresses_diff("application_id", "abc", "abd"));
        assert!(!SCHEMA.suppresses_diff("display_name", "ABC", "abc"));
    }
}
