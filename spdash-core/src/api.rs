use std::fmt;

use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AuthError;

/// Status code and decoded body of an authenticated API call.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// HTTP status code.
    pub code: u16,
    /// The decoded body, `None` when the body did not decode as `T`.
    pub result: Option<T>,
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Decodes `body` leniently; an undecodable body yields `result: None`.
    pub fn from_body(code: u16, body: &str) -> Self {
        Self {
            code,
            result: serde_json::from_str(body).ok(),
        }
    }
}

/// A Drupal role held by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role id.
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    /// Human readable role name.
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

/// Body of `api/me.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInfo {
    /// Name of the department the user belongs to.
    #[serde(default, deserialize_with = "lenient_text")]
    pub field_afdeling: Option<String>,
    /// Id of that department.
    #[serde(default, deserialize_with = "lenient_text")]
    pub field_afdeling_id: Option<String>,
    /// Roles, in the order the provider lists them.
    #[serde(default, deserialize_with = "lenient_roles")]
    pub roles: Vec<Role>,
}

impl ProfileInfo {
    /// The department name and id, when the user belongs to one.
    ///
    /// An empty name or `"0"` counts as no department.
    pub fn department(&self) -> Option<(&str, &str)> {
        let name = self
            .field_afdeling
            .as_deref()
            .filter(|n| !n.is_empty() && *n != "0")?;
        Some((name, self.field_afdeling_id.as_deref().unwrap_or_default()))
    }
}

/// One CiviCRM contact as returned by `Contact.get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Contact {
    #[serde(default, deserialize_with = "lenient_text")]
    pub contact_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub street_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub geo_code_1: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub geo_code_2: Option<String>,
}

/// Envelope returned by the CiviCRM proxy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CiviResult {
    /// Whether CiviCRM flagged the call as failed. Accepts `0`/`1` as well as booleans.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_error: bool,
    /// The returned contacts, in document order. Entries that are not objects are skipped.
    #[serde(default, deserialize_with = "seq_or_map")]
    pub values: Vec<Contact>,
    /// CiviCRM's error message, if any.
    #[serde(default, deserialize_with = "lenient_text")]
    pub error_message: Option<String>,
}

impl ApiResponse<CiviResult> {
    /// The contacts of a successful call, or [`AuthError::UpstreamApi`].
    ///
    /// `values` is only looked at when the code is 200 and CiviCRM reported no error.
    pub fn into_contacts(self) -> Result<Vec<Contact>, AuthError> {
        match self.result {
            Some(result) if self.code == 200 && !result.is_error => Ok(result.values),
            result => Err(AuthError::UpstreamApi {
                code: self.code,
                message: result.and_then(|r| r.error_message).unwrap_or_default(),
            }),
        }
    }
}

/// Accepts strings, numbers and booleans as text; null and containers become `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !matches!(s.as_str(), "" | "0" | "false"),
        _ => false,
    })
}

/// Entries of a JSON array (no key) or an id-keyed object, in document order.
/// Scalars and null yield no entries.
fn keyed_entries<'de, D>(deserializer: D) -> Result<Vec<(Option<String>, Value)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Entries;

    impl<'de> Visitor<'de> for Entries {
        type Value = Vec<(Option<String>, Value)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list or an id-keyed object")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(item) = seq.next_element::<Value>()? {
                items.push((None, item));
            }
            Ok(items)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut items = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, item)) = map.next_entry::<String, Value>()? {
                items.push((Some(key), item));
            }
            Ok(items)
        }
    }

    deserializer.deserialize_any(Entries)
}

/// Collects a list or id-keyed object, skipping entries that do not decode as `T`.
fn seq_or_map<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(keyed_entries(deserializer)?
        .into_iter()
        .filter_map(|(_, item)| serde_json::from_value(item).ok())
        .collect())
}

/// Roles as `{id, name}` objects, bare names, or Drupal's `{"<rid>": "<name>"}` map.
/// The map key fills in a missing id; entries of any other shape are skipped.
fn lenient_roles<'de, D>(deserializer: D) -> Result<Vec<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(keyed_entries(deserializer)?
        .into_iter()
        .filter_map(|(key, item)| match item {
            Value::String(name) => Some(Role {
                id: key,
                name: Some(name),
            }),
            Value::Object(_) => {
                let mut role: Role = serde_json::from_value(item).ok()?;
                if role.id.is_none() {
                    role.id = key;
                }
                Some(role)
            }
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_accepts_numeric_ids_and_keyed_roles() {
        let profile: ProfileInfo = serde_json::from_str(
            r#"{
                "field_afdeling": "Amsterdam",
                "field_afdeling_id": 801,
                "roles": {"2": {"id": 2, "name": "authenticated user"}, "7": {"id": "7", "name": "afdelingsbeheerder"}}
            }"#,
        )
        .unwrap();

        assert_eq!(profile.department(), Some(("Amsterdam", "801")));
        assert_eq!(profile.roles.len(), 2);
        assert_eq!(profile.roles[1].id.as_deref(), Some("7"));
        assert_eq!(profile.roles[1].name.as_deref(), Some("afdelingsbeheerder"));
    }

    #[test]
    fn profile_without_department() {
        let profile: ProfileInfo =
            serde_json::from_str(r#"{"field_afdeling": [], "roles": []}"#).unwrap();
        assert_eq!(profile.department(), None);

        let profile: ProfileInfo = serde_json::from_str(r#"{"field_afdeling": ""}"#).unwrap();
        assert_eq!(profile.department(), None);
    }

    #[test]
    fn drupal_role_map_keeps_department() {
        let response = ApiResponse::<ProfileInfo>::from_body(
            200,
            r#"{
                "field_afdeling": "Groningen",
                "field_afdeling_id": "310",
                "roles": {"2": "authenticated user", "9": "kaderlid", "11": 42}
            }"#,
        );
        let profile = response.result.expect("profile decodes despite odd roles");

        assert_eq!(profile.department(), Some(("Groningen", "310")));
        assert_eq!(
            profile.roles,
            vec![
                Role {
                    id: Some("2".into()),
                    name: Some("authenticated user".into()),
                },
                Role {
                    id: Some("9".into()),
                    name: Some("kaderlid".into()),
                },
            ]
        );
    }

    #[test]
    fn malformed_roles_do_not_drop_profile() {
        for roles in [r#""admin""#, r#"[1, "x", {"id": 3, "name": "editor"}]"#, "true"] {
            let body = format!(r#"{{"field_afdeling": "Delft", "field_afdeling_id": 4, "roles": {roles}}}"#);
            let profile = ApiResponse::<ProfileInfo>::from_body(200, &body)
                .result
                .expect("profile decodes");
            assert_eq!(profile.department(), Some(("Delft", "4")));
        }

        let profile: ProfileInfo = serde_json::from_str(
            r#"{"roles": [1, "x", {"id": 3, "name": "editor"}]}"#,
        )
        .unwrap();
        assert_eq!(
            profile.roles,
            vec![
                Role {
                    id: None,
                    name: Some("x".into()),
                },
                Role {
                    id: Some("3".into()),
                    name: Some("editor".into()),
                },
            ]
        );
    }

    #[test]
    fn zero_department_counts_as_absent() {
        let profile: ProfileInfo =
            serde_json::from_str(r#"{"field_afdeling": "0", "field_afdeling_id": "0"}"#).unwrap();
        assert_eq!(profile.department(), None);

        let profile: ProfileInfo = serde_json::from_str(r#"{"field_afdeling": 0}"#).unwrap();
        assert_eq!(profile.department(), None);
    }

    #[test]
    fn civi_values_skip_non_object_entries() {
        let result: CiviResult = serde_json::from_str(
            r#"{"is_error": 0, "values": [{"contact_id": "1"}, "junk", 5, {"contact_id": "2"}]}"#,
        )
        .unwrap();
        assert_eq!(result.values.len(), 2);
        assert_eq!(result.values[1].contact_id.as_deref(), Some("2"));
    }

    #[test]
    fn civi_values_keep_document_order_when_keyed() {
        let result: CiviResult = serde_json::from_str(
            r#"{"is_error": 0, "values": {"10": {"contact_id": "10"}, "2": {"contact_id": "2"}}}"#,
        )
        .unwrap();

        assert!(!result.is_error);
        let ids: Vec<_> = result
            .values
            .iter()
            .map(|c| c.contact_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, ["10", "2"]);
    }

    #[test]
    fn error_flag_is_lenient() {
        let result: CiviResult =
            serde_json::from_str(r#"{"is_error": 1, "error_message": "Invalid key"}"#).unwrap();
        assert!(result.is_error);
        assert!(result.values.is_empty());
    }

    #[test]
    fn into_contacts_reports_upstream_errors() {
        let flagged = ApiResponse::<CiviResult>::from_body(
            200,
            r#"{"is_error": true, "error_message": "Access denied", "values": [{"contact_id": "1"}]}"#,
        );
        match flagged.into_contacts() {
            Err(AuthError::UpstreamApi { code, message }) => {
                assert_eq!(code, 200);
                assert_eq!(message, "Access denied");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let not_json = ApiResponse::<CiviResult>::from_body(500, "<html>Server error</html>");
        assert!(not_json.result.is_none());
        assert!(matches!(
            not_json.into_contacts(),
            Err(AuthError::UpstreamApi { code: 500, ref message }) if message.is_empty()
        ));
    }

    #[test]
    fn into_contacts_on_success() {
        let ok = ApiResponse::<CiviResult>::from_body(
            200,
            r#"{"is_error": 0, "count": 1, "values": [{"contact_id": "1", "display_name": "Jan"}]}"#,
        );
        let contacts = ok.into_contacts().unwrap();
        assert_eq!(contacts[0].display_name.as_deref(), Some("Jan"));
    }
}
