use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inputs submitted by the team, keyed by input name.
pub type PlayerInputs = HashMap<String, Value>;

/// Static description of a room's unlock conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDefinition {
    /// Input keys that must all be supplied before the room is solvable.
    #[serde(default)]
    pub required_inputs: Option<BTreeSet<String>>,
}

impl RoomDefinition {
    /// Build a room requiring every key in `keys`.
    pub fn requiring<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            required_inputs: Some(keys.into_iter().map(Into::into).collect()),
        }
    }
}

/// Whether every input required by `room` is present and truthy in `provided`.
///
/// A missing room or a room without a requirement set is never satisfied, while an
/// empty requirement set always is.
pub fn has_all_inputs(room: Option<&RoomDefinition>, provided: &PlayerInputs) -> bool {
    let Some(required) = room.and_then(|room| room.required_inputs.as_ref()) else {
        return false;
    };

    required
        .iter()
        .all(|key| provided.get(key).is_some_and(is_truthy))
}

/// Truthiness of a submitted value: null, false, zero and the empty string do not count.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(pairs: &[(&str, Value)]) -> PlayerInputs {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn missing_room_is_never_satisfied() {
        assert!(!has_all_inputs(None, &inputs(&[("oxygen", json!(true))])));
    }

    #[test]
    fn missing_requirements_are_never_satisfied() {
        let room = RoomDefinition::default();
        assert!(!has_all_inputs(Some(&room), &PlayerInputs::new()));
    }

    #[test]
    fn empty_requirements_are_vacuously_satisfied() {
        let room = RoomDefinition::requiring(Vec::<String>::new());
        assert!(has_all_inputs(Some(&room), &PlayerInputs::new()));
    }

    #[test]
    fn every_required_key_must_be_truthy() {
        let room = RoomDefinition::requiring(["oxygen-levels", "door-code"]);

        let partial = inputs(&[("oxygen-levels", json!("42%"))]);
        assert!(!has_all_inputs(Some(&room), &partial));

        let falsy = inputs(&[("oxygen-levels", json!("42%")), ("door-code", json!(""))]);
        assert!(!has_all_inputs(Some(&room), &falsy));

        let complete = inputs(&[("oxygen-levels", json!("42%")), ("door-code", json!(1234))]);
        assert!(has_all_inputs(Some(&room), &complete));
    }

    #[test]
    fn unrelated_keys_do_not_change_the_result() {
        let room = RoomDefinition::requiring(["door-code"]);

        let mut provided = inputs(&[("door-code", json!(false))]);
        assert!(!has_all_inputs(Some(&room), &provided));
        provided.insert("radio".into(), json!(true));
        assert!(!has_all_inputs(Some(&room), &provided));

        provided.insert("door-code".into(), json!(true));
        assert!(has_all_inputs(Some(&room), &provided));
        provided.insert("map".into(), json!(null));
        assert!(has_all_inputs(Some(&room), &provided));
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(is_truthy(&json!(-1)));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn definition_deserializes_from_camel_case() {
        let room: RoomDefinition =
            serde_json::from_value(json!({"requiredInputs": ["a", "b"]})).unwrap();
        assert_eq!(room, RoomDefinition::requiring(["a", "b"]));

        let room: RoomDefinition = serde_json::from_value(json!({})).unwrap();
        assert_eq!(room.required_inputs, None);
    }
}
