//! Declarative field mapping between the canonical tree and a backend tree.
//!
//! An [`EntityMap`] is a table of [`FieldRule`]s. Each rule names a canonical
//! source path and one [`Policy`] per backend. [`EntityMap::render`] walks the
//! table canonical → wire; [`EntityMap::parse`] walks the same table wire →
//! canonical. Rendering a present field whose policy is
//! [`Policy::RejectIfPresent`] is a configuration error naming the field.

use serde_json::{Map, Value};
use std::fmt;

use super::path;
use crate::backend::{Backend, BackendProfile};
use crate::error::{GenAiError, Result};
use crate::naming::{self, ResourceKind};

pub type Path = &'static [&'static str];

#[derive(Clone, Copy)]
pub enum Policy {
    /// Same path on both sides.
    Copy,
    /// Value moves to another path.
    Rename(Path),
    /// Value keeps its name but moves under a parent object.
    NestUnder(Path),
    /// The backend cannot carry the field.
    RejectIfPresent,
    /// Value (or each array element) is an entity with its own table.
    Delegate(&'static EntityMap),
    /// Like [`Policy::Delegate`], at another path.
    DelegateTo(Path, &'static EntityMap),
    /// Value is an object whose every member is an entity.
    DelegateValues(&'static EntityMap),
    /// Value is a resource name resolved against the backend on render.
    Resource(Path, ResourceKind),
}

#[derive(Clone, Copy)]
pub struct FieldRule {
    pub source: Path,
    pub developer: Policy,
    pub cloud: Policy,
}

impl FieldRule {
    /// Same policy on both backends.
    pub const fn both(source: Path, policy: Policy) -> Self {
        Self {
            source,
            developer: policy,
            cloud: policy,
        }
    }

    pub const fn cloud_only(source: Path, policy: Policy) -> Self {
        Self {
            source,
            developer: Policy::RejectIfPresent,
            cloud: policy,
        }
    }

    pub const fn split(source: Path, developer: Policy, cloud: Policy) -> Self {
        Self {
            source,
            developer,
            cloud,
        }
    }

    #[must_use]
    pub fn policy(&self, backend: Backend) -> Policy {
        match backend {
            Backend::Developer => self.developer,
            Backend::Cloud => self.cloud,
        }
    }

    /// The field's own name: the last source segment.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.source.last().copied().unwrap_or_default()
    }

    fn wire_path(&self, backend: Backend) -> Option<Vec<&'static str>> {
        match self.policy(backend) {
            Policy::Copy | Policy::Delegate(_) | Policy::DelegateValues(_) => {
                Some(self.source.to_vec())
            }
            Policy::Rename(target)
            | Policy::DelegateTo(target, _)
            | Policy::Resource(target, _) => Some(target.to_vec()),
            Policy::NestUnder(parent) => {
                let mut target = parent.to_vec();
                target.push(self.field());
                Some(target)
            }
            Policy::RejectIfPresent => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Render,
    Parse,
}

pub struct EntityMap {
    pub name: &'static str,
    pub rules: &'static [FieldRule],
}

impl fmt::Debug for EntityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMap")
            .field("name", &self.name)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl EntityMap {
    /// Canonical tree → backend tree.
    ///
    /// # Errors
    /// Returns a configuration error for a field the backend does not
    /// support, or for a canonical field no rule covers.
    pub fn render(&self, canonical: &Value, profile: &BackendProfile) -> Result<Value> {
        let sources: Vec<Path> = self.rules.iter().map(|r| r.source).collect();
        check_known_fields(self.name, canonical, &sources, 0)?;

        let mut out = Value::Object(Map::new());
        for rule in self.rules {
            let Some(value) = path::get_present(canonical, rule.source) else {
                continue;
            };
            let Some(target) = rule.wire_path(profile.backend) else {
                return Err(GenAiError::unsupported_field(rule.field(), profile.backend));
            };
            let mapped = map_value(
                rule.policy(profile.backend),
                value,
                profile,
                Direction::Render,
            )?;
            path::set(&mut out, &target, mapped);
        }
        Ok(out)
    }

    /// Backend tree → canonical tree. Fields the backend cannot carry, and
    /// wire fields no rule names, are ignored.
    ///
    /// # Errors
    /// Only resource resolution can fail, and it is not applied on parse, so
    /// errors here come from nested tables.
    pub fn parse(&self, wire: &Value, profile: &BackendProfile) -> Result<Value> {
        let mut out = Value::Object(Map::new());
        for rule in self.rules {
            let Some(wire_path) = rule.wire_path(profile.backend) else {
                continue;
            };
            let Some(value) = path::get_present(wire, &wire_path) else {
                continue;
            };
            let mapped = map_value(rule.policy(profile.backend), value, profile, Direction::Parse)?;
            path::set(&mut out, rule.source, mapped);
        }
        Ok(out)
    }

    fn apply(
        &self,
        value: &Value,
        profile: &BackendProfile,
        direction: Direction,
    ) -> Result<Value> {
        match direction {
            Direction::Render => self.render(value, profile),
            Direction::Parse => self.parse(value, profile),
        }
    }
}

fn map_value(
    policy: Policy,
    value: &Value,
    profile: &BackendProfile,
    direction: Direction,
) -> Result<Value> {
    match policy {
        Policy::Copy | Policy::Rename(_) | Policy::NestUnder(_) | Policy::RejectIfPresent => {
            Ok(value.clone())
        }
        Policy::Delegate(map) | Policy::DelegateTo(_, map) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| map.apply(item, profile, direction))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => map.apply(other, profile, direction),
        },
        Policy::DelegateValues(map) => match value {
            Value::Object(members) => {
                let mut out = Map::with_capacity(members.len());
                for (key, member) in members {
                    out.insert(key.clone(), map.apply(member, profile, direction)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        },
        Policy::Resource(_, kind) => match (direction, value.as_str()) {
            (Direction::Render, Some(name)) => {
                naming::resolve(profile, kind, name).map(Value::from)
            }
            (Direction::Render, None) => Err(GenAiError::config(format!(
                "expected a resource name string, got {value}"
            ))),
            (Direction::Parse, _) => Ok(value.clone()),
        },
    }
}

/// Every non-null member of `value` must be named by some source path.
fn check_known_fields(entity: &str, value: &Value, sources: &[Path], depth: usize) -> Result<()> {
    let Value::Object(members) = value else {
        return Ok(());
    };
    for (key, child) in members {
        if child.is_null() {
            continue;
        }
        let matching: Vec<Path> = sources
            .iter()
            .copied()
            .filter(|s| s.len() > depth && s[depth] == key)
            .collect();
        if matching.is_empty() {
            return Err(GenAiError::Configuration {
                message: format!("{key} is not a recognised {entity} field"),
                field: Some(key.clone()),
            });
        }
        if matching.iter().any(|s| s.len() == depth + 1) {
            continue;
        }
        check_known_fields(entity, child, &matching, depth + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static INNER: EntityMap = EntityMap {
        name: "Inner",
        rules: &[
            FieldRule::both(&["value"], Policy::Copy),
            FieldRule::cloud_only(&["secret"], Policy::Copy),
        ],
    };

    static OUTER: EntityMap = EntityMap {
        name: "Outer",
        rules: &[
            FieldRule::both(&["name"], Policy::Rename(&["displayName"])),
            FieldRule::both(&["config", "speed"], Policy::NestUnder(&["settings"])),
            FieldRule::both(&["items"], Policy::Delegate(&INNER)),
            FieldRule::both(&["byKey"], Policy::DelegateValues(&INNER)),
            FieldRule::split(&["legacy"], Policy::Rename(&["old"]), Policy::Copy),
            FieldRule::both(&["nested"], Policy::Delegate(&OUTER)),
        ],
    };

    fn dev() -> BackendProfile {
        BackendProfile::developer()
    }

    fn cloud() -> BackendProfile {
        BackendProfile::cloud("p", "l")
    }

    #[test]
    fn test_render_applies_each_policy() {
        let canonical = json!({
            "name": "a",
            "config": {"speed": 3},
            "items": [{"value": 1}, {"value": 2}],
            "byKey": {"k": {"value": 9}},
            "legacy": true,
            "nested": {"name": "b"}
        });
        let wire = OUTER.render(&canonical, &dev()).unwrap();
        assert_eq!(
            wire,
            json!({
                "displayName": "a",
                "settings": {"speed": 3},
                "items": [{"value": 1}, {"value": 2}],
                "byKey": {"k": {"value": 9}},
                "old": true,
                "nested": {"displayName": "b"}
            })
        );
    }

    #[test]
    fn test_parse_reverses_render() {
        let canonical = json!({
            "name": "a",
            "config": {"speed": 3},
            "items": [{"value": 1, "secret": "s"}],
            "legacy": false
        });
        let wire = OUTER.render(&canonical, &cloud()).unwrap();
        assert_eq!(OUTER.parse(&wire, &cloud()).unwrap(), canonical);
    }

    #[test]
    fn test_reject_names_nested_field() {
        let canonical = json!({"items": [{"value": 1, "secret": "s"}]});
        let err = OUTER.render(&canonical, &dev()).unwrap_err();
        assert_eq!(err.field(), Some("secret"));
        assert!(OUTER.render(&canonical, &cloud()).is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = OUTER
            .render(&json!({"config": {"speed": 1, "color": "red"}}), &dev())
            .unwrap_err();
        assert_eq!(err.field(), Some("color"));
    }

    #[test]
    fn test_parse_ignores_unsupported_and_unknown_wire_fields() {
        let wire = json!({"items": [{"value": 1, "secret": "s"}], "extra": 5});
        assert_eq!(
            OUTER.parse(&wire, &dev()).unwrap(),
            json!({"items": [{"value": 1}]})
        );
    }

    #[test]
    fn test_null_fields_are_absent() {
        let wire = OUTER.render(&json!({"name": null}), &dev()).unwrap();
        assert_eq!(wire, json!({}));
    }
}
