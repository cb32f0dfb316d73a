use crate::value::ExportedValue;
use indexmap::IndexMap;
use serde::Serialize;

/// Group that leaves exported directly on the module value belong to.
pub const ROOT_GROUP: &str = "default";

/// One leaf of the flattened structure, as the template sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarEntry {
    pub key_name: String,
    pub key_value: String,
}
impl VarEntry {
    pub fn new(key_name: impl Into<String>, key_value: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            key_value: key_value.into(),
        }
    }
}

/// Group name to its leaves, both in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VarMap(IndexMap<String, Vec<VarEntry>>);
impl VarMap {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn get(&self, group: &str) -> Option<&[VarEntry]> {
        self.0.get(group).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[VarEntry])> {
        self.0
            .iter()
            .map(|(group, entries)| (group.as_str(), entries.as_slice()))
    }

    /// Renames a group in place, keeping its position.
    pub fn rename(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        if let Some((index, _, entries)) = self.0.shift_remove_full(from) {
            self.0.shift_insert(index, to.to_string(), entries);
        }
    }

    fn push(&mut self, group: &str, entry: VarEntry) {
        self.0.entry(group.to_string()).or_default().push(entry);
    }
}

/// Flattens an exported value into groups of leaves.
///
/// Every nested object's direct leaf children are attributed to the group named after the
/// property holding that object; leaves directly on `value` go to [`ROOT_GROUP`]. Groups
/// named by the same property in different branches are merged. `None` means there is
/// nothing to render.
pub fn flatten(value: &ExportedValue) -> Option<VarMap> {
    let mut map = VarMap::default();

    walk(value, ROOT_GROUP, &mut map);

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn walk(value: &ExportedValue, group: &str, map: &mut VarMap) {
    for (key, child) in value.entries() {
        if child.is_nested() {
            walk(child, &key, map);
        } else {
            map.push(group, VarEntry::new(key, child.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(entries: Vec<(&str, ExportedValue)>) -> ExportedValue {
        ExportedValue::object(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }

    fn text(value: &str) -> ExportedValue {
        ExportedValue::String(value.to_string())
    }

    #[test]
    fn groups_by_top_level_keys() {
        let value = object(vec![
            (
                "colors",
                object(vec![("primary", text("#fff")), ("secondary", text("#000"))]),
            ),
            ("sizes", object(vec![("gutter", ExportedValue::Int(16))])),
        ]);

        let map = flatten(&value).unwrap();

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["colors", "sizes"]);
        assert_eq!(
            map.get("colors").unwrap(),
            &[VarEntry::new("primary", "#fff"), VarEntry::new("secondary", "#000")]
        );
        assert_eq!(map.get("sizes").unwrap(), &[VarEntry::new("gutter", "16")]);
    }

    #[test]
    fn sibling_leaves_stay_with_their_own_group() {
        // `spacing` comes after the nested `colors` object but still belongs to `theme`
        let value = object(vec![(
            "theme",
            object(vec![
                ("colors", object(vec![("primary", text("red"))])),
                ("spacing", ExportedValue::Int(4)),
            ]),
        )]);

        let map = flatten(&value).unwrap();

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["colors", "theme"]);
        assert_eq!(map.get("colors").unwrap(), &[VarEntry::new("primary", "red")]);
        assert_eq!(map.get("theme").unwrap(), &[VarEntry::new("spacing", "4")]);
    }

    #[test]
    fn top_level_leaves_use_root_group() {
        let value = object(vec![("primary", text("#fff")), ("enabled", ExportedValue::Bool(true))]);

        let map = flatten(&value).unwrap();

        assert_eq!(
            map.get(ROOT_GROUP).unwrap(),
            &[VarEntry::new("primary", "#fff"), VarEntry::new("enabled", "true")]
        );
    }

    #[test]
    fn arrays_of_scalars_are_leaves_and_nested_arrays_are_walked() {
        let value = object(vec![(
            "fonts",
            object(vec![
                ("stack", ExportedValue::Array(vec![text("Arial"), text("sans-serif")])),
                (
                    "weights",
                    ExportedValue::Array(vec![object(vec![("bold", ExportedValue::Int(700))])]),
                ),
            ]),
        )]);

        let map = flatten(&value).unwrap();

        assert_eq!(map.get("fonts").unwrap(), &[VarEntry::new("stack", "Arial,sans-serif")]);
        assert_eq!(map.get("0").unwrap(), &[VarEntry::new("bold", "700")]);
    }

    #[test]
    fn empty_and_null_values_have_nothing_to_render() {
        assert_eq!(flatten(&ExportedValue::Null), None);
        assert_eq!(flatten(&object(vec![])), None);
        assert_eq!(flatten(&object(vec![("empty", object(vec![]))])), None);
        assert_eq!(flatten(&ExportedValue::Int(3)), None);
    }

    #[test]
    fn each_call_starts_from_a_fresh_map() {
        let first = object(vec![("a", object(vec![("x", ExportedValue::Int(1))]))]);
        let second = object(vec![("b", object(vec![("y", ExportedValue::Int(2))]))]);

        flatten(&first).unwrap();
        let map = flatten(&second).unwrap();

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn rename_keeps_position() {
        let value = object(vec![
            ("a", object(vec![("x", ExportedValue::Int(1))])),
            ("b", object(vec![("y", ExportedValue::Int(2))])),
        ]);
        let mut map = flatten(&value).unwrap();

        map.rename("a", "first");

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["first", "b"]);
        assert_eq!(map.get("first").unwrap(), &[VarEntry::new("x", "1")]);
    }
}
