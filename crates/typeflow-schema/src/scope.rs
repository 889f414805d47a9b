//! # Scopes and References
//!
//! A [`ScopeType`] owns a table of object definitions keyed by id plus a
//! root id. Its operations delegate to the root object with the path
//! extended by the root id, and make itself the enclosing scope of the
//! [`Cursor`] passed down.
//!
//! A [`RefType`] stores only an object id. It resolves against the
//! innermost enclosing scope each time it is used, which is what allows
//! self-referential and mutually recursive definitions: the graph is a
//! tree of owned definitions plus named edges, never a cycle of owners.
//!
//! ## Linking
//!
//! [`ScopeType::new`] runs a link pass before handing the scope out:
//! every reference reachable from the scope's objects must resolve, unions
//! whose members sit behind references must satisfy the discriminator
//! rules, and every default and example must decode against its property
//! type. Nested scopes are not entered; they linked themselves.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use typeflow_core::{BuildError, ConstraintError, FieldPath, Identifier, TypedValue};

use crate::node::{Cursor, Node, TypeNode};
use crate::object::ObjectType;

/// A named, non-owning edge to an object of the enclosing scope.
#[derive(Debug, Clone, Serialize)]
pub struct RefType {
    id: Identifier,
}

impl RefType {
    pub fn new(id: &str) -> Result<Self, BuildError> {
        Ok(Self {
            id: Identifier::new(id)?,
        })
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Node for RefType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        cx.lookup(self.id())?.decode_in(raw, cx)
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        cx.lookup(self.id())?.validate_in(value, cx)
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        cx.lookup(self.id())?.encode_in(value, cx)
    }
}

/// An owning table of object definitions with a designated root.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeType {
    root: Identifier,
    objects: IndexMap<Identifier, ObjectType>,
}

impl ScopeType {
    /// Assemble and link a scope.
    pub fn new(
        root: &str,
        objects: impl IntoIterator<Item = ObjectType>,
    ) -> Result<Self, BuildError> {
        let root = Identifier::new(root)?;
        let mut table = IndexMap::new();
        for object in objects {
            let id = Identifier::new(object.id())?;
            if table.contains_key(&id) {
                return Err(BuildError::bad_argument(format!(
                    "duplicate object ID '{id}' in scope"
                )));
            }
            table.insert(id, object);
        }
        if !table.contains_key(&root) {
            return Err(BuildError::bad_argument(format!(
                "root object '{root}' is not defined in the scope"
            )));
        }
        let scope = Self {
            root,
            objects: table,
        };
        scope.link()?;
        tracing::debug!(
            root = %scope.root,
            objects = scope.objects.len(),
            "scope linked"
        );
        Ok(scope)
    }

    fn link(&self) -> Result<(), BuildError> {
        for (id, object) in &self.objects {
            let base = FieldPath::root().child(id.as_str());
            let cx = Cursor::new(base.clone(), Some(self));
            for (name, property) in object.properties() {
                let path = base.child(name.as_str());
                let mut linked = Ok(());
                property.ty().walk(&mut |node: &TypeNode| {
                    if linked.is_err() {
                        return;
                    }
                    linked = match node {
                        TypeNode::Ref(r) if self.object(r.id()).is_none() => {
                            Err(BuildError::invalid(
                                path.clone(),
                                format!("reference to undefined object '{}'", r.id()),
                            ))
                        }
                        TypeNode::OneOfString(union) => union.check_linked(self, &path),
                        TypeNode::OneOfInt(union) => union.check_linked(self, &path),
                        TypeNode::Object(inline) => self.check_inline_samples(inline, &path),
                        _ => Ok(()),
                    };
                });
                linked?;
                property.check_samples(&path, Some(&cx.child(name.as_str())))?;
            }
        }
        Ok(())
    }

    /// Samples of an object nested inside a property. Those whose type
    /// holds a reference were skipped when the object was built.
    fn check_inline_samples(&self, inline: &ObjectType, path: &FieldPath) -> Result<(), BuildError> {
        for (name, property) in inline.properties() {
            let path = path.child(name.as_str());
            let cx = Cursor::new(path.clone(), Some(self));
            property.check_samples(&path, Some(&cx))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &str {
        self.root.as_str()
    }

    pub fn objects(&self) -> &IndexMap<Identifier, ObjectType> {
        &self.objects
    }

    pub fn object(&self, id: &str) -> Option<&ObjectType> {
        self.objects.get(id)
    }

    pub fn root_object(&self) -> Option<&ObjectType> {
        self.objects.get(&self.root)
    }

    /// The root object and a cursor positioned inside this scope.
    fn enter<'a>(&'a self, cx: &Cursor<'_>) -> Result<(&'a ObjectType, Cursor<'a>), ConstraintError> {
        let inner = Cursor::new(cx.path().child(self.root.as_str()), Some(self));
        let root = self
            .root_object()
            .ok_or_else(|| inner.fail(format!("Root object '{}' is missing", self.root)))?;
        Ok((root, inner))
    }
}

impl Node for ScopeType {
    fn decode_in(&self, raw: &Value, cx: &Cursor<'_>) -> Result<TypedValue, ConstraintError> {
        let (root, inner) = self.enter(cx)?;
        root.decode_in(raw, &inner)
    }

    fn validate_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<(), ConstraintError> {
        let (root, inner) = self.enter(cx)?;
        root.validate_in(value, &inner)
    }

    fn encode_in(&self, value: &TypedValue, cx: &Cursor<'_>) -> Result<Value, ConstraintError> {
        let (root, inner) = self.enter(cx)?;
        root.encode_in(value, &inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ListType;
    use crate::object::PropertyType;
    use crate::scalar::{IntType, StringType};
    use serde_json::json;
    use typeflow_core::Record;

    fn linked_list() -> ScopeType {
        let node = ObjectType::new(
            "Node",
            [
                ("value", PropertyType::new(IntType::new()).required()),
                ("next", PropertyType::new(TypeNode::reference("Node").unwrap())),
            ],
        )
        .unwrap();
        ScopeType::new("Node", [node]).unwrap()
    }

    #[test]
    fn recursive_chain_round_trips() {
        let scope = linked_list();
        let raw = json!({"value": 1, "next": {"value": 2, "next": {"value": 3}}});
        let value = scope.decode(&raw).unwrap();

        let expected = Record::new("Node").with("value", 1i64).with(
            "next",
            Record::new("Node")
                .with("value", 2i64)
                .with("next", Record::new("Node").with("value", 3i64)),
        );
        assert_eq!(value, TypedValue::Object(expected));
        assert!(scope.validate(&value).is_ok());
        assert_eq!(scope.encode(&value), Ok(raw));
    }

    #[test]
    fn errors_are_prefixed_with_the_root_id() {
        let scope = linked_list();
        let err = scope
            .decode(&json!({"value": 1, "next": {"value": 2, "next": {}}}))
            .unwrap_err();
        assert_eq!(err.segments(), ["Node", "next", "next", "value"]);
        assert_eq!(err.msg, "This field is required");
    }

    #[test]
    fn mutual_recursion_resolves() {
        let a = ObjectType::new(
            "A",
            [("b", PropertyType::new(TypeNode::reference("B").unwrap()))],
        )
        .unwrap();
        let b = ObjectType::new(
            "B",
            [(
                "items",
                PropertyType::new(ListType::new(TypeNode::reference("A").unwrap())),
            )],
        )
        .unwrap();
        let scope = ScopeType::new("A", [a, b]).unwrap();
        let raw = json!({"b": {"items": [{}, {"b": {"items": []}}]}});
        let value = scope.decode(&raw).unwrap();
        assert_eq!(scope.encode(&value), Ok(raw));
    }

    #[test]
    fn link_rejects_dangling_references() {
        let a = ObjectType::new(
            "A",
            [("b", PropertyType::new(TypeNode::reference("Missing").unwrap()))],
        )
        .unwrap();
        let err = ScopeType::new("A", [a]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid schema definition at 'A -> b': reference to undefined object 'Missing'"
        );
    }

    #[test]
    fn build_rejects_duplicates_and_missing_root() {
        let a = || ObjectType::new("A", [("x", PropertyType::new(IntType::new()))]).unwrap();
        assert!(ScopeType::new("A", [a(), a()]).is_err());
        assert!(ScopeType::new("B", [a()]).is_err());
        assert!(ScopeType::new("A", [a()]).is_ok());
    }

    #[test]
    fn defaults_behind_references_are_checked_at_link() {
        let leaf = ObjectType::new("Leaf", [("n", PropertyType::new(IntType::new()))]).unwrap();
        let good = ObjectType::new(
            "Root",
            [(
                "leaf",
                PropertyType::new(TypeNode::reference("Leaf").unwrap()).default_json(r#"{"n": 1}"#),
            )],
        )
        .unwrap();
        assert!(ScopeType::new("Root", [good, leaf.clone()]).is_ok());

        let bad = ObjectType::new(
            "Root",
            [(
                "leaf",
                PropertyType::new(TypeNode::reference("Leaf").unwrap()).default_json(r#"{"n": "x"}"#),
            )],
        )
        .unwrap();
        assert!(ScopeType::new("Root", [bad, leaf]).is_err());
    }

    #[test]
    fn defaults_inside_inline_objects_are_checked_at_link() {
        let leaf = ObjectType::new("Leaf", [("n", PropertyType::new(IntType::new()))]).unwrap();
        let root = |default: &str| {
            let inline = ObjectType::new(
                "Inline",
                [(
                    "leaf",
                    PropertyType::new(TypeNode::reference("Leaf").unwrap()).default_json(default),
                )],
            )
            .unwrap();
            let listed = ListType::new(inline.clone());
            ObjectType::new(
                "Root",
                [
                    ("inner", PropertyType::new(inline)),
                    ("many", PropertyType::new(listed)),
                ],
            )
            .unwrap()
        };
        assert!(ScopeType::new("Root", [root(r#"{"n": 1}"#), leaf.clone()]).is_ok());

        let err = ScopeType::new("Root", [root(r#"{"n": "x"}"#), leaf]).unwrap_err();
        match err {
            BuildError::InvalidDefinition { path, .. } => {
                assert_eq!(path.segments(), ["Root", "inner", "leaf"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nested_scope_resolves_its_own_references() {
        let inner_item =
            ObjectType::new("Item", [("name", PropertyType::new(StringType::new()))]).unwrap();
        let inner = ScopeType::new("Item", [inner_item]).unwrap();
        // The outer scope also defines "Item" with a different shape; the
        // nested scope must not see it.
        let outer_item = ObjectType::new("Item", [("n", PropertyType::new(IntType::new()))]).unwrap();
        let outer_root = ObjectType::new(
            "Outer",
            [
                ("nested", PropertyType::new(inner)),
                ("item", PropertyType::new(TypeNode::reference("Item").unwrap())),
            ],
        )
        .unwrap();
        let outer = ScopeType::new("Outer", [outer_root, outer_item]).unwrap();
        let value = outer
            .decode(&json!({"nested": {"name": "x"}, "item": {"n": 1}}))
            .unwrap();
        assert!(outer.validate(&value).is_ok());
        let err = outer.decode(&json!({"nested": {"n": 1}})).unwrap_err();
        assert_eq!(err.segments(), ["Outer", "nested", "Item"]);
    }

    #[test]
    fn reference_outside_a_scope_fails_at_call_time() {
        let node = TypeNode::reference("Node").unwrap();
        let err = node.decode(&json!({})).unwrap_err();
        assert!(err.msg.starts_with("Unresolved reference 'Node'"));
    }

    #[test]
    fn serialises_objects_by_id() {
        let scope = linked_list();
        let doc = serde_json::to_value(&scope).unwrap();
        assert_eq!(doc["root"], json!("Node"));
        assert_eq!(
            doc["objects"]["Node"]["properties"]["next"]["type"],
            json!({"type_id": "ref", "id": "Node"})
        );
    }
}
