//! Declarations and fields bound to one plugin.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use crate::pipeline::{AnnotatedDecl, AnnotatedField};

use super::Options;

/// An annotated declaration matched against a plugin
#[derive(Debug, Clone)]
pub struct DeclEntity {
    pub decl: Arc<AnnotatedDecl>,
    pub plugin: String,
    pub args: Vec<String>,
    pub options: Options,
}

impl DeclEntity {
    /// Field entities of this declaration for the same plugin.
    pub fn parse_fields(
        &self,
        args_count: usize,
        options: &BTreeMap<String, String>,
    ) -> FieldEntities {
        (0..self.decl.fields.len())
            .flat_map(|i| self.decl.bind_field(i, &self.plugin, args_count, options))
            .collect()
    }
}

impl Deref for DeclEntity {
    type Target = AnnotatedDecl;

    fn deref(&self) -> &Self::Target {
        &self.decl
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeclEntities(Vec<DeclEntity>);

impl DeclEntities {
    pub fn new(entities: Vec<DeclEntity>) -> Self {
        Self(entities)
    }

    pub fn into_inner(self) -> Vec<DeclEntity> {
        self.0
    }

    /// Entities keyed by the directory of their declaring file
    pub fn group_by_dir(&self) -> BTreeMap<String, DeclEntities> {
        self.group_by(|e| e.dir().to_string_lossy().into_owned())
    }

    /// Entities keyed by `key`; entities with an empty key are dropped.
    pub fn group_by<F>(&self, key: F) -> BTreeMap<String, DeclEntities>
    where
        F: Fn(&DeclEntity) -> String,
    {
        let mut groups: BTreeMap<String, DeclEntities> = BTreeMap::new();
        for entity in &self.0 {
            let k = key(entity);
            if k.is_empty() {
                continue;
            }
            groups.entry(k).or_default().0.push(entity.clone());
        }
        groups
    }
}

impl Deref for DeclEntities {
    type Target = [DeclEntity];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<DeclEntity> for DeclEntities {
    fn from_iter<T: IntoIterator<Item = DeclEntity>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for DeclEntities {
    type Item = DeclEntity;
    type IntoIter = std::vec::IntoIter<DeclEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DeclEntities {
    type Item = &'a DeclEntity;
    type IntoIter = std::slice::Iter<'a, DeclEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// An annotated field matched against a plugin
#[derive(Debug, Clone)]
pub struct FieldEntity {
    /// Owning declaration
    pub decl: Arc<AnnotatedDecl>,
    /// Position in `decl.fields`
    pub index: usize,
    pub args: Vec<String>,
    pub options: Options,
}

impl FieldEntity {
    pub fn field(&self) -> &AnnotatedField {
        &self.decl.fields[self.index]
    }
}

impl Deref for FieldEntity {
    type Target = AnnotatedField;

    fn deref(&self) -> &Self::Target {
        self.field()
    }
}

pub type FieldEntities = Vec<FieldEntity>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Caches;
    use crate::pipeline::extract_decls;
    use crate::plugin::{Plugin, PluginArgs};
    use crate::source::Parser;
    use std::path::Path;

    struct Column;

    impl Plugin for Column {
        fn name(&self) -> &str {
            "model"
        }

        fn args(&self) -> PluginArgs {
            PluginArgs::new(&["table:table name"], &[("soft", "soft delete")])
        }

        fn description(&self) -> &str {
            "test plugin"
        }

        fn run(&self, _entities: DeclEntities) -> crate::error::Result<()> {
            Ok(())
        }
    }

    const SOURCE: &str = r#"package models

// User is a user.
// +gen:model:users:soft
// +gen:model
// +gen:other:x
type User struct {
	// +gen:model:id:pk
	ID int
	// +gen:model:name
	// +gen:model
	Name string
	Age int
}

// +gen:model:orders
type Order struct{}
"#;

    fn entities() -> DeclEntities {
        let parser = Parser::new(Arc::new(Caches::new()));
        let unit = Arc::new(
            parser
                .parse_source(Path::new("/src/app/models/user.go"), SOURCE)
                .unwrap(),
        );
        let mut ext = BTreeMap::new();
        ext.insert("dialect".to_string(), "pg".to_string());
        extract_decls(&unit, "+gen:").parse(&Column, &ext)
    }

    #[test]
    fn test_parse_skips_non_matching_lines() {
        let entities = entities();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].name(), "User");
        assert_eq!(entities[0].args, vec!["users"]);
        assert!(entities[0].options.exist("soft"));
        assert_eq!(entities[0].options.get("dialect", ""), "pg");
        assert_eq!(entities[1].name(), "Order");
        assert_eq!(entities[1].plugin, "model");
    }

    #[test]
    fn test_parse_fields() {
        let entities = entities();
        let fields = entities[0].parse_fields(1, &BTreeMap::new());
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name(), "ID");
        assert_eq!(fields[0].args, vec!["id"]);
        assert!(fields[0].options.exist("pk"));
        assert_eq!(fields[1].name(), "Name");
        assert_eq!(fields[1].args, vec!["name"]);
        assert!(Arc::ptr_eq(&fields[0].decl, &entities[0].decl));
    }

    #[test]
    fn test_group_by_dir() {
        let groups = entities().group_by_dir();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["/src/app/models"].len(), 2);
    }

    #[test]
    fn test_group_by_drops_empty_keys() {
        let groups = entities().group_by(|e| {
            if e.name() == "User" {
                String::new()
            } else {
                e.name().to_lowercase()
            }
        });
        assert_eq!(groups.len(), 1);
        assert!(groups.contains_key("order"));
    }
}
