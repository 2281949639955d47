use serde::{Deserialize, Serialize};

pub type MethodId = i64;

/// A single declared input or intermediate quantity of a research method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fields sharing a card index form one navigation ring.
    #[serde(default)]
    pub card_index: u32,
}

/// Method definition exactly as the catalog and schema endpoints deliver it.
///
/// Every list is optional on the wire; [`MethodRecord::normalized`] backfills
/// missing field lists so nothing downstream sees an undefined schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodRecord {
    pub id: MethodId,
    pub name: String,
    #[serde(default)]
    pub is_group: bool,
    /// Unit of the method's main result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_methods: Option<Vec<MethodRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_fields: Option<Vec<Field>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_fields: Option<Vec<Field>>,
}

impl MethodRecord {
    /// Applies the load-time defaults: absent field lists become empty, for
    /// the record itself and every sub-method.
    pub fn normalized(mut self) -> Self {
        self.input_fields.get_or_insert_with(Vec::new);
        self.intermediate_fields.get_or_insert_with(Vec::new);
        if let Some(members) = self.sub_methods.take() {
            self.sub_methods = Some(members.into_iter().map(Self::normalized).collect());
        }
        self
    }
}

/// A concrete, calculable research method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub id: MethodId,
    pub name: String,
    pub unit: Option<String>,
    pub input_fields: Vec<Field>,
    pub intermediate_fields: Vec<Field>,
}

impl Method {
    pub fn field(
        &self,
        name: &str,
    ) -> Option<&Field> {
        self.input_fields.iter().find(|f| f.name == name)
    }

    /// Input fields belonging to `card_index`, in declaration order.
    pub fn card_ring(
        &self,
        card_index: u32,
    ) -> impl Iterator<Item = &Field> {
        self.input_fields
            .iter()
            .filter(move |f| f.card_index == card_index)
    }
}

impl From<MethodRecord> for Method {
    fn from(record: MethodRecord) -> Self {
        let record = record.normalized();
        Self {
            id: record.id,
            name: record.name,
            unit: record.unit,
            input_fields: record.input_fields.unwrap_or_default(),
            intermediate_fields: record.intermediate_fields.unwrap_or_default(),
        }
    }
}

/// A named set of sub-methods presented as tabs; owns no fields of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodGroup {
    pub id: MethodId,
    pub name: String,
    pub members: Vec<Method>,
}

/// Top-level catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogEntry {
    Standalone(Method),
    Group(MethodGroup),
}

impl CatalogEntry {
    /// Converts a wire record into a catalog entry.
    ///
    /// Returns `None` for a group without members, since it can never
    /// provide a current method.
    pub fn from_record(record: MethodRecord) -> Option<Self> {
        let record = record.normalized();
        if !record.is_group {
            return Some(Self::Standalone(record.into()));
        }

        let members: Vec<Method> = record
            .sub_methods
            .unwrap_or_default()
            .into_iter()
            .map(Method::from)
            .collect();
        if members.is_empty() {
            return None;
        }

        Some(Self::Group(MethodGroup {
            id: record.id,
            name: record.name,
            members,
        }))
    }

    pub fn id(&self) -> MethodId {
        match self {
            Self::Standalone(method) => method.id,
            Self::Group(group) => group.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Standalone(method) => &method.name,
            Self::Group(group) => &group.name,
        }
    }

    /// Concrete methods reachable through this entry.
    pub fn methods(&self) -> &[Method] {
        match self {
            Self::Standalone(method) => std::slice::from_ref(method),
            Self::Group(group) => &group.members,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn field(
        name: &str,
        card_index: u32,
    ) -> Field {
        Field {
            name: name.to_string(),
            unit: None,
            description: None,
            card_index,
        }
    }

    #[test]
    fn record_without_field_lists_is_backfilled() {
        let record: MethodRecord =
            serde_json::from_str(r#"{"id": 3, "name": "Влажность"}"#).unwrap();

        let method = Method::from(record);

        assert!(method.input_fields.is_empty());
        assert!(method.intermediate_fields.is_empty());
    }

    #[test]
    fn normalization_reaches_sub_methods() {
        let record: MethodRecord = serde_json::from_str(
            r#"{"id": 1, "name": "Зола", "isGroup": true,
                "subMethods": [{"id": 11, "name": "Зола A"}]}"#,
        )
        .unwrap();

        let normalized = record.normalized();
        let members = normalized.sub_methods.unwrap();

        assert_eq!(members[0].input_fields, Some(Vec::new()));
        assert_eq!(members[0].intermediate_fields, Some(Vec::new()));
    }

    #[test]
    fn field_defaults_card_index_to_zero() {
        let parsed: Field = serde_json::from_str(r#"{"name": "m1", "unit": "г"}"#).unwrap();

        assert_eq!(parsed.card_index, 0);
        assert_eq!(parsed.unit.as_deref(), Some("г"));
    }

    #[test]
    fn group_record_becomes_group_entry() {
        let record = MethodRecord {
            id: 1,
            name: "Зола".to_string(),
            is_group: true,
            unit: None,
            sub_methods: Some(vec![MethodRecord {
                id: 11,
                name: "Зола A".to_string(),
                is_group: false,
                unit: Some("%".to_string()),
                sub_methods: None,
                input_fields: Some(vec![field("m1", 0)]),
                intermediate_fields: None,
            }]),
            input_fields: None,
            intermediate_fields: None,
        };

        let entry = CatalogEntry::from_record(record).unwrap();

        assert_eq!(entry.id(), 1);
        assert_eq!(entry.methods().len(), 1);
        assert_eq!(entry.methods()[0].unit.as_deref(), Some("%"));
    }

    #[test]
    fn empty_group_is_dropped() {
        let record = MethodRecord {
            id: 1,
            name: "Пустая группа".to_string(),
            is_group: true,
            unit: None,
            sub_methods: Some(Vec::new()),
            input_fields: None,
            intermediate_fields: None,
        };

        assert_eq!(CatalogEntry::from_record(record), None);
    }

    #[test]
    fn card_ring_keeps_declaration_order() {
        let method = Method {
            id: 5,
            name: "Плотность".to_string(),
            unit: None,
            input_fields: vec![field("a", 0), field("b", 1), field("c", 0)],
            intermediate_fields: Vec::new(),
        };

        let names: Vec<_> = method.card_ring(0).map(|f| f.name.as_str()).collect();

        assert_eq!(names, vec!["a", "c"]);
    }
}
