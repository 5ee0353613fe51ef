//! Schema declarations for resources and data sources.
//!
//! A [`Schema`] tells the host which attributes a resource accepts, which are
//! computed by Azure, which force replacement, and which are secret. It can
//! also check a JSON configuration against itself, which the adapter layer
//! does before calling into ARM.
//!
//! ```rust
//! use azure_cognitive_core::schema::{Attribute, Block, Schema};
//!
//! let schema = Schema::new()
//!     .attribute("name", Attribute::required_string().force_new())
//!     .attribute("description", Attribute::optional_string())
//!     .attribute("id", Attribute::computed_string())
//!     .block("model", Block::single(true, Schema::new()
//!         .attribute("format", Attribute::required_string())));
//!
//! assert!(schema.validate(&serde_json::json!({
//!     "name": "a",
//!     "model": [{"format": "OpenAI"}]
//! })).is_ok());
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{ProviderError, ProviderResult};

/// The value type of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "element")]
pub enum AttributeType {
    String,
    Bool,
    Int,
    Float,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
}

impl AttributeType {
    fn matches(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;

        match (self, value) {
            (_, Value::Null) => true,
            (Self::String, Value::String(_)) => true,
            (Self::Bool, Value::Bool(_)) => true,
            (Self::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Float, Value::Number(_)) => true,
            (Self::List(inner) | Self::Set(inner), Value::Array(items)) => {
                items.iter().all(|item| inner.matches(item))
            }
            (Self::Map(inner), Value::Object(entries)) => {
                entries.values().all(|item| inner.matches(item))
            }
            _ => false,
        }
    }
}

/// How a single attribute behaves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub ty: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Attribute {
    fn new(ty: AttributeType, required: bool, optional: bool, computed: bool) -> Self {
        Self {
            ty,
            required,
            optional,
            computed,
            force_new: false,
            sensitive: false,
            default: None,
            description: None,
        }
    }

    pub fn required(ty: AttributeType) -> Self {
        Self::new(ty, true, false, false)
    }

    pub fn optional(ty: AttributeType) -> Self {
        Self::new(ty, false, true, false)
    }

    /// Set by Azure, never by configuration.
    pub fn computed(ty: AttributeType) -> Self {
        Self::new(ty, false, false, true)
    }

    /// Optional in configuration, filled from Azure when omitted.
    pub fn optional_computed(ty: AttributeType) -> Self {
        Self::new(ty, false, true, true)
    }

    pub fn required_string() -> Self {
        Self::required(AttributeType::String)
    }

    pub fn optional_string() -> Self {
        Self::optional(AttributeType::String)
    }

    pub fn computed_string() -> Self {
        Self::computed(AttributeType::String)
    }

    pub fn optional_bool() -> Self {
        Self::optional(AttributeType::Bool)
    }

    pub fn string_list() -> Self {
        Self::optional(AttributeType::List(Box::new(AttributeType::String)))
    }

    pub fn string_set() -> Self {
        Self::optional(AttributeType::Set(Box::new(AttributeType::String)))
    }

    pub fn string_map() -> Self {
        Self::optional(AttributeType::Map(Box::new(AttributeType::String)))
    }

    /// Changing the attribute replaces the resource.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// The value is secret and must not be shown in plans.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// How often a nested block may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NestingMode {
    List,
    Set,
}

/// A nested configuration block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub nesting: NestingMode,
    pub min_items: usize,
    pub max_items: Option<usize>,
    pub force_new: bool,
    pub schema: Schema,
}

impl Block {
    /// A block that appears at most once (`required` makes it exactly once).
    pub fn single(required: bool, schema: Schema) -> Self {
        Self {
            nesting: NestingMode::List,
            min_items: usize::from(required),
            max_items: Some(1),
            force_new: false,
            schema,
        }
    }

    /// An ordered, repeatable block.
    pub fn list(schema: Schema) -> Self {
        Self {
            nesting: NestingMode::List,
            min_items: 0,
            max_items: None,
            force_new: false,
            schema,
        }
    }

    /// An unordered, repeatable block.
    pub fn set(schema: Schema) -> Self {
        Self {
            nesting: NestingMode::Set,
            ..Self::list(schema)
        }
    }

    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = min;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }
}

/// Attributes and nested blocks of a resource or data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub version: u32,
    pub attributes: BTreeMap<String, Attribute>,
    pub blocks: BTreeMap<String, Block>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn block(mut self, name: impl Into<String>, block: Block) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Names of attributes marked sensitive, including nested ones (`a.b`).
    pub fn sensitive_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .attributes
            .iter()
            .filter(|(_, attr)| attr.sensitive)
            .map(|(name, _)| name.clone())
            .collect();
        for (name, block) in &self.blocks {
            paths.extend(
                block
                    .schema
                    .sensitive_paths()
                    .into_iter()
                    .map(|nested| format!("{name}.{nested}")),
            );
        }
        paths
    }

    /// Check a configuration object against the schema.
    ///
    /// Every problem is collected; the returned error lists all of them.
    pub fn validate(&self, config: &serde_json::Value) -> ProviderResult<()> {
        let mut problems = Vec::new();
        self.collect_problems("", config, &mut problems);

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Validation(problems.join("; ")))
        }
    }

    fn collect_problems(&self, prefix: &str, config: &serde_json::Value, problems: &mut Vec<String>) {
        let Some(object) = config.as_object() else {
            problems.push(format!("{}: expected an object", display_path(prefix, "")));
            return;
        };

        for (key, value) in object {
            let path = display_path(prefix, key);
            if let Some(attribute) = self.attributes.get(key) {
                if attribute.computed && !attribute.optional && !attribute.required {
                    if key != "id" && !value.is_null() {
                        problems.push(format!("{path}: computed attribute cannot be set"));
                    }
                    continue;
                }
                if !attribute.ty.matches(value) {
                    problems.push(format!("{path}: expected a value of type {:?}", attribute.ty));
                }
            } else if let Some(block) = self.blocks.get(key) {
                block.collect_problems(&path, value, problems);
            } else {
                problems.push(format!("{path}: unsupported argument"));
            }
        }

        for (name, attribute) in &self.attributes {
            if attribute.required && object.get(name).is_none_or(serde_json::Value::is_null) {
                problems.push(format!(
                    "{}: required argument is missing",
                    display_path(prefix, name)
                ));
            }
        }

        for (name, block) in &self.blocks {
            if block.min_items > 0 && object.get(name).is_none_or(serde_json::Value::is_null) {
                problems.push(format!(
                    "{}: at least {} block(s) required",
                    display_path(prefix, name),
                    block.min_items
                ));
            }
        }
    }
}

impl Block {
    fn collect_problems(&self, path: &str, value: &serde_json::Value, problems: &mut Vec<String>) {
        let items: Vec<&serde_json::Value> = match value {
            serde_json::Value::Null => Vec::new(),
            serde_json::Value::Array(items) => items.iter().collect(),
            // A single-item block may be given as a bare object.
            serde_json::Value::Object(_) if self.max_items == Some(1) => vec![value],
            _ => {
                problems.push(format!("{path}: expected a list of blocks"));
                return;
            }
        };

        if items.len() < self.min_items {
            problems.push(format!(
                "{path}: at least {} block(s) required, got {}",
                self.min_items,
                items.len()
            ));
        }
        if let Some(max) = self.max_items {
            if items.len() > max {
                problems.push(format!(
                    "{path}: at most {max} block(s) allowed, got {}",
                    items.len()
                ));
            }
        }

        for (index, item) in items.iter().enumerate() {
            self.schema
                .collect_problems(&format!("{path}.{index}"), item, problems);
        }
    }
}

fn display_path(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, true) => "<root>".to_string(),
        (true, false) => key.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}.{key}"),
    }
}
