use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFamily {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    /// Decision paths are `{rule_prefix}/validate|options|bom`.
    pub rule_prefix: String,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    pub code: String,
    pub family_code: String,
    pub name: String,
    pub variant: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub active: bool,
}

/// Product type with its family resolved, as needed to address the rules
/// engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTypeProfile {
    pub product_type: ProductType,
    pub family: ProductFamily,
}

impl ProductTypeProfile {
    pub fn rule_prefix(&self) -> &str {
        &self.family.rule_prefix
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterDataType {
    Number,
    Decimal,
    Integer,
    Boolean,
    Text,
    Select,
    Other(String),
}

impl ParameterDataType {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "number" => Self::Number,
            "decimal" => Self::Decimal,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "string" | "text" => Self::Text,
            "enum" | "select" => Self::Select,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number | Self::Decimal | Self::Integer)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductParameter {
    pub product_type_code: String,
    pub code: String,
    pub name: String,
    /// Declared type as stored in the catalog, e.g. `integer` or `select`.
    pub data_type: String,
    pub unit: Option<String>,
    pub step_number: i32,
    pub step_name: Option<String>,
    pub display_order: i32,
    pub required: bool,
    pub active: bool,
    pub default_value: Option<String>,
    pub depends_on: Vec<String>,
    pub metadata: Option<Value>,
}

impl ProductParameter {
    pub fn declared_type(&self) -> ParameterDataType {
        ParameterDataType::parse(&self.data_type)
    }

    pub fn metadata_number(&self, key: &str) -> Option<f64> {
        self.metadata.as_ref()?.get(key)?.as_f64()
    }

    pub fn min(&self) -> Option<f64> {
        self.metadata_number("min")
    }

    pub fn max(&self) -> Option<f64> {
        self.metadata_number("max")
    }

    pub fn visible_when(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("visibleWhen")?.as_str()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub product_type_code: String,
    pub parameter_code: String,
    pub code: String,
    pub display_name: String,
    pub display_order: i32,
    pub active: bool,
}

/// Attribute row grouped into the rule context as `specs.{group}.{key}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub product_type_code: String,
    pub group: String,
    pub key: String,
    pub value: Value,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ParameterDataType, ProductParameter};

    #[test]
    fn data_types_are_normalized() {
        assert_eq!(ParameterDataType::parse("Enum"), ParameterDataType::Select);
        assert_eq!(ParameterDataType::parse("text"), ParameterDataType::Text);
        assert!(ParameterDataType::parse("decimal").is_numeric());
        assert_eq!(ParameterDataType::parse("color"), ParameterDataType::Other("color".to_owned()));
    }

    #[test]
    fn metadata_exposes_bounds_and_visibility() {
        let parameter = ProductParameter {
            product_type_code: "RS-STD".to_owned(),
            code: "motorType".to_owned(),
            name: "Motor type".to_owned(),
            data_type: "select".to_owned(),
            unit: None,
            step_number: 3,
            step_name: Some("Drive".to_owned()),
            display_order: 2,
            required: false,
            active: true,
            default_value: None,
            depends_on: vec!["driveType".to_owned()],
            metadata: Some(json!({"min": 400, "max": 3500.5, "visibleWhen": "driveType == 'motor'"})),
        };

        assert_eq!(parameter.min(), Some(400.0));
        assert_eq!(parameter.max(), Some(3500.5));
        assert_eq!(parameter.visible_when(), Some("driveType == 'motor'"));
    }
}
