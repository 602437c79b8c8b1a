use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

/// Construct kinds that own an annotation block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    Type,
    /// Relations are called ports on the association side.
    Port,
    Attribute,
    Extern,
    Constraint,
}

impl ConstructKind {
    pub const ALL: [ConstructKind; 5] = [
        ConstructKind::Type,
        ConstructKind::Port,
        ConstructKind::Attribute,
        ConstructKind::Extern,
        ConstructKind::Constraint,
    ];

    /// Annotation keys accepted on this construct kind.
    pub fn supported_annotations(self) -> &'static HashSet<&'static str> {
        match self {
            ConstructKind::Type => &TYPE_ANNOTATIONS,
            ConstructKind::Port => &PORT_ANNOTATIONS,
            ConstructKind::Attribute => &ATTRIBUTE_ANNOTATIONS,
            ConstructKind::Extern => &EXTERN_ANNOTATIONS,
            ConstructKind::Constraint => &CONSTRAINT_ANNOTATIONS,
        }
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstructKind::Type => "type",
            ConstructKind::Port => "relation",
            ConstructKind::Attribute => "attribute",
            ConstructKind::Extern => "extern",
            ConstructKind::Constraint => "constraint/rule",
        };
        f.write_str(s)
    }
}

pub static TYPE_ANNOTATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "sequence",
        "groupBy",
        "peelable",
        "sharingCount",
        "source",
        "split",
        "virtual",
        "minInstanceQty",
        "maxInstanceQty",
        "computeDomainBeforeRelation",
        "computeDomainBeforeAttribute",
        "computeDomainBeforeAllAttributesAndRelations",
    ])
});

pub static PORT_ANNOTATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "closeRelation",
        "compNumberVar",
        "configurable",
        "disableCardinalityConstraint",
        "domainComputation",
        "filterExpression",
        "generic",
        "goal",
        "goalFactory",
        "noneLeafCardVar",
        "orderBy",
        "domainOrder",
        "propagateUp",
        "relatedAttributes",
        "relatedRelations",
        "sequence",
        "sharing",
        "singleton",
        "source",
        "sourceAttribute",
        "sourceContextNode",
        "sharingExpression",
        "sharingClass",
        "sharingSource",
        "readOnly",
        "allowNewInstance",
        "removeAssetWithZeroQuantity",
    ])
});

pub static ATTRIBUTE_ANNOTATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "allowOverride",
        "configurable",
        "contextPath",
        "defaultValue",
        "domainComputation",
        "goal",
        "goalFactory",
        "nullAssignable",
        "peelable",
        "relatedAttributes",
        "relatedRelations",
        "sequence",
        "setDefault",
        "source",
        "sourceAttribute",
        "strategy",
        "tagName",
        "domainScope",
        "attributeSource",
        "productGroup",
        "skipParentAttributeValidation",
    ])
});

pub static EXTERN_ANNOTATIONS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| HashSet::from(["contextPath", "tagName"]));

pub static CONSTRAINT_ANNOTATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "sequence",
        "abort",
        "active",
        "endDate",
        "startDate",
        "targetType",
        "skipValidation",
    ])
});

/// Union of every construct kind's whitelist. Used for annotations that
/// never reached a construct.
pub static ANY_ANNOTATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    ConstructKind::ALL
        .iter()
        .flat_map(|kind| kind.supported_annotations().iter().copied())
        .collect()
});

// ---------------------------------------------------------------------------
// Value shapes
// ---------------------------------------------------------------------------

/// Keys whose value must be exactly `true` or `false`.
pub static BOOLEAN_ANNOTATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "allowOverride",
        "configurable",
        "domainComputation",
        "nullAssignable",
        "setDefault",
        "closeRelation",
        "allowNewInstance",
        "disableCardinalityConstraint",
        "generic",
        "noneLeafCardVar",
        "propagateUp",
        "readOnly",
        "sharing",
        "singleton",
        "abort",
        "active",
        "skipValidation",
        "peelable",
    ])
});

/// Keys whose value must be all digits.
pub static INTEGER_ANNOTATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "sequence",
        "sharingCount",
        "maxInstanceQty",
        "minInstanceQty",
        "productGroup",
    ])
});

const SPLIT_VALUES: &[&str] = &["false", "none", "true"];

/// Keys restricted to a fixed value set. Values are kept sorted for messages.
pub static ENUM_ANNOTATIONS: LazyLock<HashMap<&'static str, &'static [&'static str]>> =
    LazyLock::new(|| HashMap::from([("split", SPLIT_VALUES)]));

/// Keys whose value must be an ISO `YYYY-MM-DD` date.
pub static DATE_ANNOTATIONS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| HashSet::from(["startDate", "endDate"]));

/// Parser and output format version constants.
pub const VALIDATOR_VERSION: &str = "0.1.0";
pub const REPORT_VERSION: &str = "1.0";
