use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    StateEntity,
    NonStateEntity,
    Income,
    Programme,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::StateEntity => "state_entity",
            Category::NonStateEntity => "non_state_entity",
            Category::Income => "income",
            Category::Programme => "programme",
        }
    }

    pub fn is_entity(self) -> bool {
        matches!(self, Category::StateEntity | Category::NonStateEntity)
    }
}

/// Everything a breakdown's filename reveals about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub year: u16,
    /// `A`, `S` or `E`; `E` marks the enacted budget.
    pub stage: char,
    pub entity_type: Option<u8>,
    pub section: Option<String>,
    /// Non-state entity id, or the service id of an income breakdown.
    pub entity: Option<String>,
}

impl Classification {
    pub fn is_final(&self) -> bool {
        self.stage == 'E'
    }
}

/// Hierarchy tier of an open context. Ordering follows nesting depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Root,
    Service,
    Programme,
    /// Economic classification heading; the payload is the code length
    /// (1 chapter, 2 article, 3 concept, 5 sub-concept).
    Concept(u8),
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Root => "root",
            Level::Service => "service",
            Level::Programme => "programme",
            Level::Concept(1) => "chapter",
            Level::Concept(2) => "article",
            Level::Concept(_) => "concept",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    Leaf,
    Subtotal { level: Level },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub year: u16,
    pub section: String,
    pub service: Option<String>,
    pub programme: Option<String>,
    pub expense_concept: Option<String>,
    pub description: String,
    pub amount: Decimal,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl LineItem {
    pub fn is_subtotal(&self) -> bool {
        matches!(self.kind, ItemKind::Subtotal { .. })
    }

    pub fn level(&self) -> Option<Level> {
        match self.kind {
            ItemKind::Leaf => None,
            ItemKind::Subtotal { level } => Some(level),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub section: String,
    pub service: Option<String>,
    /// `None` when the header label could not be scraped.
    pub description: Option<String>,
}

/// One scraped header label, e.g. `Sección: 18 MINISTERIO DE EDUCACIÓN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderName {
    pub id: String,
    pub name: String,
}

/// Direct child of an entity breakdown in the institutional tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityChild {
    pub id: String,
    pub name: Option<String>,
}
