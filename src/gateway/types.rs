use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CortexSummary {
    pub id: String,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CortexList {
    #[serde(default)]
    pub cortices: Vec<CortexSummary>,
}

#[derive(Debug, Deserialize)]
pub struct CortexCreated {
    pub cortex: CortexSummary,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateCortexRequest<'a> {
    pub path: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub query: &'a str,
}

/// Store name → whether initialization succeeded.
pub type StoreInitReport = BTreeMap<String, bool>;

/// Exactly one way of naming a cortex; the id-or-name rule is enforced
/// before any request is built.
#[derive(Debug, Clone)]
pub enum CortexSelector {
    Id(String),
    Name(String),
}

impl CortexSelector {
    pub(crate) fn query_pair(&self) -> (&'static str, &str) {
        match self {
            CortexSelector::Id(id) => ("cortex_id", id),
            CortexSelector::Name(name) => ("cortex_name", name),
        }
    }
}

impl std::fmt::Display for CortexSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CortexSelector::Id(id) => write!(f, "{id}"),
            CortexSelector::Name(name) => write!(f, "{name}"),
        }
    }
}
