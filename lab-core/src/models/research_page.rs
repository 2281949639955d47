use serde::{Deserialize, Serialize};

/// Query for `GET research-pages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchPageQuery {
    pub laboratory_id: i64,
    pub department_id: i64,
    pub page_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchPage {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Everything needed to ask which methods a sample is eligible for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingContext {
    pub page: ResearchPageQuery,
    pub sample_id: i64,
}
