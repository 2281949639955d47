mod calculation;
mod method;
mod research_page;
mod snapshot;

pub use calculation::{CalculationRequest, CalculationResult, Condition, ConvergenceKind};
pub use method::{CatalogEntry, Field, Method, MethodGroup, MethodId, MethodRecord};
pub use research_page::{ResearchPage, ResearchPageQuery, SamplingContext};
pub use snapshot::LastCalculationSnapshot;
