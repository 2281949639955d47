//! Method catalog: the eligible methods for a sample and which one is current.
//!
//! Entries are either standalone methods or groups of sub-methods. Every
//! lookup goes through [`resolve_by_method_id`], which searches standalone
//! methods and group members alike.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{CatalogEntry, Method, MethodId, SamplingContext};
use crate::service::{MeasurementService, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Method list fetch failed. Reported to the operator, never retried.
    #[error("method catalog unavailable: {0}")]
    Unavailable(#[source] ServiceError),

    #[error("no research methods are available for this sample")]
    Empty,

    #[error("method {0} is not in the catalog")]
    UnknownMethod(MethodId),

    #[error("catalog has no entry at position {0}")]
    UnknownEntry(usize),
}

/// Fetches the methods a sample is eligible for.
///
/// Resolves the research page first, then asks for the sample's available
/// methods on that page. Records are normalized on the way in; a group with
/// no members is dropped.
pub async fn load_methods(
    service: &dyn MeasurementService,
    context: &SamplingContext,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let page = service
        .research_page(&context.page)
        .await
        .map_err(CatalogError::Unavailable)?;
    let records = service
        .available_methods(context.sample_id, page.id)
        .await
        .map_err(CatalogError::Unavailable)?;

    let total = records.len();
    let entries: Vec<CatalogEntry> = records
        .into_iter()
        .filter_map(|record| {
            let id = record.id;
            let entry = CatalogEntry::from_record(record);
            if entry.is_none() {
                warn!(method_id = id, "dropping method group without members");
            }
            entry
        })
        .collect();

    info!(
        sample_id = context.sample_id,
        research_page_id = page.id,
        loaded = entries.len(),
        received = total,
        "method catalog loaded"
    );
    Ok(entries)
}

/// Picks the method a freshly loaded catalog opens on.
///
/// # Arguments
///
/// * `entries` - Top-level catalog entries in service order
///
/// # Returns
///
/// The first entry itself when it is standalone, or the first member when it
/// is a group. `None` for an empty list.
///
/// # Examples
///
/// ```
/// use lab_core::catalog::select_first_available;
/// use lab_core::{CatalogEntry, MethodRecord};
/// use serde_json::json;
///
/// let group: MethodRecord = serde_json::from_value(json!({
///     "id": 1,
///     "name": "Зольность",
///     "isGroup": true,
///     "subMethods": [{"id": 11, "name": "Зольность (сухое)"}]
/// }))
/// .unwrap();
/// let entries: Vec<CatalogEntry> = CatalogEntry::from_record(group).into_iter().collect();
///
/// assert_eq!(select_first_available(&entries).map(|m| m.id), Some(11));
/// assert!(select_first_available(&[]).is_none());
/// ```
pub fn select_first_available(entries: &[CatalogEntry]) -> Option<&Method> {
    entries.first().and_then(|entry| entry.methods().first())
}

/// Finds a concrete method anywhere in the catalog.
///
/// # Arguments
///
/// * `entries` - Top-level catalog entries
/// * `id` - Method id; group ids never match, only their members do
///
/// # Returns
///
/// The standalone method or group member with `id`, if any.
///
/// # Examples
///
/// ```
/// use lab_core::catalog::resolve_by_method_id;
/// use lab_core::{CatalogEntry, MethodRecord};
/// use serde_json::json;
///
/// let records: Vec<MethodRecord> = serde_json::from_value(json!([
///     {"id": 2, "name": "Влажность"},
///     {"id": 1, "name": "Зола", "isGroup": true, "subMethods": [{"id": 12, "name": "Зола B"}]}
/// ]))
/// .unwrap();
/// let entries: Vec<CatalogEntry> = records
///     .into_iter()
///     .filter_map(CatalogEntry::from_record)
///     .collect();
///
/// assert_eq!(resolve_by_method_id(&entries, 12).map(|m| m.name.as_str()), Some("Зола B"));
/// assert!(resolve_by_method_id(&entries, 1).is_none());
/// ```
pub fn resolve_by_method_id(
    entries: &[CatalogEntry],
    id: MethodId,
) -> Option<&Method> {
    locate(entries, id).map(|position| position.method(entries))
}

/// Where the current method lives inside the entry list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    entry: usize,
    member: usize,
}

impl Position {
    const FIRST: Self = Self {
        entry: 0,
        member: 0,
    };

    fn method(
        self,
        entries: &[CatalogEntry],
    ) -> &Method {
        &entries[self.entry].methods()[self.member]
    }
}

fn locate(
    entries: &[CatalogEntry],
    id: MethodId,
) -> Option<Position> {
    entries.iter().enumerate().find_map(|(entry, candidate)| {
        candidate
            .methods()
            .iter()
            .position(|m| m.id == id)
            .map(|member| Position { entry, member })
    })
}

/// Loaded catalog with exactly one current method.
///
/// Every entry holds at least one concrete method (empty groups are
/// rejected at load), so a catalog built from a non-empty list always has
/// a current method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCatalog {
    entries: Vec<CatalogEntry>,
    current: Position,
}

impl MethodCatalog {
    /// Builds a catalog and selects the first available method.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        if select_first_available(&entries).is_none() {
            return Err(CatalogError::Empty);
        }
        Ok(Self {
            entries,
            current: Position::FIRST,
        })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn current(&self) -> &Method {
        self.current.method(&self.entries)
    }

    pub fn current_id(&self) -> MethodId {
        self.current().id
    }

    /// True for the current method itself, or for the group containing it.
    pub fn is_current(
        &self,
        entry: &CatalogEntry,
    ) -> bool {
        let current = self.current_id();
        entry.methods().iter().any(|m| m.id == current)
    }

    pub fn resolve(
        &self,
        id: MethodId,
    ) -> Option<&Method> {
        resolve_by_method_id(&self.entries, id)
    }

    /// Every concrete method id, in catalog order.
    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.entries
            .iter()
            .flat_map(|entry| entry.methods().iter().map(|m| m.id))
    }

    /// Makes `id` current; works for standalone methods and group members.
    pub fn select(
        &mut self,
        id: MethodId,
    ) -> Result<&Method, CatalogError> {
        let position = locate(&self.entries, id).ok_or(CatalogError::UnknownMethod(id))?;
        self.current = position;
        debug!(method_id = id, "method selected");
        Ok(self.current())
    }

    /// Selects a top-level entry; a group resolves to its first member.
    pub fn select_entry(
        &mut self,
        index: usize,
    ) -> Result<&Method, CatalogError> {
        let has_members = self
            .entries
            .get(index)
            .is_some_and(|entry| !entry.methods().is_empty());
        if !has_members {
            return Err(CatalogError::UnknownEntry(index));
        }
        self.current = Position {
            entry: index,
            member: 0,
        };
        debug!(method_id = self.current_id(), entry = index, "catalog entry selected");
        Ok(self.current())
    }

    /// Replaces the entries after a catalog re-fetch.
    ///
    /// The current method stays current when it survives; otherwise the
    /// first available method is selected. Returns the ids that are gone.
    /// An empty refresh leaves the catalog untouched.
    pub fn refresh(
        &mut self,
        entries: Vec<CatalogEntry>,
    ) -> Result<Vec<MethodId>, CatalogError> {
        if select_first_available(&entries).is_none() {
            return Err(CatalogError::Empty);
        }

        let previous = self.current_id();
        let dropped: Vec<MethodId> = self
            .method_ids()
            .filter(|id| resolve_by_method_id(&entries, *id).is_none())
            .collect();

        self.current = locate(&entries, previous).unwrap_or_else(|| {
            info!(method_id = previous, "current method left the catalog; falling back");
            Position::FIRST
        });
        self.entries = entries;

        Ok(dropped)
    }
}
