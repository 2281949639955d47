//! Workspace controller: one sample, its method catalog, per-method inputs
//! and results, and the gates in front of the save flow.
//!
//! Calculating or saving needs three gates open: a current method (always
//! true once loaded), an activity date, and a result for the current
//! method. Every transition is a method on [`Workspace`]; the only awaits
//! are calls to the [`MeasurementService`].

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::time::Duration;

use chrono::NaiveDate;
use lab_core::session::Evaluation;
use lab_core::{
    CalculationError, CalculationResult, CalculationSession, CalculationTicket, CatalogEntry,
    CatalogError, LastCalculationSnapshot, MeasurementService, Method, MethodCatalog, MethodId,
    SamplingContext, load_methods,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::input::{self, Edit, EditRejection, Key, KeyAction, Modifiers};
use crate::presentation::ResultView;
use crate::state::{GateError, NoticeLevel, WorkspaceState};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Calculation(#[from] CalculationError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("method {0} is locked for editing")]
    Locked(MethodId),

    #[error("field '{0}' is not an input of the current method")]
    UnknownField(String),

    #[error("edit rejected: {0}")]
    Rejected(#[from] EditRejection),
}

/// A calculation that has passed the gates and holds the busy flag.
///
/// Run it with [`PendingCalculation::run`] and hand the outcome back to
/// [`Workspace::finish_calculation`].
#[derive(Debug)]
pub struct PendingCalculation {
    ticket: CalculationTicket,
    values: HashMap<String, String>,
    timeout: Duration,
}

impl PendingCalculation {
    pub fn method_id(&self) -> MethodId {
        self.ticket.method_id()
    }

    pub async fn run(
        &self,
        service: &dyn MeasurementService,
    ) -> Result<Evaluation, CalculationError> {
        CalculationSession::evaluate(service, &self.ticket, &self.values, self.timeout).await
    }
}

#[derive(Debug)]
pub struct Workspace {
    context: SamplingContext,
    catalog: MethodCatalog,
    session: CalculationSession,
    state: WorkspaceState,
}

impl Workspace {
    /// Loads the catalog for `context` and selects the first available method.
    pub async fn open(
        service: &dyn MeasurementService,
        context: SamplingContext,
        timeout: Duration,
    ) -> Result<Self, WorkspaceError> {
        let entries = load_methods(service, &context).await?;
        Self::from_entries(context, entries, timeout)
    }

    /// Builds a workspace over an already loaded catalog.
    pub fn from_entries(
        context: SamplingContext,
        entries: Vec<CatalogEntry>,
        timeout: Duration,
    ) -> Result<Self, WorkspaceError> {
        let catalog = MethodCatalog::new(entries)?;
        info!(
            sample_id = context.sample_id,
            method_id = catalog.current_id(),
            "workspace opened"
        );
        Ok(Self {
            context,
            catalog,
            session: CalculationSession::new(timeout),
            state: WorkspaceState::new(),
        })
    }

    pub fn context(&self) -> &SamplingContext {
        &self.context
    }

    pub fn catalog(&self) -> &MethodCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    pub fn current_method(&self) -> &Method {
        self.catalog.current()
    }

    pub fn value(
        &self,
        field: &str,
    ) -> Option<&str> {
        self.state.value(self.catalog.current_id(), field)
    }

    pub fn focus(&self) -> Option<&str> {
        self.state.focus()
    }

    pub fn date_error(&self) -> Option<&str> {
        self.state.date_error()
    }

    /// Display-form result of the current method.
    pub fn result(&self) -> Option<&CalculationResult> {
        self.session.result(self.catalog.current_id())
    }

    pub fn result_view(&self) -> Option<ResultView> {
        self.result()
            .map(|result| ResultView::build(self.current_method(), result))
    }

    pub fn snapshot(&self) -> Option<&LastCalculationSnapshot> {
        self.session.snapshot(self.catalog.current_id())
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_busy(self.catalog.current_id())
    }

    pub fn is_locked(&self) -> bool {
        self.state.is_locked(self.catalog.current_id())
    }

    /// True when the snapshot of the current method may go to the save flow.
    pub fn is_save_available(&self) -> bool {
        self.state.activity_date().is_some() && self.snapshot().is_some()
    }

    /// Switches the visible method. Inputs of every method are kept.
    pub fn select_method(
        &mut self,
        id: MethodId,
    ) -> Result<&Method, WorkspaceError> {
        self.catalog.select(id)?;
        self.state.set_focus(None);
        Ok(self.catalog.current())
    }

    /// Switches to a top-level catalog entry; groups open on their first member.
    pub fn select_entry(
        &mut self,
        index: usize,
    ) -> Result<&Method, WorkspaceError> {
        self.catalog.select_entry(index)?;
        self.state.set_focus(None);
        Ok(self.catalog.current())
    }

    /// Marks a method as finalized by the surrounding page.
    pub fn set_locked(
        &mut self,
        id: MethodId,
        locked: bool,
    ) {
        debug!(method_id = id, locked, "lock flag changed");
        self.state.set_locked(id, locked);
    }

    pub fn focus_field(
        &mut self,
        name: &str,
    ) -> Result<(), WorkspaceError> {
        self.input_field(name)?;
        self.state.set_focus(Some(name.to_string()));
        Ok(())
    }

    /// Applies a typed edit to a field of the current method.
    ///
    /// `proposed` is the full text after the keystroke. A rejected edit
    /// leaves the stored value unchanged.
    pub fn edit_field(
        &mut self,
        name: &str,
        proposed: &str,
        cursor: usize,
    ) -> Result<Edit, WorkspaceError> {
        let method_id = self.editable_field(name)?;
        let edit = input::apply_edit(proposed, cursor).inspect_err(|reason| {
            warn!(method_id, field = name, %reason, "edit discarded");
        })?;
        self.state.set_value(method_id, name, edit.value.clone());
        Ok(edit)
    }

    /// Pastes clipboard text over `selection` of a field's current value.
    pub fn paste_field(
        &mut self,
        name: &str,
        selection: Range<usize>,
        clipboard: &str,
    ) -> Result<Edit, WorkspaceError> {
        let method_id = self.editable_field(name)?;
        let current = self.state.value(method_id, name).unwrap_or_default();
        let edit = input::apply_paste(current, selection, clipboard);
        self.state.set_value(method_id, name, edit.value.clone());
        Ok(edit)
    }

    /// Runs the key policy for the focused field.
    ///
    /// Enter moves focus along the focused field's card ring.
    pub fn press_key(
        &mut self,
        key: Key,
        modifiers: Modifiers,
    ) -> KeyAction {
        let action = input::key_action(key, modifiers);
        if action == KeyAction::FocusNextInCard {
            let next = self
                .state
                .focus()
                .and_then(|current| input::next_in_card(self.catalog.current(), current))
                .map(|field| field.name.clone());
            if let Some(next) = next {
                debug!(field = %next, "focus moved within card");
                self.state.set_focus(Some(next));
            }
        }
        action
    }

    pub fn set_activity_date(
        &mut self,
        date: NaiveDate,
    ) -> Result<(), WorkspaceError> {
        self.ensure_unlocked()?;
        self.state.set_activity_date(date);
        Ok(())
    }

    pub fn clear_activity_date(&mut self) -> Result<(), WorkspaceError> {
        self.ensure_unlocked()?;
        self.state.clear_activity_date();
        Ok(())
    }

    /// Checks the activity-date gate and claims the busy flag.
    ///
    /// Fails without touching the network when the date is missing or a
    /// calculation for the current method is already in flight.
    pub fn begin_calculation(&mut self) -> Result<PendingCalculation, WorkspaceError> {
        let method_id = self.catalog.current_id();
        self.state.require_activity_date().inspect_err(|_| {
            debug!(method_id, "calculation blocked: activity date missing");
        })?;
        let ticket = self.session.begin(method_id)?;
        Ok(PendingCalculation {
            ticket,
            values: self.state.values(method_id).cloned().unwrap_or_default(),
            timeout: self.session.timeout(),
        })
    }

    /// Stores the outcome of a pending calculation and releases its flag.
    ///
    /// Failures are raised as an error notice; the previous result stays.
    /// A calculation cancelled by a save or a catalog refresh in the
    /// meantime stores nothing and fails with
    /// [`CalculationError::Cancelled`].
    pub fn finish_calculation(
        &mut self,
        pending: PendingCalculation,
        outcome: Result<Evaluation, CalculationError>,
    ) -> Result<&CalculationResult, WorkspaceError> {
        if self.session.is_cancelled(&pending.ticket) {
            debug!(method_id = pending.method_id(), "late outcome dropped");
        } else if let Err(err) = &outcome {
            self.state.notify(NoticeLevel::Error, operator_message(err));
        }
        Ok(self.session.complete(pending.ticket, outcome)?)
    }

    /// Calculates the current method end to end.
    pub async fn calculate(
        &mut self,
        service: &dyn MeasurementService,
    ) -> Result<&CalculationResult, WorkspaceError> {
        let pending = self.begin_calculation()?;
        let outcome = pending.run(service).await;
        self.finish_calculation(pending, outcome)
    }

    /// Opens the save step: hands out the snapshot once every gate is open.
    pub fn open_save(&mut self) -> Result<&LastCalculationSnapshot, WorkspaceError> {
        let method_id = self.catalog.current_id();
        self.state.require_activity_date()?;
        self.session
            .snapshot(method_id)
            .ok_or(WorkspaceError::Gate(GateError::MissingResult(method_id)))
    }

    /// Resets the current method after the save flow succeeded and reloads
    /// the catalog. A calculation still in flight for the method is
    /// cancelled.
    ///
    /// The wipe happens even when the reload fails; in that case the old
    /// catalog stays and the failure is raised as a notice.
    pub async fn clear_after_save(
        &mut self,
        service: &dyn MeasurementService,
    ) -> Result<(), WorkspaceError> {
        let method_id = self.catalog.current_id();
        self.state.clear_values(method_id);
        self.state.set_focus(None);
        self.session.forget(method_id);
        info!(method_id, "method cleared after save");

        self.refresh_catalog(service).await
    }

    /// Re-fetches the catalog, keeping the current method when it survives.
    pub async fn refresh_catalog(
        &mut self,
        service: &dyn MeasurementService,
    ) -> Result<(), WorkspaceError> {
        let refreshed = match load_methods(service, &self.context).await {
            Ok(entries) => self.catalog.refresh(entries),
            Err(err) => Err(err),
        };
        let dropped = match refreshed {
            Ok(dropped) => dropped,
            Err(err) => {
                self.state
                    .notify(NoticeLevel::Error, "Не удалось обновить список методов");
                return Err(err.into());
            }
        };

        if !dropped.is_empty() {
            info!(?dropped, "methods left the catalog");
            let keep: HashSet<MethodId> = self.catalog.method_ids().collect();
            self.session.retain(&keep);
            self.state.retain_values(&keep);
            self.state.set_focus(None);
        }
        Ok(())
    }

    pub fn dismiss_notice(&mut self) {
        self.state.dismiss_notice();
    }

    fn ensure_unlocked(&self) -> Result<MethodId, WorkspaceError> {
        let method_id = self.catalog.current_id();
        if self.state.is_locked(method_id) {
            debug!(method_id, "edit blocked: method locked");
            return Err(WorkspaceError::Locked(method_id));
        }
        Ok(method_id)
    }

    fn input_field(
        &self,
        name: &str,
    ) -> Result<MethodId, WorkspaceError> {
        let method = self.catalog.current();
        match method.field(name) {
            Some(_) => Ok(method.id),
            None => Err(WorkspaceError::UnknownField(name.to_string())),
        }
    }

    fn editable_field(
        &self,
        name: &str,
    ) -> Result<MethodId, WorkspaceError> {
        self.ensure_unlocked()?;
        self.input_field(name)
    }
}

fn operator_message(err: &CalculationError) -> String {
    match err {
        CalculationError::EvaluationFailed { message, .. } => message.clone(),
        CalculationError::SchemaUnavailable { source, .. } => source.user_message(),
        CalculationError::InProgress(_) => "Расчёт уже выполняется".to_string(),
        CalculationError::Cancelled(_) => "Расчёт отменён".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lab_core::{
        CalculationRequest, ConvergenceKind, Field, MethodGroup, MethodRecord, ResearchPage,
        ResearchPageQuery, ServiceError,
    };
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

    fn method(
        id: MethodId,
        fields: &[&str],
    ) -> Method {
        Method {
            id,
            name: format!("method {id}"),
            unit: Some("%".to_string()),
            input_fields: fields.iter().map(|name| field(name, 0)).collect(),
            intermediate_fields: Vec::new(),
        }
    }

    fn record(method: &Method) -> MethodRecord {
        MethodRecord {
            id: method.id,
            name: method.name.clone(),
            is_group: false,
            unit: method.unit.clone(),
            sub_methods: None,
            input_fields: Some(method.input_fields.clone()),
            intermediate_fields: Some(Vec::new()),
        }
    }

    fn context() -> SamplingContext {
        SamplingContext {
            page: ResearchPageQuery {
                laboratory_id: 1,
                department_id: 1,
                page_type: "CALCULATION".to_string(),
            },
            sample_id: 42,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn result(value: &str) -> CalculationResult {
        CalculationResult {
            result: value.to_string(),
            measurement_error: "0.1".to_string(),
            convergence_kind: ConvergenceKind::Satisfactory,
            intermediate_results: Default::default(),
            conditions: Vec::new(),
        }
    }

    /// Service with a fixed catalog and scripted calculation outcomes.
    struct StubService {
        catalog: Mutex<Vec<MethodRecord>>,
        outcomes: Mutex<VecDeque<Result<CalculationResult, ServiceError>>>,
        requests: Mutex<Vec<CalculationRequest>>,
        calls: AtomicUsize,
    }

    impl StubService {
        fn new(methods: &[Method]) -> Self {
            Self {
                catalog: Mutex::new(methods.iter().map(record).collect()),
                outcomes: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn push(
            &self,
            outcome: Result<CalculationResult, ServiceError>,
        ) {
            self.outcomes.lock().unwrap().push_back(outcome);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MeasurementService for StubService {
        async fn research_page(
            &self,
            _query: &ResearchPageQuery,
        ) -> Result<ResearchPage, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ResearchPage { id: 5, name: None })
        }

        async fn available_methods(
            &self,
            _sample_id: i64,
            _research_page_id: i64,
        ) -> Result<Vec<MethodRecord>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.catalog.lock().unwrap().clone())
        }

        async fn method(
            &self,
            id: MethodId,
        ) -> Result<MethodRecord, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.catalog
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned()
                .ok_or(ServiceError::Rejected {
                    status: 404,
                    detail: None,
                })
        }

        async fn calculate(
            &self,
            request: &CalculationRequest,
        ) -> Result<CalculationResult, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(result("1.0")))
        }
    }

    fn workspace(methods: &[Method]) -> Workspace {
        let entries = methods
            .iter()
            .cloned()
            .map(CatalogEntry::Standalone)
            .collect();
        Workspace::from_entries(context(), entries, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn opens_on_first_member_of_leading_group() {
        let entries = vec![
            CatalogEntry::Group(MethodGroup {
                id: 100,
                name: "Зола".to_string(),
                members: vec![method(11, &["a"]), method(12, &["b"])],
            }),
            CatalogEntry::Standalone(method(2, &["m"])),
        ];

        let workspace = Workspace::from_entries(context(), entries, Duration::from_secs(5)).unwrap();

        assert_eq!(workspace.current_method().id, 11);
    }

    #[test]
    fn empty_catalog_is_an_error() {
        let result = Workspace::from_entries(context(), Vec::new(), Duration::from_secs(5));

        assert!(matches!(
            result,
            Err(WorkspaceError::Catalog(CatalogError::Empty))
        ));
    }

    #[test]
    fn inputs_survive_method_switches() {
        let mut ws = workspace(&[method(1, &["m1"]), method(2, &["m1"])]);
        ws.edit_field("m1", "5", 1).unwrap();

        ws.select_method(2).unwrap();
        assert_eq!(ws.value("m1"), None);
        ws.edit_field("m1", "7", 1).unwrap();

        ws.select_method(1).unwrap();
        assert_eq!(ws.value("m1"), Some("5"));
    }

    #[test]
    fn rejected_edit_keeps_previous_value() {
        let mut ws = workspace(&[method(1, &["m1"])]);
        ws.edit_field("m1", "1,5", 3).unwrap();

        let err = ws.edit_field("m1", "1,5,", 4).unwrap_err();

        assert!(matches!(
            err,
            WorkspaceError::Rejected(EditRejection::SecondSeparator)
        ));
        assert_eq!(ws.value("m1"), Some("1,5"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut ws = workspace(&[method(1, &["m1"])]);

        assert!(matches!(
            ws.edit_field("nope", "1", 1),
            Err(WorkspaceError::UnknownField(name)) if name == "nope"
        ));
        assert!(matches!(
            ws.focus_field("nope"),
            Err(WorkspaceError::UnknownField(_))
        ));
    }

    #[test]
    fn paste_is_trusted() {
        let mut ws = workspace(&[method(1, &["m1"])]);

        let edit = ws.paste_field("m1", 0..0, "1 234,56 ").unwrap();

        assert_eq!(edit.value, "1234,56");
        assert_eq!(ws.value("m1"), Some("1234,56"));
    }

    #[test]
    fn locked_method_refuses_edits_and_date_changes() {
        let mut ws = workspace(&[method(1, &["m1"]), method(2, &["m1"])]);
        ws.set_locked(1, true);

        assert!(matches!(
            ws.edit_field("m1", "1", 1),
            Err(WorkspaceError::Locked(1))
        ));
        assert!(matches!(
            ws.paste_field("m1", 0..0, "1"),
            Err(WorkspaceError::Locked(1))
        ));
        assert!(matches!(
            ws.set_activity_date(date()),
            Err(WorkspaceError::Locked(1))
        ));

        ws.select_method(2).unwrap();
        assert!(ws.edit_field("m1", "1", 1).is_ok());
        assert!(ws.set_activity_date(date()).is_ok());
    }

    #[test]
    fn enter_cycles_focus_and_tab_does_nothing() {
        let mut ws = workspace(&[method(1, &["m1", "m2"])]);
        ws.focus_field("m2").unwrap();

        assert_eq!(ws.press_key(Key::Tab, Modifiers::NONE), KeyAction::Suppress);
        assert_eq!(ws.focus(), Some("m2"));

        assert_eq!(
            ws.press_key(Key::Enter, Modifiers::NONE),
            KeyAction::FocusNextInCard
        );
        assert_eq!(ws.focus(), Some("m1"));
    }

    #[tokio::test]
    async fn calculate_without_date_sets_inline_error_and_stays_offline() {
        let service = StubService::new(&[method(1, &["m1"])]);
        let mut ws = workspace(&[method(1, &["m1"])]);

        let err = ws.calculate(&service).await.unwrap_err();

        assert!(matches!(
            err,
            WorkspaceError::Gate(GateError::MissingActivityDate)
        ));
        assert!(ws.date_error().is_some());
        assert_eq!(service.calls(), 0);
        assert!(!ws.is_busy());
    }

    #[tokio::test]
    async fn calculate_submits_wire_values() {
        let service = StubService::new(&[method(1, &["m1", "m2"])]);
        let mut ws = workspace(&[method(1, &["m1", "m2"])]);
        ws.edit_field("m1", "12.5", 4).unwrap();
        ws.set_activity_date(date()).unwrap();

        let stored = ws.calculate(&service).await.unwrap().clone();

        let request = service.requests.lock().unwrap()[0].clone();
        assert_eq!(request.input_data["m1"], "12.5");
        assert_eq!(request.input_data["m2"], "");
        assert_eq!(stored.result, "1,0");
        assert!(ws.is_save_available());
    }

    #[tokio::test]
    async fn failed_calculation_raises_notice_and_keeps_result() {
        let service = StubService::new(&[method(1, &["m1"])]);
        service.push(Ok(result("2.5")));
        service.push(Err(ServiceError::Rejected {
            status: 422,
            detail: Some("Недостаточно данных".to_string()),
        }));
        let mut ws = workspace(&[method(1, &["m1"])]);
        ws.set_activity_date(date()).unwrap();

        ws.calculate(&service).await.unwrap();
        let err = ws.calculate(&service).await.unwrap_err();

        assert!(matches!(
            err,
            WorkspaceError::Calculation(CalculationError::EvaluationFailed { .. })
        ));
        assert_eq!(ws.result().map(|r| r.result.as_str()), Some("2,5"));
        assert_eq!(
            ws.state().notice().map(|n| n.text.as_str()),
            Some("Недостаточно данных")
        );
    }

    #[test]
    fn second_begin_for_same_method_is_refused() {
        let mut ws = workspace(&[method(1, &["m1"]), method(2, &["m1"])]);
        ws.set_activity_date(date()).unwrap();

        let pending = ws.begin_calculation().unwrap();
        assert!(ws.is_busy());
        assert!(matches!(
            ws.begin_calculation(),
            Err(WorkspaceError::Calculation(CalculationError::InProgress(1)))
        ));

        ws.select_method(2).unwrap();
        assert!(ws.begin_calculation().is_ok());

        ws.select_method(1).unwrap();
        let _ = ws.finish_calculation(
            pending,
            Err(CalculationError::EvaluationFailed {
                method_id: 1,
                message: "x".to_string(),
            }),
        );
        assert!(!ws.is_busy());
    }

    #[test]
    fn open_save_requires_date_then_result() {
        let mut ws = workspace(&[method(1, &["m1"])]);

        assert!(matches!(
            ws.open_save(),
            Err(WorkspaceError::Gate(GateError::MissingActivityDate))
        ));

        ws.set_activity_date(date()).unwrap();
        assert!(matches!(
            ws.open_save(),
            Err(WorkspaceError::Gate(GateError::MissingResult(1)))
        ));
        assert!(!ws.is_save_available());
    }

    #[tokio::test]
    async fn open_save_hands_out_snapshot() {
        let service = StubService::new(&[method(1, &["m1"])]);
        let mut ws = workspace(&[method(1, &["m1"])]);
        ws.edit_field("m1", "3,5", 3).unwrap();
        ws.set_activity_date(date()).unwrap();
        ws.calculate(&service).await.unwrap();

        let snapshot = ws.open_save().unwrap();

        assert_eq!(snapshot.result, "1.0");
        assert_eq!(snapshot.input_data["m1"], "3.5");
        assert_eq!(snapshot.unit.as_deref(), Some("%"));
    }

    #[tokio::test]
    async fn clear_after_save_wipes_method_and_refreshes() {
        let service = StubService::new(&[method(1, &["m1"]), method(2, &["m1"])]);
        let mut ws = workspace(&[method(1, &["m1"]), method(2, &["m1"])]);
        ws.set_activity_date(date()).unwrap();
        ws.edit_field("m1", "4", 1).unwrap();
        ws.calculate(&service).await.unwrap();

        ws.clear_after_save(&service).await.unwrap();

        assert_eq!(ws.current_method().id, 1);
        assert_eq!(ws.value("m1"), None);
        assert!(ws.result().is_none());
        assert!(ws.snapshot().is_none());
        assert!(!ws.is_save_available());
    }

    #[tokio::test]
    async fn refresh_falls_back_when_current_method_disappears() {
        let service = StubService::new(&[method(1, &["m1"])]);
        let mut ws = workspace(&[method(1, &["m1"]), method(2, &["m1"])]);
        ws.edit_field("m1", "5", 1).unwrap();
        ws.select_method(2).unwrap();
        ws.set_activity_date(date()).unwrap();
        ws.edit_field("m1", "9", 1).unwrap();

        ws.clear_after_save(&service).await.unwrap();

        assert_eq!(ws.current_method().id, 1);
        assert_eq!(ws.value("m1"), Some("5"));
        assert!(ws.state().values(2).is_none());
        assert!(ws.catalog().resolve(2).is_none());
    }

    #[tokio::test]
    async fn calculation_finished_after_save_does_not_reopen_save() {
        let service = StubService::new(&[method(1, &["m1"])]);
        let mut ws = workspace(&[method(1, &["m1"])]);
        ws.set_activity_date(date()).unwrap();
        ws.edit_field("m1", "4", 1).unwrap();

        let pending = ws.begin_calculation().unwrap();
        let outcome = pending.run(&service).await;
        ws.clear_after_save(&service).await.unwrap();
        assert!(!ws.is_busy());

        let err = ws.finish_calculation(pending, outcome).unwrap_err();

        assert!(matches!(
            err,
            WorkspaceError::Calculation(CalculationError::Cancelled(1))
        ));
        assert!(ws.snapshot().is_none());
        assert!(ws.result().is_none());
        assert!(!ws.is_save_available());
        assert!(ws.state().notice().is_none());
    }

    #[tokio::test]
    async fn calculation_for_method_dropped_by_refresh_leaves_no_result() {
        let service = StubService::new(&[method(1, &["m1"])]);
        let mut ws = workspace(&[method(1, &["m1"]), method(2, &["m1"])]);
        ws.select_method(2).unwrap();
        ws.set_activity_date(date()).unwrap();

        let pending = ws.begin_calculation().unwrap();
        ws.refresh_catalog(&service).await.unwrap();
        assert!(ws.catalog().resolve(2).is_none());
        let outcome = pending.run(&service).await;

        let err = ws.finish_calculation(pending, outcome).unwrap_err();

        assert!(matches!(
            err,
            WorkspaceError::Calculation(CalculationError::Cancelled(2))
        ));
        assert!(ws.session.result(2).is_none());
        assert!(ws.session.snapshot(2).is_none());
        assert!(!ws.session.is_busy(2));
    }

    #[tokio::test]
    async fn empty_refresh_keeps_old_catalog() {
        let service = StubService::new(&[]);
        let mut ws = workspace(&[method(1, &["m1"])]);

        let err = ws.refresh_catalog(&service).await.unwrap_err();

        assert!(matches!(err, WorkspaceError::Catalog(CatalogError::Empty)));
        assert_eq!(ws.current_method().id, 1);
        assert!(ws.state().notice().is_some());
    }
}
