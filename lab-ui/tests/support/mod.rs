//! Scripted [`MeasurementService`] shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lab_core::{
    CalculationRequest, CalculationResult, MeasurementService, MethodId, MethodRecord,
    ResearchPage, ResearchPageQuery, ServiceError,
};
use serde_json::json;

pub struct ScriptedService {
    catalog: Vec<MethodRecord>,
    outcomes: Mutex<VecDeque<Result<CalculationResult, ServiceError>>>,
    pub requests: Mutex<Vec<CalculationRequest>>,
    calls: AtomicUsize,
}

impl ScriptedService {
    pub fn new(catalog: serde_json::Value) -> Self {
        Self {
            catalog: serde_json::from_value(catalog).expect("catalog records"),
            outcomes: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn respond(
        &self,
        outcome: Result<CalculationResult, ServiceError>,
    ) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> CalculationRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("a calculation request")
    }
}

fn find(
    records: &[MethodRecord],
    id: MethodId,
) -> Option<MethodRecord> {
    records.iter().find_map(|record| {
        if record.id == id {
            return Some(record.clone());
        }
        find(record.sub_methods.as_deref().unwrap_or_default(), id)
    })
}

#[async_trait]
impl MeasurementService for ScriptedService {
    async fn research_page(
        &self,
        _query: &ResearchPageQuery,
    ) -> Result<ResearchPage, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ResearchPage {
            id: 1,
            name: Some("Расчёты".to_string()),
        })
    }

    async fn available_methods(
        &self,
        _sample_id: i64,
        _research_page_id: i64,
    ) -> Result<Vec<MethodRecord>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.catalog.clone())
    }

    async fn method(
        &self,
        id: MethodId,
    ) -> Result<MethodRecord, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        find(&self.catalog, id).ok_or(ServiceError::Rejected {
            status: 404,
            detail: Some(format!("method {id} not found")),
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
            .unwrap_or_else(|| Ok(moisture_result()))
    }
}

/// A moisture method with two inputs on one card and one intermediate.
pub fn moisture_catalog() -> serde_json::Value {
    json!([
        {
            "id": 7,
            "name": "Массовая доля влаги",
            "unit": "%",
            "inputFields": [
                {"name": "m1", "cardIndex": 0, "description": "Масса до сушки"},
                {"name": "m2", "cardIndex": 0, "description": "Масса после сушки"}
            ],
            "intermediateFields": [{"name": "w1", "unit": "%"}]
        },
        {
            "id": 20,
            "name": "Зольность",
            "isGroup": true,
            "subMethods": [
                {"id": 21, "name": "Зольность (сухое)", "inputFields": [{"name": "a1"}]}
            ]
        }
    ])
}

pub fn moisture_result() -> CalculationResult {
    serde_json::from_value(json!({
        "result": "12.3",
        "measurementError": "0.4",
        "convergence": "satisfactory",
        "intermediateResults": {"w1": "7.2546"},
        "conditions": [{
            "formula": "abs(w1-w2)<=r",
            "calculationSteps": "abs(7.2546-7.2)<=0.6",
            "convergenceValue": "0.6",
            "satisfied": true
        }]
    }))
    .expect("calculation result")
}
