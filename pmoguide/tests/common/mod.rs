//! In-memory guide feed counting the exchanges it serves

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use pmoguide::{BatchRequest, Resource, Transport, TransportError};
use serde_json::{Value, json};

#[derive(Default)]
pub struct FakeFeed {
    pub programs: HashMap<String, Value>,
    pub schedules: HashMap<String, Value>,
    pub lineups: Option<Value>,
    pub headends: Vec<Value>,
    pub lineup_maps: HashMap<String, Value>,
    pub status: Option<Value>,
    offline: AtomicBool,
    requests: Mutex<Vec<BatchRequest>>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, raw: Value) -> Self {
        let id = raw["programID"].as_str().unwrap().to_string();
        self.programs.insert(id, raw);
        self
    }

    pub fn with_schedule(mut self, station_id: &str, airings: Vec<Value>) -> Self {
        self.schedules.insert(
            station_id.to_string(),
            json!({"stationID": station_id, "programs": airings}),
        );
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<BatchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> BatchRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl Transport for FakeFeed {
    fn submit(&self, request: &BatchRequest) -> Result<Vec<Value>, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::connectivity("connection refused"));
        }

        let pick = |source: &HashMap<String, Value>| {
            request
                .ids
                .iter()
                .filter_map(|id| source.get(id).cloned())
                .collect::<Vec<_>>()
        };

        match &request.resource {
            Resource::Programs => Ok(pick(&self.programs)),
            Resource::Schedules => Ok(pick(&self.schedules)),
            Resource::Lineups => match &self.lineups {
                Some(document) => Ok(vec![document.clone()]),
                None => Err(TransportError::Api {
                    code: 4102,
                    message: "No lineups have been added to this account.".into(),
                }),
            },
            Resource::Headends { .. } => Ok(self.headends.clone()),
            Resource::LineupMap { uri } => match self.lineup_maps.get(uri) {
                Some(document) => Ok(vec![document.clone()]),
                None => Err(TransportError::from_status_code(404, "Not Found")),
            },
            Resource::Status => Ok(self.status.iter().cloned().collect()),
            Resource::DeleteMessage { .. } => Ok(vec![json!({"code": 0, "response": "OK"})]),
        }
    }
}

pub fn program(id: &str) -> Value {
    json!({
        "programID": id,
        "titles": [{"title120": format!("Title of {}", id)}],
        "descriptions": {
            "description1000": [{"descriptionLanguage": "en", "description": "A long description."}],
        },
        "genres": ["Drama"],
        "showType": "Series",
        "md5": format!("md5-{}", id),
    })
}

pub fn airing(program_id: &str, start: &str) -> Value {
    json!({
        "programID": program_id,
        "airDateTime": start,
        "duration": 1800,
        "audioProperties": ["cc", "stereo"],
        "md5": "airing-md5",
    })
}

pub fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
