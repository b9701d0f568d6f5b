//! Scripted in-memory [`ClinicBackend`] for engine and view tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use clinic_map_clinic_models::{Clinic, Coordinate};
use clinic_map_overpass::{ClinicBackend, ClinicQuery, MirrorPool, OverpassError};
use tokio::time::Instant;

/// Canned answer for one call to an endpoint.
#[derive(Debug, Clone)]
pub enum Reply {
    Clinics(Vec<Clinic>),
    Overloaded(u16),
    Invalid,
    Network,
    Slow(Duration, Vec<Clinic>),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub endpoint: String,
    pub center: Coordinate,
    pub at: Instant,
}

/// Pops one scripted reply per call; unscripted calls return no clinics.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<BTreeMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedBackend {
    pub fn script(&self, endpoint: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn endpoints_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.endpoint).collect()
    }
}

#[async_trait]
impl ClinicBackend for ScriptedBackend {
    async fn fetch_clinics(
        &self,
        endpoint: &str,
        query: &ClinicQuery,
    ) -> Result<Vec<Clinic>, OverpassError> {
        self.calls.lock().unwrap().push(Call {
            endpoint: endpoint.to_string(),
            center: query.center,
            at: Instant::now(),
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Reply::Clinics(Vec::new()));

        match reply {
            Reply::Clinics(clinics) => Ok(clinics),
            Reply::Overloaded(status) => Err(OverpassError::Overloaded { status }),
            Reply::Invalid => Err(OverpassError::InvalidResponse {
                message: "unexpected content-type Some(\"text/html\")".to_string(),
            }),
            Reply::Network => Err(OverpassError::Http(
                reqwest::Client::new()
                    .get("not a url")
                    .build()
                    .unwrap_err(),
            )),
            Reply::Slow(delay, clinics) => {
                tokio::time::sleep(delay).await;
                Ok(clinics)
            }
        }
    }
}

pub const MIRRORS: [&str; 3] = [
    "https://m0.test/api/interpreter",
    "https://m1.test/api/interpreter",
    "https://m2.test/api/interpreter",
];

pub fn pool() -> MirrorPool {
    MirrorPool::new(MIRRORS.iter().map(ToString::to_string).collect()).unwrap()
}

pub fn coord(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).unwrap()
}

pub fn clinic(id: i64, name: &str, facility_type: &str) -> Clinic {
    let tags = [("name", name), ("healthcare", facility_type)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Clinic::from_tags(id, coord(28.61, 77.2), &tags)
}
