//! Scripted in-process [`Transport`] for engine tests.

use std::{sync::Mutex, time::Duration};

use enrich_core::fragment::FragmentType;
use serde_json::{Value, json};

use crate::transport::{FragmentRequest, RawResponse, Transport, TransportError};

type Reply = Result<RawResponse, TransportError>;
type Handler = dyn Fn(&FragmentRequest, usize) -> Reply + Send + Sync;
type Delay = dyn Fn(&FragmentRequest) -> Duration + Send + Sync;

/// Answers each request through a handler that also receives how many times
/// the identical request was seen before.
pub struct ScriptedTransport {
  handler: Box<Handler>,
  delay:   Box<Delay>,
  calls:   Mutex<Vec<FragmentRequest>>,
}

impl ScriptedTransport {
  pub fn new(handler: impl Fn(&FragmentRequest, usize) -> Reply + Send + Sync + 'static) -> Self {
    Self {
      handler: Box::new(handler),
      delay:   Box::new(|_| Duration::ZERO),
      calls:   Mutex::new(Vec::new()),
    }
  }

  /// Every request succeeds with [`sample_data`].
  pub fn always_ok() -> Self { Self::new(|req, _| ok(sample_data(req))) }

  pub fn with_delay(
    mut self,
    delay: impl Fn(&FragmentRequest) -> Duration + Send + Sync + 'static,
  ) -> Self {
    self.delay = Box::new(delay);
    self
  }

  pub fn calls(&self) -> Vec<FragmentRequest> { self.calls.lock().unwrap().clone() }

  pub fn call_count(&self) -> usize { self.calls.lock().unwrap().len() }

  pub fn calls_for(&self, kind: FragmentType) -> Vec<FragmentRequest> {
    self.calls().into_iter().filter(|c| c.kind == kind).collect()
  }
}

impl Transport for ScriptedTransport {
  async fn get(&self, request: &FragmentRequest) -> Reply {
    let seen = {
      let mut calls = self.calls.lock().unwrap();
      let seen = calls.iter().filter(|c| *c == request).count();
      calls.push(request.clone());
      seen
    };
    let delay = (self.delay)(request);
    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }
    (self.handler)(request, seen)
  }
}

// ─── Replies ─────────────────────────────────────────────────────────────────

pub fn body(data: Value) -> Value { json!({ "status": true, "data": data }) }

pub fn ok(data: Value) -> Reply { Ok(RawResponse { status: 200, body: Some(body(data)) }) }

/// HTTP 200 whose embedded success flag is false.
pub fn rejected() -> Reply {
  Ok(RawResponse {
    status: 200,
    body:   Some(json!({ "status": false, "message": "No data found" })),
  })
}

pub fn http(status: u16) -> Reply { Ok(RawResponse { status, body: None }) }

/// Realistic data for the summary-bearing fragments, a marker for the rest.
pub fn sample_data(req: &FragmentRequest) -> Value {
  let period = req.period.map(|p| p.0);
  match req.kind {
    FragmentType::ReportCard => json!({
      "rowBoyTotal": 210, "rowGirlTotal": 190, "totalTeacher": 14, "yearId": period,
    }),
    FragmentType::Facility => json!({
      "internetYn": 1, "libraryYn": 1, "playgroundYn": 2, "electricityYn": 1, "yearId": period,
    }),
    FragmentType::Profile => json!({
      "lgdurbanlocalbodyId": 802711, "lgdurbanlocalbodyName": "Hubballi-Dharwad",
      "lgdwardId": 17, "lgdwardName": "Ward 17", "yearId": period,
    }),
    other => json!({ "fragment": other.storage_key(), "yearId": period }),
  }
}
