//! Parameter descriptors and per-event response records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a configured systematic parameter.
///
/// Assigned once at registration time and stable for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterId(pub u32);

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the parameter registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterHeader {
    /// Unique id.
    pub id: ParameterId,
    /// Unique name (used for output column names).
    pub name: String,
    /// Human readable name.
    pub display_name: String,
    /// Informational only: produces no weight column.
    pub is_responseless: bool,
    /// Single fixed correction rather than a swept dial.
    pub is_correction: bool,
    /// Nominal dial value.
    pub central_value: f64,
    /// Ordered dial values to evaluate. `[central_value]` for a correction.
    pub variations: Vec<f64>,
}

impl ParameterHeader {
    /// Create a swept dial with the given variations.
    pub fn new(
        id: ParameterId,
        name: impl Into<String>,
        central_value: f64,
        variations: Vec<f64>,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            display_name: name.clone(),
            name,
            is_responseless: false,
            is_correction: false,
            central_value,
            variations,
        }
    }

    /// Create a fixed correction evaluated only at `central_value`.
    pub fn correction(id: ParameterId, name: impl Into<String>, central_value: f64) -> Self {
        let mut hdr = Self::new(id, name, central_value, vec![central_value]);
        hdr.is_correction = true;
        hdr
    }

    /// Set the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Mark the parameter as responseless.
    pub fn responseless(mut self) -> Self {
        self.is_responseless = true;
        self
    }

    /// Number of responses every event must carry for this parameter.
    pub fn n_responses(&self) -> usize {
        if self.is_correction { 1 } else { self.variations.len() }
    }

    /// Dial values in evaluation order.
    pub fn dial_values(&self) -> &[f64] {
        if self.is_correction {
            std::slice::from_ref(&self.central_value)
        } else {
            &self.variations
        }
    }
}

/// Common view over the two response record flavours.
pub trait ResponseEntry {
    /// Parameter this response belongs to.
    fn id(&self) -> ParameterId;
    /// Responses in dial order.
    fn responses(&self) -> &[f64];
    /// Weight at the central value, if the record carries one.
    fn central_response(&self) -> Option<f64>;
}

/// Responses of one parameter for one event, one per dial value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterResponse {
    /// Parameter id.
    pub id: ParameterId,
    /// Weights in dial order.
    pub responses: Vec<f64>,
}

impl ParameterResponse {
    /// Create a response record.
    pub fn new(id: ParameterId, responses: Vec<f64>) -> Self {
        Self { id, responses }
    }

    /// All-ones response of length `n`: "no opinion".
    pub fn neutral(id: ParameterId, n: usize) -> Self {
        Self { id, responses: vec![1.0; n] }
    }
}

impl ResponseEntry for ParameterResponse {
    fn id(&self) -> ParameterId {
        self.id
    }

    fn responses(&self) -> &[f64] {
        &self.responses
    }

    fn central_response(&self) -> Option<f64> {
        None
    }
}

/// [`ParameterResponse`] plus the weight evaluated at the dial's central value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterResponseWithCentral {
    /// Variation responses.
    pub response: ParameterResponse,
    /// Weight at the central value.
    pub central_response: f64,
}

impl ParameterResponseWithCentral {
    /// Create a response record with a central weight.
    pub fn new(id: ParameterId, responses: Vec<f64>, central_response: f64) -> Self {
        Self { response: ParameterResponse::new(id, responses), central_response }
    }

    /// All-ones response of length `n` with a central weight of one.
    pub fn neutral(id: ParameterId, n: usize) -> Self {
        Self { response: ParameterResponse::neutral(id, n), central_response: 1.0 }
    }
}

impl ResponseEntry for ParameterResponseWithCentral {
    fn id(&self) -> ParameterId {
        self.response.id
    }

    fn responses(&self) -> &[f64] {
        &self.response.responses
    }

    fn central_response(&self) -> Option<f64> {
        Some(self.central_response)
    }
}

/// Responses of every parameter that produced one for the current event.
///
/// A parameter absent from the set is unhandled for this event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventResponseSet<R = ParameterResponse> {
    entries: Vec<R>,
}

impl<R> Default for EventResponseSet<R> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<R: ResponseEntry> EventResponseSet<R> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set with room for `n` entries.
    pub fn with_capacity(n: usize) -> Self {
        Self { entries: Vec::with_capacity(n) }
    }

    /// Append a response.
    pub fn push(&mut self, entry: R) {
        self.entries.push(entry);
    }

    /// Position of the response for `id`, if present.
    pub fn find(&self, id: ParameterId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    /// Response for `id`, if present.
    pub fn get(&self, id: ParameterId) -> Option<&R> {
        self.find(id).map(|i| &self.entries[i])
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no parameter responded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.entries.iter()
    }

    /// Drop all entries, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a, R> IntoIterator for &'a EventResponseSet<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<R: ResponseEntry> FromIterator<R> for EventResponseSet<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}
