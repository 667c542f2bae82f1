//! Per-event merge of provider contributions.

use std::borrow::Cow;
use std::sync::Arc;

use crate::event::InteractionEvent;
use crate::registry::ParameterRegistry;
use crate::traits::EventResponseProvider;
use crate::types::{EventResponseSet, ParameterId, ParameterResponseWithCentral, ResponseEntry};
use crate::{Error, Result};

/// Runs every provider for an event and validates the merged result.
pub struct ResponseAggregator {
    registry: Arc<ParameterRegistry>,
    providers: Vec<Box<dyn EventResponseProvider>>,
}

impl ResponseAggregator {
    /// Create an aggregator with no providers.
    pub fn new(registry: Arc<ParameterRegistry>) -> Self {
        Self { registry, providers: Vec::new() }
    }

    /// Add a provider. Its parameter must be registered and not already served.
    pub fn add_provider(&mut self, provider: Box<dyn EventResponseProvider>) -> Result<()> {
        let id = provider.parameter_id();
        let hdr = self.registry.lookup(id)?;
        if self.providers.iter().any(|p| p.parameter_id() == id) {
            return Err(Error::DuplicateParameter(format!(
                "parameter '{}' already has a provider",
                hdr.name
            )));
        }
        log::debug!("provider '{}' serves parameter '{}'", provider.name(), hdr.name);
        self.providers.push(provider);
        Ok(())
    }

    /// Registry shared with the providers.
    pub fn registry(&self) -> &Arc<ParameterRegistry> {
        &self.registry
    }

    /// Number of providers.
    pub fn n_providers(&self) -> usize {
        self.providers.len()
    }

    fn is_responseless(&self, id: ParameterId) -> bool {
        self.registry.lookup(id).map(|h| h.is_responseless).unwrap_or(false)
    }

    /// Variation responses of every responding provider, validated.
    pub fn event_responses(&mut self, event: &InteractionEvent) -> Result<EventResponseSet> {
        let mut set = EventResponseSet::with_capacity(self.providers.len());
        for i in 0..self.providers.len() {
            if self.is_responseless(self.providers[i].parameter_id()) {
                continue;
            }
            set.push(self.providers[i].respond(event)?);
        }
        self.validate(&set)?;
        Ok(set)
    }

    /// Variation and central-value responses of every responding provider, validated.
    pub fn event_responses_with_central(
        &mut self,
        event: &InteractionEvent,
    ) -> Result<EventResponseSet<ParameterResponseWithCentral>> {
        let mut set = EventResponseSet::with_capacity(self.providers.len());
        for i in 0..self.providers.len() {
            if self.is_responseless(self.providers[i].parameter_id()) {
                continue;
            }
            set.push(self.providers[i].respond_with_central(event)?);
        }
        self.validate(&set)?;
        Ok(set)
    }

    /// Check every entry against the registry-declared response count.
    pub fn validate<R: ResponseEntry>(&self, set: &EventResponseSet<R>) -> Result<()> {
        for entry in set {
            let expected = self.registry.n_responses(entry.id())?;
            let actual = entry.responses().len();
            if actual != expected {
                return Err(Error::ResponseCardinalityMismatch { id: entry.id(), expected, actual });
            }
        }
        Ok(())
    }

    /// Responses for `id`, or the neutral all-ones fill of the declared length
    /// when the parameter is unhandled for this event.
    pub fn responses_or_neutral<'a, R: ResponseEntry>(
        &self,
        set: &'a EventResponseSet<R>,
        id: ParameterId,
    ) -> Result<Cow<'a, [f64]>> {
        match set.get(id) {
            Some(entry) => Ok(Cow::Borrowed(entry.responses())),
            None => Ok(Cow::Owned(vec![1.0; self.registry.n_responses(id)?])),
        }
    }

    /// Central-value weight for `id`; `1.0` when unhandled or not recorded.
    pub fn central_or_neutral<R: ResponseEntry>(
        &self,
        set: &EventResponseSet<R>,
        id: ParameterId,
    ) -> f64 {
        set.get(id).and_then(ResponseEntry::central_response).unwrap_or(1.0)
    }

    /// Call every provider's end-of-run hook.
    pub fn finish(&mut self) -> Result<()> {
        for p in &mut self.providers {
            p.finish()?;
        }
        Ok(())
    }
}
