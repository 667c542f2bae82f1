//! Charged-current quasi-elastic RPA provider.

use nusyst_core::{
    DiagnosticRecord, DiagnosticSink, EventResponseProvider, InteractionEvent, ParameterHeader,
    ParameterId, ParameterResponse, ParameterResponseWithCentral, ResponseCalculator, Result,
};

use crate::binning::BinningMode;
use crate::kinematics::LeptonKinematics;
use crate::rpa::HistogramRatioCalculator;

/// Bridges one registered RPA dial to a [`ResponseCalculator`].
///
/// Only charged-current quasi-elastic events respond; everything else gets
/// the all-ones response of the declared length.
pub struct CcqeRpaProvider<C: ResponseCalculator = HistogramRatioCalculator> {
    instance_name: String,
    header: ParameterHeader,
    calculator: C,
    binning: BinningMode,
    diagnostics: Option<Box<dyn DiagnosticSink>>,
}

impl<C: ResponseCalculator> CcqeRpaProvider<C> {
    /// Create a provider for the registered `header`.
    pub fn new(
        instance_name: impl Into<String>,
        header: ParameterHeader,
        calculator: C,
        binning: BinningMode,
    ) -> Self {
        Self { instance_name: instance_name.into(), header, calculator, binning, diagnostics: None }
    }

    /// Record one row per applicable event into `sink`.
    pub fn with_diagnostics(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Registered parameter.
    pub fn header(&self) -> &ParameterHeader {
        &self.header
    }

    /// Underlying calculator.
    pub fn calculator(&self) -> &C {
        &self.calculator
    }

    /// Binning mode used for the kinematic axes.
    pub fn binning(&self) -> BinningMode {
        self.binning
    }

    fn evaluate(&mut self, event: &InteractionEvent) -> Result<(Vec<f64>, f64)> {
        let k = LeptonKinematics::from_event(event)?;
        let coords = self.binning.coordinates(&k);

        let responses = self
            .header
            .dial_values()
            .iter()
            .map(|&dial| self.calculator.weight(k.e_nu, coords, dial))
            .collect();
        let central = self.calculator.weight(k.e_nu, coords, self.header.central_value);

        if let Some(sink) = self.diagnostics.as_mut() {
            let record = DiagnosticRecord {
                parameter_id: self.header.id,
                nu_pdg: event.probe.map_or(0, |p| p.pdg),
                lepton_pdg: event.final_state_lepton.map_or(0, |p| p.pdg),
                e_nu: k.e_nu,
                lepton_momentum: k.lepton_momentum,
                lepton_cos_theta: event.final_state_lepton.map_or(f64::NAN, |p| p.p4.cos_theta()),
                q0: k.q0,
                q3: k.q3,
                q2: k.q2,
                w: event.w.unwrap_or(f64::NAN),
                target_pdg: event.target_pdg,
                regime: self.calculator.regime(k.e_nu),
                weight: central,
            };
            if let Err(e) = sink.record(&record) {
                log::warn!("{}: failed to record diagnostics: {e}", self.instance_name);
            }
        }

        Ok((responses, central))
    }
}

impl<C: ResponseCalculator> EventResponseProvider for CcqeRpaProvider<C> {
    fn name(&self) -> &str {
        &self.instance_name
    }

    fn parameter_id(&self) -> ParameterId {
        self.header.id
    }

    fn is_applicable(&self, event: &InteractionEvent) -> bool {
        event.process.quasi_elastic && event.process.weak_cc
    }

    fn respond(&mut self, event: &InteractionEvent) -> Result<ParameterResponse> {
        if !self.is_applicable(event) {
            return Ok(ParameterResponse::neutral(self.header.id, self.header.n_responses()));
        }
        let (responses, _) = self.evaluate(event)?;
        Ok(ParameterResponse::new(self.header.id, responses))
    }

    fn respond_with_central(
        &mut self,
        event: &InteractionEvent,
    ) -> Result<ParameterResponseWithCentral> {
        if !self.is_applicable(event) {
            return Ok(ParameterResponseWithCentral::neutral(
                self.header.id,
                self.header.n_responses(),
            ));
        }
        let (responses, central) = self.evaluate(event)?;
        Ok(ParameterResponseWithCentral::new(self.header.id, responses, central))
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(sink) = self.diagnostics.as_mut() {
            log::debug!("{}: flushing diagnostics", self.instance_name);
            sink.flush()?;
        }
        Ok(())
    }
}
