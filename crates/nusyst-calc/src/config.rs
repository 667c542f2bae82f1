//! Systematics configuration documents.
//!
//! A document lists the providers to run. Each provider entry carries its
//! parameter definition and its calculator's input manifest; loading a
//! document yields the parameter registry and, with the histogram sources
//! resolved, a ready [`ResponseAggregator`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use nusyst_core::{
    DiagnosticSink, Error, ParameterHeader, ParameterRegistry, ResponseAggregator, Result,
};

use crate::manifest::RpaManifest;
use crate::provider::CcqeRpaProvider;
use crate::rpa::HistogramRatioCalculator;

/// Environment variable consulted for the installation-data root.
pub const DATA_ROOT_ENV: &str = "NUSYST_DATA_ROOT";

/// Largest number of dial values a range may expand to.
pub const MAX_VARIATIONS: usize = 10_000;

/// Dial values: an explicit list or an inclusive `{start, stop, step}` range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariationSpec {
    /// Explicit values, evaluated in order.
    List(Vec<f64>),
    /// `start, start + step, ...` up to and including `stop`.
    Range {
        /// First value.
        start: f64,
        /// Last value (inclusive, up to rounding).
        stop: f64,
        /// Increment, > 0.
        step: f64,
    },
}

impl Default for VariationSpec {
    fn default() -> Self {
        VariationSpec::List(Vec::new())
    }
}

impl VariationSpec {
    /// Expand to the ordered dial values.
    pub fn expand(&self) -> Result<Vec<f64>> {
        match *self {
            VariationSpec::List(ref values) => Ok(values.clone()),
            VariationSpec::Range { start, stop, step } => {
                if !(start.is_finite() && stop.is_finite() && step.is_finite()) || step <= 0.0 {
                    return Err(Error::InvalidConfiguration(format!(
                        "variation range needs finite bounds and step > 0, got start={start} stop={stop} step={step}"
                    )));
                }
                if stop < start {
                    return Err(Error::InvalidConfiguration(format!(
                        "variation range stop {stop} is below start {start}"
                    )));
                }
                let steps = ((stop - start) / step + 1e-9).floor();
                if !steps.is_finite() || steps >= MAX_VARIATIONS as f64 {
                    return Err(Error::InvalidConfiguration(format!(
                        "variation range start={start} stop={stop} step={step} expands to more than {MAX_VARIATIONS} values"
                    )));
                }
                let n = steps as usize + 1;
                Ok((0..n).map(|i| start + i as f64 * step).collect())
            }
        }
    }
}

/// One parameter definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfig {
    /// Unique parameter name.
    pub name: String,
    /// Human readable name; defaults to `name`.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Nominal dial value.
    #[serde(default)]
    pub central_value: f64,
    /// Dial values to evaluate. Ignored for corrections.
    #[serde(default)]
    pub variations: VariationSpec,
    /// Fixed correction evaluated only at the central value.
    #[serde(default)]
    pub is_correction: bool,
    /// Registered for bookkeeping only; produces no weights.
    #[serde(default)]
    pub is_responseless: bool,
}

impl ParameterConfig {
    /// Header with the given id.
    pub fn to_header(&self, id: nusyst_core::ParameterId) -> Result<ParameterHeader> {
        let mut hdr = if self.is_correction {
            ParameterHeader::correction(id, self.name.as_str(), self.central_value)
        } else {
            ParameterHeader::new(id, self.name.as_str(), self.central_value, self.variations.expand()?)
        };
        if let Some(display) = &self.display_name {
            hdr = hdr.with_display_name(display.as_str());
        }
        if self.is_responseless {
            hdr = hdr.responseless();
        }
        Ok(hdr)
    }
}

/// Configuration of one CCQE RPA provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcqeRpaConfig {
    /// Provider instance name; defaults to the tool name.
    #[serde(default)]
    pub instance_name: Option<String>,
    /// Parameter served by this provider.
    pub parameter: ParameterConfig,
    /// Optional diagnostic sink path.
    #[serde(default)]
    pub diagnostics: Option<PathBuf>,
    /// Calculator inputs.
    pub input_manifest: RpaManifest,
}

/// A provider entry, selected by its `tool` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool")]
pub enum ProviderConfig {
    /// Charged-current quasi-elastic RPA reweighting.
    #[serde(rename = "CCQERPAReweight", alias = "ccqe_rpa")]
    CcqeRpaReweight(CcqeRpaConfig),
}

impl ProviderConfig {
    /// Tool name as written in documents.
    pub fn tool(&self) -> &'static str {
        match self {
            ProviderConfig::CcqeRpaReweight(_) => "CCQERPAReweight",
        }
    }

    /// Instance name, falling back to the tool name.
    pub fn instance_name(&self) -> &str {
        match self {
            ProviderConfig::CcqeRpaReweight(c) => c.instance_name.as_deref().unwrap_or(self.tool()),
        }
    }

    /// Parameter definition.
    pub fn parameter(&self) -> &ParameterConfig {
        match self {
            ProviderConfig::CcqeRpaReweight(c) => &c.parameter,
        }
    }
}

/// Top-level systematics document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystematicsConfig {
    /// Installation-data root for relative histogram paths.
    #[serde(default)]
    pub data_root: Option<PathBuf>,
    /// Providers in evaluation order.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Read a systematics document. `.json` is parsed as JSON, anything else as YAML.
pub fn read_config(path: &Path) -> Result<SystematicsConfig> {
    let bytes = std::fs::read(path).map_err(|e| {
        Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
    })?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: SystematicsConfig = if ext == "json" {
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidConfiguration(format!("{}: {e}", path.display())))?
    } else {
        serde_yaml_ng::from_slice(&bytes)
            .map_err(|e| Error::InvalidConfiguration(format!("{}: {e}", path.display())))?
    };
    log::debug!("read {} provider entries from {}", cfg.providers.len(), path.display());
    Ok(cfg)
}

impl SystematicsConfig {
    /// Data root: `cli`, else the document's, else [`DATA_ROOT_ENV`].
    pub fn data_root(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(Path::to_path_buf)
            .or_else(|| self.data_root.clone())
            .or_else(|| std::env::var_os(DATA_ROOT_ENV).map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Register every provider's parameter, ids assigned in document order.
    pub fn build_registry(&self) -> Result<ParameterRegistry> {
        let mut registry = ParameterRegistry::new();
        for provider in &self.providers {
            let header = provider.parameter().to_header(registry.next_id())?;
            registry.register(header)?;
        }
        Ok(registry)
    }

    /// Build the registry and every provider.
    ///
    /// `sinks` opens a diagnostic sink for providers that request one.
    pub fn build(
        &self,
        data_root: Option<&Path>,
        sinks: &mut dyn FnMut(&Path) -> Result<Box<dyn DiagnosticSink>>,
    ) -> Result<ResponseAggregator> {
        let registry = Arc::new(self.build_registry()?);
        let mut aggregator = ResponseAggregator::new(Arc::clone(&registry));

        for provider in &self.providers {
            let header = registry.lookup_by_name(&provider.parameter().name)?.clone();
            match provider {
                ProviderConfig::CcqeRpaReweight(cfg) => {
                    let binning = cfg.input_manifest.binning_mode()?;
                    let calculator =
                        HistogramRatioCalculator::from_manifest(&cfg.input_manifest, data_root)?;
                    log::info!(
                        "{}: parameter '{}' with {} responses, binning {}",
                        provider.instance_name(),
                        header.name,
                        header.n_responses(),
                        binning
                    );
                    let mut p =
                        CcqeRpaProvider::new(provider.instance_name(), header, calculator, binning);
                    if let Some(path) = &cfg.diagnostics {
                        p = p.with_diagnostics(sinks(path)?);
                    }
                    aggregator.add_provider(Box::new(p))?;
                }
            }
        }
        Ok(aggregator)
    }
}
