//! Per-generation search history.
//!
//! Recording is off by default and enabled with
//! [`AcquisitionOptimizerBuilder::save_history`](crate::AcquisitionOptimizerBuilder::save_history).
//! With the `serde` feature the history can be written to a JSON file.

/// Summary of one generation (population backends) or one iteration
/// (gradient backend).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenerationRecord {
    /// Zero-based generation or iteration number.
    pub generation: usize,
    /// Cumulative acquisition evaluations at the end of the generation.
    pub n_evals: usize,
    /// Best objective value (negated acquisition) among feasible members,
    /// or among all members if none is feasible.
    pub best_objective: f64,
    /// Number of members satisfying the known constraints.
    pub n_feasible: usize,
    /// Number of members (or active start points).
    pub population_size: usize,
}

/// Ordered list of [`GenerationRecord`]s from one search.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchHistory {
    /// Records in generation order.
    pub records: Vec<GenerationRecord>,
}

impl SearchHistory {
    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns the best objective over all recorded generations.
    #[must_use]
    pub fn best_objective(&self) -> Option<f64> {
        self.records
            .iter()
            .map(|r| r.best_objective)
            .min_by(f64::total_cmp)
    }

    /// Save the history to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or written.
    #[cfg(feature = "serde")]
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        // Write to a sibling temp file, then rename over the target.
        let parent = path.parent().unwrap_or(std::path::Path::new("."));
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));
        let file = std::fs::File::create(&tmp_path)?;
        serde_json::to_writer_pretty(file, self).map_err(std::io::Error::other)?;
        std::fs::rename(&tmp_path, path)
    }

    /// Load a history previously written with [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read or parsed.
    #[cfg(feature = "serde")]
    pub fn load(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(std::io::Error::other)
    }
}

/// Collects records when enabled; a no-op otherwise.
#[derive(Debug)]
pub(crate) struct Recorder {
    enabled: bool,
    verbose: bool,
    history: SearchHistory,
}

impl Recorder {
    pub(crate) fn new(enabled: bool, verbose: bool) -> Self {
        Self {
            enabled,
            verbose,
            history: SearchHistory::default(),
        }
    }

    /// Returns `true` if records are kept or logged.
    pub(crate) fn is_active(&self) -> bool {
        self.enabled || self.verbose
    }

    pub(crate) fn record(&mut self, record: GenerationRecord) {
        if self.verbose {
            trace_debug!(
                generation = record.generation,
                n_evals = record.n_evals,
                best_objective = record.best_objective,
                n_feasible = record.n_feasible,
                "search progress"
            );
        }
        if self.enabled {
            self.history.records.push(record);
        }
    }

    pub(crate) fn finish(self) -> Option<SearchHistory> {
        self.enabled.then_some(self.history)
    }
}
