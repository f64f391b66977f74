use super::record::{CacheRecord, CacheSchema};
use super::table;
use crate::core::ParameterSpec;
use crate::error::{OptimizerError, Result};
use std::cell::Cell;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Persistent map from (program, parameter vector) to the program's result.
///
/// Lookups are approximate: see [`CacheRecord::matches`]. Records are only
/// ever appended; near-duplicates are caught when a lookup finds more than
/// one of them.
#[derive(Debug)]
pub struct ResultCache {
    path: PathBuf,
    tolerance: f64,
    schema: CacheSchema,
    records: Vec<CacheRecord>,
    warned_non_positive: Cell<bool>,
}

impl ResultCache {
    /// Open the cache at `path` for a run over `parameters`.
    ///
    /// A missing or empty file starts an empty cache. Anything unreadable,
    /// or a table whose parameter columns differ from `parameters`, is fatal.
    pub fn open(
        path: impl Into<PathBuf>,
        tolerance: f64,
        parameters: &[ParameterSpec],
    ) -> Result<Self> {
        let path = path.into();
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(OptimizerError::InvalidConfig(format!(
                "cache tolerance must be a positive number, got {tolerance}"
            )));
        }

        let schema = CacheSchema::from_parameters(parameters)?;
        let records = table::read_records(&path, &schema)?;
        info!(
            path = %path.display(),
            records = records.len(),
            tolerance,
            "opened result cache"
        );

        Ok(Self {
            path,
            tolerance,
            schema,
            records,
            warned_non_positive: Cell::new(false),
        })
    }

    pub fn records(&self) -> &[CacheRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cached result for `parameters`, if exactly one record matches.
    ///
    /// More than one match means the cache contents or the tolerance are
    /// inconsistent and is reported as [`OptimizerError::CacheAmbiguity`].
    pub fn lookup(&self, program: &str, parameters: &[ParameterSpec]) -> Result<Option<f64>> {
        self.warn_non_positive(parameters);

        let mut matching = self
            .records
            .iter()
            .filter(|record| record.matches(program, parameters, self.tolerance));

        let Some(first) = matching.next() else {
            debug!(program, "cache miss");
            return Ok(None);
        };

        let extra = matching.count();
        if extra > 0 {
            return Err(OptimizerError::CacheAmbiguity {
                program: program.to_string(),
                matches: extra + 1,
            });
        }

        debug!(program, value = first.value, "cache hit");
        Ok(Some(first.value))
    }

    /// Append one evaluation. Existing records are never replaced.
    pub fn store(
        &mut self,
        program: &str,
        parameters: &[ParameterSpec],
        value: f64,
    ) -> Result<()> {
        let record = CacheRecord::new(&self.schema, program, parameters, value)?;
        self.records.push(record);
        Ok(())
    }

    /// Write the whole record set to the backing file.
    pub fn persist(&self) -> Result<()> {
        table::write_records(&self.path, &self.schema, &self.records)?;
        debug!(path = %self.path.display(), records = self.records.len(), "persisted result cache");
        Ok(())
    }

    // The match bound is `tolerance * query`, so these queries can never hit.
    fn warn_non_positive(&self, parameters: &[ParameterSpec]) {
        if self.warned_non_positive.get() {
            return;
        }
        if let Some(parameter) = parameters.iter().find(|p| p.value() <= 0.0) {
            warn!(
                parameter = parameter.name(),
                value = parameter.value(),
                "relative cache tolerance cannot match non-positive parameter values; such evaluations are never served from the cache"
            );
            self.warned_non_positive.set(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    fn params(a: f64, b: f64) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::new("a", 0.0, 10.0, a),
            ParameterSpec::new("b", 0.0, 10.0, b),
        ]
    }

    /// Log sink shared between a test and its subscriber.
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn open(dir: &Path) -> ResultCache {
        ResultCache::open(dir.join("cache.tsv"), 1e-6, &params(1.0, 1.0)).unwrap()
    }

    #[test]
    fn hit_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        assert!(cache.is_empty());
        assert_eq!(cache.lookup("./model", &params(1.0, 2.0)).unwrap(), None);

        cache.store("./model", &params(1.0, 2.0), 5.0).unwrap();
        assert_eq!(cache.lookup("./model", &params(1.0, 2.0)).unwrap(), Some(5.0));
        assert_eq!(cache.lookup("./model", &params(1.0 + 1e-9, 2.0)).unwrap(), Some(5.0));
        assert_eq!(cache.lookup("./model", &params(1.1, 2.0)).unwrap(), None);
        assert_eq!(cache.lookup("./other", &params(1.0, 2.0)).unwrap(), None);
    }

    #[test]
    fn two_matches_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        cache.store("./model", &params(1.0, 2.0), 5.0).unwrap();
        cache.store("./model", &params(1.0 + 1e-8, 2.0), 5.1).unwrap();

        match cache.lookup("./model", &params(1.0, 2.0)) {
            Err(OptimizerError::CacheAmbiguity { matches, .. }) => assert_eq!(matches, 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_queries_warn_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        cache.store("./model", &params(0.0, 2.0), 5.0).unwrap();

        let log = CapturedLog::default();
        let sink = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            assert_eq!(cache.lookup("./model", &params(1.0, 2.0)).unwrap(), None);
            assert!(log.text().is_empty());

            // an exact repeat of a zero-valued query still misses
            assert_eq!(cache.lookup("./model", &params(0.0, 2.0)).unwrap(), None);
            assert_eq!(cache.lookup("./model", &params(-1.0, 2.0)).unwrap(), None);
            assert_eq!(cache.lookup("./model", &params(0.0, 0.0)).unwrap(), None);
        });

        let text = log.text();
        assert_eq!(text.matches("non-positive").count(), 1, "{text}");
        assert!(text.contains("WARN"));
    }

    #[test]
    fn store_appends_without_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        cache.store("./model", &params(1.0, 2.0), 5.0).unwrap();
        cache.store("./model", &params(1.0, 2.0), 5.0).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn rejects_bad_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        for tolerance in [0.0, -1.0, f64::NAN] {
            let opened = ResultCache::open(dir.path().join("c"), tolerance, &params(1.0, 1.0));
            assert!(opened.is_err());
        }
    }

    #[test]
    fn persisted_cache_answers_the_same() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = open(dir.path());
        cache.store("./model", &params(1.0, 2.0), 5.0).unwrap();
        cache.store("./model", &params(3.0, 4.0), 25.0).unwrap();
        cache.persist().unwrap();

        let reopened = open(dir.path());
        assert_eq!(reopened.records(), cache.records());
        for query in [params(1.0, 2.0), params(3.0, 4.0), params(2.0, 2.0)] {
            assert_eq!(
                reopened.lookup("./model", &query).unwrap(),
                cache.lookup("./model", &query).unwrap()
            );
        }
    }
}
