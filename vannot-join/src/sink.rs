use vannot_core::models::{GenomicInterval, LocRecord};

/// Receives one `(query, matches)` result per processed query.
///
/// Sinks are externally supplied and replaceable between runs; the
/// engine never formats or prints, it only reports here.
pub trait ResultSink<T: GenomicInterval> {
    fn accept(&mut self, query: &LocRecord, matches: &[T]);
}

/// Materializes every result, mainly for tests and small batches.
#[derive(Default)]
pub struct CollectSink<T> {
    pub results: Vec<(LocRecord, Vec<T>)>,
}

impl<T> CollectSink<T> {
    pub fn new() -> Self {
        CollectSink {
            results: Vec::new(),
        }
    }
}

impl<T: GenomicInterval + Clone> ResultSink<T> for CollectSink<T> {
    fn accept(&mut self, query: &LocRecord, matches: &[T]) {
        self.results.push((query.clone(), matches.to_vec()));
    }
}

/// Counts queries and hits without keeping them.
#[derive(Default)]
pub struct CountSink {
    pub queries: u64,
    pub hits: u64,
}

impl CountSink {
    pub fn new() -> Self {
        CountSink::default()
    }
}

impl<T: GenomicInterval> ResultSink<T> for CountSink {
    fn accept(&mut self, _query: &LocRecord, matches: &[T]) {
        self.queries += 1;
        self.hits += matches.len() as u64;
    }
}
