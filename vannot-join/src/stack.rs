use vannot_core::models::{GenomicInterval, LocRecord};
use vannot_core::{Result, VannotError};

use crate::sink::ResultSink;

type RecordIter<T> = Box<dyn Iterator<Item = Result<T>>>;

/// Sliding-window merge-join over one chromosome.
///
/// Consumes a database iterator and a query stream, both ascending by
/// start, in a single forward pass: each database interval is pulled,
/// windowed, and evicted at most once, so a whole chromosome joins in
/// O(D + Q) amortized. Sortedness is a correctness precondition and is
/// enforced — a regression in either stream aborts with
/// [`VannotError::CorruptData`] instead of quietly dropping matches.
///
/// One stack is reused across chromosomes:
/// [`set_iterator`](ReaderStack::set_iterator) rebinds the database
/// stream for the next chromosome, [`clear`](ReaderStack::clear)
/// empties the window without touching the sink binding.
pub struct ReaderStack<T, S>
where
    T: GenomicInterval + Clone,
    S: ResultSink<T>,
{
    it: Option<RecordIter<T>>,
    lookahead: Option<T>,
    window: Vec<T>,
    iseof: bool,
    sink: S,
    last_pulled_begin: Option<u32>,
    last_query_begin: Option<u32>,
}

impl<T, S> ReaderStack<T, S>
where
    T: GenomicInterval + Clone,
    S: ResultSink<T>,
{
    pub fn new(sink: S) -> Self {
        ReaderStack {
            it: None,
            lookahead: None,
            window: Vec::new(),
            iseof: false,
            sink,
            last_pulled_begin: None,
            last_query_begin: None,
        }
    }

    /// Bind the database stream for the next pass and reset the
    /// drained flag and window.
    pub fn set_iterator(&mut self, it: RecordIter<T>) {
        self.it = Some(it);
        self.iseof = false;
        self.lookahead = None;
        self.last_pulled_begin = None;
        self.last_query_begin = None;
        self.clear();
    }

    /// Empty the active window. The sink and iterator bindings survive.
    pub fn clear(&mut self) {
        self.window.clear();
    }

    pub fn is_eof(&self) -> bool {
        self.iseof
    }

    pub fn set_sink(&mut self, sink: S) {
        self.sink = sink;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Report all database intervals overlapping each query, in query
    /// order, to the sink.
    pub fn find_overlaps(&mut self, queries: &[LocRecord]) -> Result<()> {
        for query in queries {
            self.find_overlap(query)?;
        }
        Ok(())
    }

    /// Report all database intervals overlapping one query to the sink.
    pub fn find_overlap(&mut self, query: &LocRecord) -> Result<()> {
        self.advance_to(query.begin, query.end)?;
        let matches: Vec<T> = self
            .window
            .iter()
            .filter(|d| d.overlap(query.begin, query.end))
            .cloned()
            .collect();
        self.sink.accept(query, &matches);
        Ok(())
    }

    /// Whether at least one database interval overlaps the query,
    /// without materializing matches or reporting to the sink.
    pub fn overlaps_any(&mut self, query: &LocRecord) -> Result<bool> {
        self.advance_to(query.begin, query.end)?;
        Ok(self
            .window
            .iter()
            .any(|d| d.overlap(query.begin, query.end)))
    }

    /// Slide the window to a query: evict intervals ending before it,
    /// pull intervals starting inside it.
    fn advance_to(&mut self, query_begin: u32, query_end: u32) -> Result<()> {
        if let Some(last) = self.last_query_begin {
            if query_begin < last {
                return Err(VannotError::CorruptData(format!(
                    "queries out of order: start {} after {}",
                    query_begin, last
                )));
            }
        }
        self.last_query_begin = Some(query_begin);

        // evicted intervals can never overlap this or any later query
        self.window.retain(|d| d.end() > query_begin);

        loop {
            if self.lookahead.is_none() {
                match self.it.as_mut().and_then(|it| it.next()) {
                    None => {
                        self.iseof = true;
                        break;
                    }
                    Some(Err(e)) => return Err(e),
                    Some(Ok(rec)) => {
                        if let Some(last) = self.last_pulled_begin {
                            if rec.begin() < last {
                                return Err(VannotError::CorruptData(format!(
                                    "database intervals out of order: start {} after {}",
                                    rec.begin(),
                                    last
                                )));
                            }
                        }
                        self.last_pulled_begin = Some(rec.begin());
                        self.lookahead = Some(rec);
                    }
                }
            }

            match &self.lookahead {
                Some(rec) if rec.begin() < query_end => {
                    let rec = self.lookahead.take().unwrap();
                    if rec.end() > query_begin {
                        self.window.push(rec);
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }
}
