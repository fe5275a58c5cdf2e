//! CSV export of recorded work-order times.
//!
//! One row per work order: `query_id,worker_id,operator_id,start_time,end_time,duration`.

use std::collections::BTreeMap;
use std::io::Write;

use qadmit_core::id::QueryId;
use qadmit_exec::recorder::WorkOrderTimeEntry;

use crate::error::Result;

pub const PROFILING_CSV_HEADER: [&str; 6] = [
    "query_id",
    "worker_id",
    "operator_id",
    "start_time",
    "end_time",
    "duration",
];

pub struct ProfilingCsvWriter<W: Write> {
    wtr: csv::Writer<W>,
    wrote_header: bool,
}

impl<W: Write> ProfilingCsvWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            wtr: csv::Writer::from_writer(writer),
            wrote_header: false,
        }
    }

    pub fn write_query(&mut self, query_id: QueryId, entries: &[WorkOrderTimeEntry]) -> Result<()> {
        if !self.wrote_header {
            self.wtr.write_record(PROFILING_CSV_HEADER)?;
            self.wrote_header = true;
        }
        for e in entries {
            self.wtr.write_record(&[
                query_id.to_string(),
                e.worker_id.to_string(),
                e.operator_id.to_string(),
                e.start_time.to_string(),
                e.end_time.to_string(),
                e.duration().to_string(),
            ])?;
        }
        self.wtr.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.wtr
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()).into())
    }
}

/// Write every query's entries, in query-id order.
pub fn write_profiling_csv<W: Write>(
    writer: W,
    profiling: &BTreeMap<QueryId, Vec<WorkOrderTimeEntry>>,
) -> Result<W> {
    let mut out = ProfilingCsvWriter::to_writer(writer);
    if profiling.is_empty() {
        out.wtr.write_record(PROFILING_CSV_HEADER)?;
        out.wrote_header = true;
    }
    for (query_id, entries) in profiling {
        out.write_query(*query_id, entries)?;
    }
    out.into_inner()
}
