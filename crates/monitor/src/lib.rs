//! Poll-and-classify loop for a single monitored address. The library is
//! embedded by the `pairwatch` binary, which runs it next to the status
//! server in continuous mode.

pub mod explorer;
pub mod pipeline;
pub mod worker;

pub use explorer::{
    AddressRef, ExplorerClient, ExplorerTransaction, TransactionPage, TransactionSource,
};
pub use pipeline::{classify, is_expected, new_transactions, TxClass};
pub use worker::{run_once, CycleReport, Monitor, MonitorError, RunnerState};
