pub mod clock;
pub mod database;
pub mod logging;
pub mod task_runner;
pub mod transcoder;

pub use clock::{Clock, SystemClock};
pub use logging::{EventLog, TracingEventLog};
pub use task_runner::{TaskRunner, TokioTaskRunner};
pub use transcoder::{ProcessTranscoder, Transcoder};
