mod clock;
mod session_store;

pub use clock::{SystemClock, FILE_STAMP_FORMAT, TIMESTAMP_FORMAT};
pub use session_store::JsonSessionStore;
