//! Process-wide correlation id.
//!
//! Every event of one run carries the same id. The binary logs it when
//! tracing starts, so diagnostic lines and progress events can be joined.

use std::sync::LazyLock;
use uuid::Uuid;

static CORRELATION_ID: LazyLock<Uuid> = LazyLock::new(Uuid::new_v4);

/// Correlation id of this process, created on first use.
#[must_use]
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID
}
