//! concept-core: the runtime kernel — storage, the action log, the
//! transport registry, and the sync engine that ties completions to the
//! invocations they trigger.
//!
//! Grounded on `chem-core`'s event-sourced `FlowEngine`: an append-only
//! store replayed to reconstruct state, a trait boundary between the
//! store and its in-memory implementation, and a builder that wires the
//! pieces together. The semantics are different — concept actions and
//! sync cascades instead of a linear step pipeline — but the shape of
//! "append-only log + replay + trait-bounded store" carries over
//! directly.
//!
//! Modules:
//! - `storage`: the relation store every concept reads and writes state
//!   through.
//! - `action_log`: the append-only, flow-scoped log of invocations and
//!   completions.
//! - `transport`: the registry that routes a concept's actions to
//!   wherever they're actually implemented.
//! - `sync_engine`: matches completions against registered syncs and
//!   fires the invocations they imply.
//! - `kernel`: the composition root tying the above into `handle_request`.
//! - `errors`: kernel-level error taxonomy.

pub mod action_log;
pub mod errors;
pub mod kernel;
pub mod storage;
pub mod sync_engine;
pub mod transport;

pub use action_log::{ActionLog, InMemoryActionLog};
pub use errors::KernelError;
pub use kernel::Kernel;
pub use storage::{ConflictResolution, InMemoryStorage, OnConflict, RelationMeta, Storage};
pub use sync_engine::{SyncEngine, SyncOutcome};
pub use transport::{ConceptHandler, InProcessTransport, Transport, TransportRegistry};
