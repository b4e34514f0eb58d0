pub mod collision;
pub mod diff;
pub mod hash;
pub mod lock;
pub mod pattern;
pub mod reconcile;
pub mod snapshot;
pub mod tag;
pub mod workspace;

pub use collision::check_disjoint;
pub use diff::{diff, LockDiff};
pub use hash::{compute_content_hash, compute_file_hash};
pub use lock::{LockRecord, LockState, TrackedFile};
pub use pattern::{resolve, Pattern, PatternSet};
pub use reconcile::{CheckoutPlan, ReconciliationService, SnapshotCommit, WorktreeStatus};
pub use snapshot::{RemoteSnapshotRecord, SnapshotHistory};
pub use tag::{allocate_snapshot_tag, TokenAllocator, TOKEN_HEX_WIDTH};
pub use workspace::{find_repo_root, Workspace};
