pub mod cache_manager;
pub mod context;
pub mod locality;
pub mod prewarm;
pub mod scheduler;

pub use cache_manager::{CacheKey, CacheManager, CacheManagerRegistry};
pub use context::{PlannedScan, PlanningContext};
pub use locality::{CacheLocalityRegistry, LocalitySnapshot};
pub use prewarm::{
    LocalPrewarmExecutor, PrewarmAssignment, PrewarmCoordinator, PrewarmDispatch, PrewarmExecutor,
    PrewarmTask,
};
pub use scheduler::{annotate_preferred_hosts, host_matches_locality, pick_host};
