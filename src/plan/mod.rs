// Mapping plans - compiled once per type, reused for every row and every bind
//
// - read: row -> instance, driven by the type's single public constructor
// - write: instance -> command parameters, driven by the type's readable properties
// - cache: per-type memoization shared by every caller of one mapper

pub mod cache;
pub mod read;
pub mod write;

pub use cache::PlanCache;
pub use read::ReadPlan;
pub use write::WritePlan;
