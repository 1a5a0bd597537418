//! Integration Tests Module
//!
//! End-to-end tests for batch orchestration: ordering, concurrency bounds,
//! fail-fast error handling, checkpoint isolation, composite suspension and
//! resume, nesting, and persistence of suspensions in SQLite.


// Composite suspension and resume (document review pipeline)
mod resume_test;

// Suspensions persisted across a SQLite checkpoint store
mod checkpoint_store_test;
