//! # pgfission
//!
//! Splits a PostgreSQL table, and every table transitively linked to it by
//! foreign keys, into one self-contained schema per distinct value of a chosen
//! partition column. Each generated schema is a structural clone of the source
//! tables holding only that partition's rows, with its own sequences and with
//! foreign keys rewired to point inside the schema.
//!
//! The core (`catalog`, `graph`, `paths`, `partition`, `plan`) is pure: it
//! operates on a catalog snapshot and emits a structured statement plan, so it
//! can be exercised entirely with hand-built catalogs. `db` and `runner` are
//! the thin live-database edges around it.
//!
//! ```rust,ignore
//! let pool = pgfission::db::connect("postgres://localhost/app").await?;
//! let catalog = pgfission::db::read_catalog(&pool).await?;
//! let values = pgfission::db::read_partition_values(&pool, &catalog, "tenant", "slug").await?;
//! let partitions = pgfission::partition::enumerate("slug", values)?;
//! let plan = pgfission::plan::plan(&catalog, "tenant", "slug", &partitions, &Default::default())?;
//! pgfission::runner::execute_plan(&pool, &plan, false).await?;
//! ```

pub mod catalog;
pub mod db;
pub mod error;
pub mod graph;
pub mod ident;
pub mod partition;
pub mod paths;
pub mod plan;
pub mod runner;
