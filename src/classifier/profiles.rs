//! Architecture profile table.
//!
//! Each row names a profile, its specificity for tie-breaking, and the
//! weighted predicates that vote for it. Adding a profile means adding a
//! row here; the classifier never special-cases profile names.

use crate::core::ArchitectureType;
use crate::scanner::signatures::{CACHE_MODULES, DATABASE_MODULES};
use crate::scanner::{CallCategory, SiteDetail, SourceFacts, SqlStatement};

pub type Predicate = fn(&SourceFacts) -> bool;

#[derive(Debug, Clone, Copy)]
pub struct FeaturePredicate {
    pub name: &'static str,
    pub weight: f64,
    pub test: Predicate,
}

#[derive(Debug, Clone, Copy)]
pub struct ProfileRule {
    pub architecture: ArchitectureType,
    /// Higher wins ties on equal score
    pub specificity: u8,
    pub features: &'static [FeaturePredicate],
}

const fn feature(name: &'static str, weight: f64, test: Predicate) -> FeaturePredicate {
    FeaturePredicate { name, weight, test }
}

pub static PROFILE_TABLE: &[ProfileRule] = &[
    ProfileRule {
        architecture: ArchitectureType::InMemory,
        specificity: 0,
        features: &[
            feature("module_level_container", 0.4, has_mutable_global),
            feature("global_indexed_writes", 0.3, has_global_writes),
            feature("no_persistence_imports", 0.2, lacks_persistence),
            feature("dict_lookup_accessors", 0.1, has_global_reads),
        ],
    },
    ProfileRule {
        architecture: ArchitectureType::Database,
        specificity: 1,
        features: &[
            feature("db_driver_import", 0.3, imports_database),
            feature("connection_calls", 0.25, opens_connections),
            feature("cursor_calls", 0.2, uses_cursors),
            feature("sql_literals", 0.2, has_sql),
            feature("table_creation", 0.15, creates_tables),
        ],
    },
    ProfileRule {
        architecture: ArchitectureType::Caching,
        specificity: 1,
        features: &[
            feature("cache_library_import", 0.3, imports_cache),
            feature("cache_client_instantiation", 0.3, instantiates_cache_client),
            feature("cache_method_calls", 0.2, calls_cache),
            feature("ttl_bearing_writes", 0.2, has_ttl_writes),
        ],
    },
    ProfileRule {
        architecture: ArchitectureType::Hybrid,
        specificity: 2,
        features: &[
            feature("persistence_with_cache_layer", 0.5, persistence_with_cache),
            feature("cache_aside_reads", 0.3, has_cache_aside_reads),
            feature("write_through", 0.2, has_write_through),
        ],
    },
];

fn has_mutable_global(facts: &SourceFacts) -> bool {
    facts.globals.iter().any(|g| !g.looks_constant())
}

fn has_global_writes(facts: &SourceFacts) -> bool {
    facts.globals.iter().any(|g| !g.writes.is_empty())
}

fn has_global_reads(facts: &SourceFacts) -> bool {
    facts.globals.iter().any(|g| !g.reads.is_empty())
}

fn imports_database(facts: &SourceFacts) -> bool {
    facts.imports_any(DATABASE_MODULES)
}

fn imports_cache(facts: &SourceFacts) -> bool {
    facts.imports_any(CACHE_MODULES)
}

fn opens_connections(facts: &SourceFacts) -> bool {
    facts.has_sites(CallCategory::DbConnect)
}

fn uses_cursors(facts: &SourceFacts) -> bool {
    facts.has_sites(CallCategory::DbCursor)
}

fn has_sql(facts: &SourceFacts) -> bool {
    facts.has_sites(CallCategory::SqlLiteral)
}

fn calls_cache(facts: &SourceFacts) -> bool {
    facts.has_sites(CallCategory::CacheCall)
}

fn lacks_persistence(facts: &SourceFacts) -> bool {
    has_mutable_global(facts) && !imports_database(facts) && !imports_cache(facts)
}

fn creates_tables(facts: &SourceFacts) -> bool {
    facts.sites(CallCategory::SqlLiteral).any(|site| {
        matches!(
            site.detail,
            SiteDetail::Sql {
                statement: SqlStatement::CreateTable,
                ..
            }
        )
    })
}

fn instantiates_cache_client(facts: &SourceFacts) -> bool {
    !facts.cache_clients.is_empty() || facts.has_sites(CallCategory::CacheClientInit)
}

fn has_ttl_writes(facts: &SourceFacts) -> bool {
    facts
        .sites(CallCategory::CacheCall)
        .any(|site| site.detail == SiteDetail::CacheWrite { ttl: true })
}

fn persistence_with_cache(facts: &SourceFacts) -> bool {
    let persistent = imports_database(facts) || facts.has_sites(CallCategory::DbConnect);
    let cached = imports_cache(facts) || instantiates_cache_client(facts);
    persistent && cached
}

/// Some function both reads the cache and queries the database.
fn has_cache_aside_reads(facts: &SourceFacts) -> bool {
    facts.sites(CallCategory::CacheCall).any(|cache| {
        cache.detail == SiteDetail::CacheRead
            && cache.function.is_some()
            && facts.call_sites.iter().any(|site| {
                site.function == cache.function
                    && matches!(site.category, CallCategory::DbCursor | CallCategory::SqlLiteral)
            })
    })
}

/// Some function writes to both the cache and the database.
fn has_write_through(facts: &SourceFacts) -> bool {
    facts.sites(CallCategory::CacheCall).any(|cache| {
        matches!(cache.detail, SiteDetail::CacheWrite { .. })
            && cache.function.is_some()
            && facts.call_sites.iter().any(|site| {
                site.function == cache.function
                    && match site.detail {
                        SiteDetail::Sql { statement, .. } => statement.is_write(),
                        _ => site.category == CallCategory::DbCursor && site.callee.ends_with("commit"),
                    }
            })
    })
}
