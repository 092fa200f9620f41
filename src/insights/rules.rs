//! Insight rule registry.
//!
//! Rules are evaluated in table order (correctness, scalability,
//! performance, style). Each rule sees the scanned facts, the detected
//! profile and the optional declared diagram, and returns zero or more
//! insights in fact discovery order.

use crate::core::{
    ArchitectureProfile, ArchitectureType, Insight, InsightType, Severity, SystemDiagram,
};
use crate::scanner::signatures::{CACHE_MODULES, DATABASE_MODULES};
use crate::scanner::{CallCategory, CallSite, SiteDetail, SourceFacts};

pub const SQL_INTERPOLATION: &str = "sql-interpolation";
pub const MISSING_COMPONENT: &str = "missing-component";
pub const ARCHITECTURE_MISMATCH: &str = "architecture-mismatch";
pub const UNBOUNDED_GLOBAL: &str = "unbounded-global-state";
pub const CACHE_WITHOUT_TTL: &str = "cache-without-ttl";
pub const BLOCKING_CALL: &str = "blocking-call";
pub const REDUNDANT_TIMESTAMP: &str = "redundant-timestamp";
pub const CONNECTION_PER_CALL: &str = "connection-per-call";
pub const STRING_CONCAT_IN_LOOP: &str = "string-concat-in-loop";
pub const INTERPOLATED_FORMATTING: &str = "interpolated-formatting";

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub facts: &'a SourceFacts,
    pub profile: &'a ArchitectureProfile,
    pub diagram: Option<&'a SystemDiagram>,
}

pub type RuleFn = fn(&RuleContext<'_>) -> Vec<Insight>;

#[derive(Debug, Clone, Copy)]
pub struct InsightRule {
    pub id: &'static str,
    pub insight_type: InsightType,
    pub evaluate: RuleFn,
}

pub static RULE_TABLE: &[InsightRule] = &[
    InsightRule {
        id: SQL_INTERPOLATION,
        insight_type: InsightType::Correctness,
        evaluate: sql_interpolation,
    },
    InsightRule {
        id: MISSING_COMPONENT,
        insight_type: InsightType::Correctness,
        evaluate: missing_component,
    },
    InsightRule {
        id: ARCHITECTURE_MISMATCH,
        insight_type: InsightType::Correctness,
        evaluate: architecture_mismatch,
    },
    InsightRule {
        id: UNBOUNDED_GLOBAL,
        insight_type: InsightType::Scalability,
        evaluate: unbounded_global,
    },
    InsightRule {
        id: CACHE_WITHOUT_TTL,
        insight_type: InsightType::Scalability,
        evaluate: cache_without_ttl,
    },
    InsightRule {
        id: BLOCKING_CALL,
        insight_type: InsightType::Performance,
        evaluate: blocking_call,
    },
    InsightRule {
        id: REDUNDANT_TIMESTAMP,
        insight_type: InsightType::Performance,
        evaluate: redundant_timestamp,
    },
    InsightRule {
        id: CONNECTION_PER_CALL,
        insight_type: InsightType::Performance,
        evaluate: connection_per_call,
    },
    InsightRule {
        id: STRING_CONCAT_IN_LOOP,
        insight_type: InsightType::Performance,
        evaluate: string_concat_in_loop,
    },
    InsightRule {
        id: INTERPOLATED_FORMATTING,
        insight_type: InsightType::Style,
        evaluate: interpolated_formatting,
    },
];

fn insight(
    rule: &str,
    insight_type: InsightType,
    severity: Severity,
    title: String,
    description: String,
    recommendation: &str,
    line: Option<usize>,
) -> Insight {
    Insight {
        insight_type,
        title,
        description,
        recommendation: Some(recommendation.to_string()),
        severity,
        rule: rule.to_string(),
        line,
    }
}

/// Sites of one category grouped by enclosing function, in discovery order.
fn group_by_function<'a>(
    sites: impl Iterator<Item = &'a CallSite>,
) -> Vec<(Option<usize>, Vec<&'a CallSite>)> {
    let mut groups: Vec<(Option<usize>, Vec<&'a CallSite>)> = Vec::new();
    for site in sites {
        match groups.iter_mut().find(|(function, _)| *function == site.function) {
            Some((_, members)) => members.push(site),
            None => groups.push((site.function, vec![site])),
        }
    }
    groups
}

fn location(facts: &SourceFacts, function: Option<usize>) -> String {
    match function.and_then(|index| facts.function_name(index)) {
        Some(name) => format!("`{}`", name),
        None => "Module Scope".to_string(),
    }
}

fn plural(count: usize, singular: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}s", count, singular)
    }
}

fn sql_interpolation(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let interpolated = ctx.facts.sites(CallCategory::SqlLiteral).filter(|site| {
        matches!(
            site.detail,
            SiteDetail::Sql {
                interpolated: true,
                ..
            }
        )
    });

    group_by_function(interpolated)
        .into_iter()
        .map(|(function, sites)| {
            insight(
                SQL_INTERPOLATION,
                InsightType::Correctness,
                Severity::Critical,
                format!("SQL Built by String Interpolation in {}", location(ctx.facts, function)),
                format!(
                    "{} splices runtime values directly into SQL text. Any value containing a quote \
                     changes the meaning of the statement, which is the classic SQL injection hole, \
                     and the database cannot reuse a prepared plan for each distinct string.",
                    plural(sites.len(), "statement")
                ),
                "Pass values as query parameters (`?` or `%s` placeholders with a parameter tuple) \
                 instead of formatting them into the SQL string.",
                Some(sites[0].line),
            )
        })
        .collect()
}

fn missing_component(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let Some(diagram) = ctx.diagram else {
        return Vec::new();
    };
    let facts = ctx.facts;
    let has_cache = facts.imports_any(CACHE_MODULES)
        || !facts.cache_clients.is_empty()
        || facts.has_sites(CallCategory::CacheCall);
    let has_database = facts.imports_any(DATABASE_MODULES)
        || facts.has_sites(CallCategory::DbConnect)
        || facts.has_sites(CallCategory::SqlLiteral);

    diagram
        .components
        .iter()
        .filter_map(|component| {
            let lower = component.to_ascii_lowercase();
            let (kind, present) = if ["cache", "redis", "memcache"].iter().any(|k| lower.contains(k)) {
                ("cache", has_cache)
            } else if ["database", "db", "sql", "postgres", "mongo"]
                .iter()
                .any(|k| lower.contains(k))
            {
                ("database", has_database)
            } else {
                return None;
            };
            (!present).then(|| {
                insight(
                    MISSING_COMPONENT,
                    InsightType::Correctness,
                    Severity::Medium,
                    format!("Declared Component Not Found in Code: {}", component),
                    format!(
                        "The system diagram includes `{}`, but the code never talks to a {}. \
                         The design and the implementation have drifted apart, so measurements \
                         will describe a different system than the one drawn.",
                        component, kind
                    ),
                    "Either wire the component into the code or remove it from the diagram.",
                    None,
                )
            })
        })
        .collect()
}

fn architecture_mismatch(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let Some(label) = ctx.diagram.and_then(|d| d.architecture.as_deref()) else {
        return Vec::new();
    };
    let Some(declared) = ArchitectureType::from_declared(label) else {
        return Vec::new();
    };
    let detected = ctx.profile.architecture_type;
    if detected == ArchitectureType::Unknown || detected == declared {
        return Vec::new();
    }
    vec![insight(
        ARCHITECTURE_MISMATCH,
        InsightType::Correctness,
        Severity::Medium,
        format!("Declared Architecture Differs From Code: {} vs {}", declared, detected),
        format!(
            "The system diagram describes a {} design, but the code reads as {} ({:.0}% \
             confidence). Tests recommended here target the code as written.",
            declared,
            detected,
            ctx.profile.confidence * 100.0
        ),
        "Align the implementation with the declared architecture, or update the diagram \
         to describe what the code actually does.",
        None,
    )]
}

fn unbounded_global(ctx: &RuleContext<'_>) -> Vec<Insight> {
    ctx.facts
        .globals
        .iter()
        .filter(|binding| binding.is_unbounded() && !binding.looks_constant())
        .map(|binding| {
            let kind = binding.kind.display_name();
            let writers = if binding.writers.is_empty() {
                String::new()
            } else {
                let names: Vec<String> =
                    binding.writers.iter().map(|w| format!("`{}`", w)).collect();
                format!(" Entries are added by {}.", names.join(", "))
            };
            insight(
                UNBOUNDED_GLOBAL,
                InsightType::Scalability,
                Severity::High,
                format!("Global {} Without Size Limits: `{}`", kind, binding.name),
                format!(
                    "`{}` is a module-level {} that only grows: nothing evicts entries or \
                     checks its size, so memory use is unbounded under sustained traffic.{} \
                     Its contents also live in a single process and are lost on restart.",
                    binding.name,
                    kind.to_ascii_lowercase(),
                    writers
                ),
                "Bound the container with an eviction policy (LRU, TTL or a maximum size), or \
                 move the data to an external store.",
                Some(binding.line),
            )
        })
        .collect()
}

fn cache_without_ttl(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let bare_writes: Vec<&CallSite> = ctx
        .facts
        .sites(CallCategory::CacheCall)
        .filter(|site| {
            site.detail == SiteDetail::CacheWrite { ttl: false }
                && !["delete", "expire", "incr", "decr"]
                    .iter()
                    .any(|method| site.callee.ends_with(method))
        })
        .collect();
    let Some(first) = bare_writes.first() else {
        return Vec::new();
    };

    vec![insight(
        CACHE_WITHOUT_TTL,
        InsightType::Scalability,
        Severity::Medium,
        format!("Cache Writes Without Expiration ({})", plural(bare_writes.len(), "call")),
        format!(
            "`{}` stores an entry with no time-to-live. Entries written this way stay until the \
             cache evicts them under memory pressure and can serve stale data indefinitely.",
            first.callee
        ),
        "Set an expiry on every write (`setex`, or `set(..., ex=seconds)`).",
        Some(first.line),
    )]
}

fn blocking_call(ctx: &RuleContext<'_>) -> Vec<Insight> {
    group_by_function(ctx.facts.sites(CallCategory::BlockingWait))
        .into_iter()
        .map(|(function, sites)| {
            let callee = &sites[0].callee;
            insight(
                BLOCKING_CALL,
                InsightType::Performance,
                Severity::High,
                format!("Blocking {}() Call in {}", callee, location(ctx.facts, function)),
                format!(
                    "{} the calling thread. While it waits, every other request queued behind \
                     it waits too (head-of-line blocking), so latency grows with load.",
                    if sites.len() == 1 {
                        format!("`{}()` blocks", callee)
                    } else {
                        format!("{} blocking calls, starting with `{}()`, block", sites.len(), callee)
                    }
                ),
                "Move the wait off the request path: use async I/O, a background worker, or a \
                 timeout-bounded call.",
                Some(sites[0].line),
            )
        })
        .collect()
}

fn redundant_timestamp(ctx: &RuleContext<'_>) -> Vec<Insight> {
    group_by_function(ctx.facts.sites(CallCategory::WallClockNow))
        .into_iter()
        .filter(|(function, sites)| function.is_some() && sites.len() >= 2)
        .map(|(function, sites)| {
            let callee = &sites[0].callee;
            insight(
                REDUNDANT_TIMESTAMP,
                InsightType::Performance,
                Severity::Medium,
                format!("Multiple {}() Calls in {}", callee, location(ctx.facts, function)),
                format!(
                    "The clock is read {} times in one function body. This redundant timestamp \
                     capture costs a system call each time and the values can disagree, so \
                     related fields end up with slightly different times.",
                    sites.len()
                ),
                "Capture the time once at the start of the function and reuse the value.",
                Some(sites[0].line),
            )
        })
        .collect()
}

fn connection_per_call(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let inside_functions = ctx
        .facts
        .sites(CallCategory::DbConnect)
        .filter(|site| site.function.is_some());

    group_by_function(inside_functions)
        .into_iter()
        .map(|(function, sites)| {
            insight(
                CONNECTION_PER_CALL,
                InsightType::Performance,
                Severity::Medium,
                format!("Database Connection Opened Per Call in {}", location(ctx.facts, function)),
                format!(
                    "`{}()` runs on every invocation. Opening a connection costs a handshake \
                     and often authentication, which dominates the latency of small queries.",
                    sites[0].callee
                ),
                "Open the connection once and reuse it, or use a connection pool.",
                Some(sites[0].line),
            )
        })
        .collect()
}

fn string_concat_in_loop(ctx: &RuleContext<'_>) -> Vec<Insight> {
    group_by_function(ctx.facts.sites(CallCategory::StringConcatInLoop))
        .into_iter()
        .map(|(function, sites)| {
            let nested = sites.iter().any(|site| site.loop_depth >= 2);
            insight(
                STRING_CONCAT_IN_LOOP,
                InsightType::Performance,
                if nested { Severity::Medium } else { Severity::Low },
                format!("Inefficient String Building in {}", location(ctx.facts, function)),
                format!(
                    "`{}` is extended by concatenation inside a {}loop. Strings are immutable, so \
                     each step copies everything built so far and the total work grows \
                     quadratically with the number of pieces.",
                    sites[0].callee,
                    if nested { "nested " } else { "" }
                ),
                "Collect the pieces in a list and join them once with `\"\".join(parts)`.",
                Some(sites[0].line),
            )
        })
        .collect()
}

fn interpolated_formatting(ctx: &RuleContext<'_>) -> Vec<Insight> {
    let sites: Vec<&CallSite> = ctx.facts.sites(CallCategory::InterpolatedFormat).collect();
    let Some(first) = sites.first() else {
        return Vec::new();
    };
    let all_fstrings = sites.iter().all(|site| site.callee == "f-string");
    let label = if all_fstrings { "F-String" } else { "String" };

    vec![insight(
        INTERPOLATED_FORMATTING,
        InsightType::Style,
        Severity::Low,
        format!("{} Formatting ({})", label, plural(sites.len(), "use")),
        "Interpolated formatting is readable and fast for building messages. It is only a \
         problem when the result is fed to an interpreter such as SQL or a shell, where \
         parameters should be used instead."
            .to_string(),
        "Keep formatting for display text; never use it to assemble queries or commands.",
        Some(first.line),
    )]
}
