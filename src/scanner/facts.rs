use serde::{Deserialize, Serialize};

/// Anti-pattern and architecture signal categories for call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallCategory {
    /// `datetime.now()`, `time.time()` and friends
    WallClockNow,
    /// Blocking sleep or synchronous wait
    BlockingWait,
    /// `s += "..."` or `s = s + ...` inside a loop
    StringConcatInLoop,
    /// f-strings, `str.format`, `%` formatting
    InterpolatedFormat,
    /// String literal that holds SQL
    SqlLiteral,
    /// Instantiation of a cache client
    CacheClientInit,
    /// Method call on a cache client
    CacheCall,
    /// Opening a database connection
    DbConnect,
    /// Cursor-style database call
    DbCursor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlStatement {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    Other,
}

impl SqlStatement {
    pub fn classify(sql: &str) -> Self {
        let upper = sql.trim_start().to_ascii_uppercase();
        if upper.starts_with("SELECT") {
            Self::Select
        } else if upper.starts_with("INSERT") || upper.starts_with("REPLACE") {
            Self::Insert
        } else if upper.starts_with("UPDATE") {
            Self::Update
        } else if upper.starts_with("DELETE") {
            Self::Delete
        } else if upper.starts_with("CREATE TABLE") {
            Self::CreateTable
        } else {
            Self::Other
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete)
    }
}

/// Extra data attached to some call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SiteDetail {
    Plain,
    CacheRead,
    CacheWrite { ttl: bool },
    Sql { statement: SqlStatement, interpolated: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub category: CallCategory,
    /// Callee as written, e.g. `datetime.now` or `redis_client.setex`
    pub callee: String,
    pub line: usize,
    /// Index into [`SourceFacts::functions`] of the enclosing function
    pub function: Option<usize>,
    /// Loops enclosing the site within its function (or module)
    pub loop_depth: usize,
    pub detail: SiteDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Module path, e.g. `datetime` or `redis`
    pub module: String,
    /// `import x as y` alias
    pub alias: Option<String>,
    /// Names pulled in by `from x import a, b`
    pub names: Vec<ImportedName>,
    pub line: usize,
}

impl Import {
    /// True when this import's module is `root` or a submodule of it.
    pub fn is_under(&self, root: &str) -> bool {
        self.module == root
            || self
                .module
                .strip_prefix(root)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    /// Positional parameters, excluding `self`/`cls` for methods
    pub arity: usize,
    /// Positional parameters without defaults
    pub required: usize,
    /// Accepts `*args` or `**kwargs`
    pub variadic: bool,
    pub line: usize,
    /// Enclosing class for methods
    pub class_name: Option<String>,
    /// Enclosing function for nested definitions
    pub parent: Option<usize>,
}

impl FunctionDef {
    /// Top-level, public function callable as a submission entry point.
    pub fn is_entry_point(&self) -> bool {
        self.class_name.is_none()
            && self.parent.is_none()
            && !self.name.starts_with('_')
            && self.name != "main"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Dict,
    List,
    Set,
    Deque,
}

impl ContainerKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Dict => "Dictionary",
            Self::List => "List",
            Self::Set => "Set",
            Self::Deque => "Deque",
        }
    }
}

/// A container assigned at module scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalBinding {
    pub name: String,
    pub kind: ContainerKind,
    pub line: usize,
    /// Created with an explicit size bound, e.g. `deque(maxlen=...)`
    pub bounded: bool,
    /// Lines inside functions that add entries
    pub writes: Vec<usize>,
    /// Functions that add entries, in discovery order
    pub writers: Vec<String>,
    /// Lines that remove entries, reset the container, or check its size
    pub evictions: Vec<usize>,
    /// Lines inside functions that read via `.get(...)`
    pub reads: Vec<usize>,
}

impl GlobalBinding {
    pub fn is_unbounded(&self) -> bool {
        !self.bounded && self.evictions.is_empty()
    }

    /// ALL_CAPS names that are never written look like constants.
    pub fn looks_constant(&self) -> bool {
        self.writes.is_empty()
            && self.name.chars().any(|c| c.is_ascii_uppercase())
            && !self.name.chars().any(|c| c.is_ascii_lowercase())
    }
}

/// Structural facts extracted from one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFacts {
    pub imports: Vec<Import>,
    pub functions: Vec<FunctionDef>,
    pub globals: Vec<GlobalBinding>,
    pub call_sites: Vec<CallSite>,
    /// Names bound to cache client instances
    pub cache_clients: Vec<String>,
    pub line_count: usize,
}

impl SourceFacts {
    /// Import module names in discovery order.
    pub fn import_names(&self) -> Vec<String> {
        self.imports.iter().map(|i| i.module.clone()).collect()
    }

    pub fn imports_any(&self, roots: &[&str]) -> bool {
        self.imports
            .iter()
            .any(|import| roots.iter().any(|root| import.is_under(root)))
    }

    pub fn sites(&self, category: CallCategory) -> impl Iterator<Item = &CallSite> + '_ {
        self.call_sites
            .iter()
            .filter(move |site| site.category == category)
    }

    pub fn has_sites(&self, category: CallCategory) -> bool {
        self.sites(category).next().is_some()
    }

    pub fn function_name(&self, index: usize) -> Option<&str> {
        self.functions.get(index).map(|f| f.name.as_str())
    }

    /// Public top-level functions, deduplicated by name with the last definition winning.
    pub fn entry_points(&self) -> Vec<&FunctionDef> {
        let mut entries: Vec<&FunctionDef> = Vec::new();
        for function in self.functions.iter().filter(|f| f.is_entry_point()) {
            match entries.iter().position(|e| e.name == function.name) {
                Some(pos) => entries[pos] = function,
                None => entries.push(function),
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str, class_name: Option<&str>) -> FunctionDef {
        FunctionDef {
            name: name.to_string(),
            arity: 1,
            required: 1,
            variadic: false,
            line: 1,
            class_name: class_name.map(str::to_string),
            parent: None,
        }
    }

    #[test]
    fn test_entry_points_skip_private_methods_and_main() {
        let facts = SourceFacts {
            functions: vec![
                function("put", None),
                function("_helper", None),
                function("main", None),
                function("handle", Some("Server")),
                function("get", None),
            ],
            ..Default::default()
        };
        let names: Vec<_> = facts.entry_points().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["put", "get"]);
    }

    #[test]
    fn test_import_is_under_matches_submodules_only() {
        let import = Import {
            module: "mysql.connector".into(),
            alias: None,
            names: vec![],
            line: 1,
        };
        assert!(import.is_under("mysql"));
        assert!(!import.is_under("my"));
    }

    #[test]
    fn test_sql_statement_classification() {
        assert_eq!(
            SqlStatement::classify("  create table if not exists t (a)"),
            SqlStatement::CreateTable
        );
        assert_eq!(SqlStatement::classify("INSERT INTO t"), SqlStatement::Insert);
        assert!(SqlStatement::classify("DELETE FROM t").is_write());
    }

    #[test]
    fn test_constant_detection() {
        let binding = GlobalBinding {
            name: "DEFAULTS".into(),
            kind: ContainerKind::Dict,
            line: 1,
            bounded: false,
            writes: vec![],
            writers: vec![],
            evictions: vec![],
            reads: vec![],
        };
        assert!(binding.looks_constant());
        assert!(binding.is_unbounded());
    }
}
