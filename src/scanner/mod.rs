//! Lexical extraction of structural facts from Python source.
//!
//! The scanner never parses a full grammar. It splits the text into logical
//! lines, tracks block structure from indentation, and pattern-matches each
//! statement against the signature catalog in [`signatures`]. Invalid input
//! yields partial facts instead of an error; only empty, oversized or
//! binary submissions are rejected.

pub mod facts;
pub mod lexer;
pub mod signatures;

pub use facts::{
    CallCategory, CallSite, ContainerKind, FunctionDef, GlobalBinding, Import, ImportedName,
    SiteDetail, SourceFacts, SqlStatement,
};

use crate::config::ScannerConfig;
use crate::core::InputError;
use lexer::{logical_lines, LogicalLine, StringLiteral};
use signatures as sig;
use std::collections::{HashMap, HashSet};

/// Extracts [`SourceFacts`] from submitted source text.
#[derive(Debug, Clone)]
pub struct SourceScanner {
    max_source_bytes: usize,
}

impl Default for SourceScanner {
    fn default() -> Self {
        Self::new(&ScannerConfig::default())
    }
}

impl SourceScanner {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            max_source_bytes: config.max_source_bytes,
        }
    }

    pub fn max_source_bytes(&self) -> usize {
        self.max_source_bytes
    }

    /// Reject input that must not reach the analysis pipeline.
    pub fn validate(&self, text: &str) -> Result<(), InputError> {
        if text.trim().is_empty() {
            return Err(InputError::Empty);
        }
        if text.len() > self.max_source_bytes {
            return Err(InputError::TooLarge {
                size: text.len(),
                limit: self.max_source_bytes,
            });
        }
        if text.contains('\0') {
            return Err(InputError::NotText);
        }
        Ok(())
    }

    pub fn scan(&self, text: &str) -> Result<SourceFacts, InputError> {
        self.validate(text)?;
        Ok(extract_facts(text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Function(usize),
    Class,
    Loop,
}

#[derive(Debug, Clone)]
struct Block {
    indent: usize,
    kind: BlockKind,
    name: String,
}

#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    function: Option<usize>,
    loop_depth: usize,
    in_class_body: bool,
}

impl Scope {
    fn of(stack: &[Block]) -> Self {
        let last_function = stack
            .iter()
            .rposition(|b| matches!(b.kind, BlockKind::Function(_)));
        let function = last_function.and_then(|i| match stack[i].kind {
            BlockKind::Function(index) => Some(index),
            _ => None,
        });
        let inner = &stack[last_function.map_or(0, |i| i + 1)..];
        Self {
            function,
            loop_depth: inner.iter().filter(|b| b.kind == BlockKind::Loop).count(),
            in_class_body: function.is_none() && stack.iter().any(|b| b.kind == BlockKind::Class),
        }
    }

    fn module_level(&self) -> bool {
        self.function.is_none() && !self.in_class_body
    }
}

/// A statement segment with its scope resolved.
#[derive(Debug, Clone)]
struct Statement<'a> {
    text: &'a str,
    line: &'a LogicalLine,
    scope: Scope,
    /// Whether string literals and interpolations of `line` belong to this segment
    owns_literals: bool,
}

impl<'a> Statement<'a> {
    fn literals(&self) -> &'a [StringLiteral] {
        if self.owns_literals {
            &self.line.strings
        } else {
            &[]
        }
    }

    fn interpolations(&self) -> &'a [String] {
        if self.owns_literals {
            &self.line.interpolations
        } else {
            &[]
        }
    }
}

fn extract_facts(text: &str) -> SourceFacts {
    let lines = logical_lines(text);
    let mut facts = SourceFacts {
        line_count: text.lines().count(),
        ..Default::default()
    };

    let statements = build_statements(&lines, &mut facts.functions);

    let aliases = collect_imports(&statements, &mut facts.imports);
    collect_declarations(&statements, &aliases, &mut facts);
    collect_usages(&statements, &aliases, &mut facts);

    facts
}

/// Resolve block structure and split compound headers from their inline bodies.
fn build_statements<'a>(
    lines: &'a [LogicalLine],
    functions: &mut Vec<FunctionDef>,
) -> Vec<Statement<'a>> {
    let mut stack: Vec<Block> = Vec::new();
    let mut statements = Vec::new();

    for line in lines {
        while stack.last().is_some_and(|b| b.indent >= line.indent) {
            stack.pop();
        }
        let outer = Scope::of(&stack);
        let code = line.code.as_str();

        if let Some(caps) = sig::DEF.captures(code) {
            let class_name = match stack.last() {
                Some(block) if block.kind == BlockKind::Class => Some(block.name.clone()),
                _ => None,
            };
            let params = parse_params(&caps[2], class_name.is_some());
            let index = functions.len();
            functions.push(FunctionDef {
                name: caps[1].to_string(),
                arity: params.arity,
                required: params.required,
                variadic: params.variadic,
                line: line.line,
                class_name,
                parent: outer.function,
            });
            stack.push(Block {
                indent: line.indent,
                kind: BlockKind::Function(index),
                name: caps[1].to_string(),
            });
            if let (_, Some(body)) = split_block_header(code) {
                statements.push(Statement {
                    text: body,
                    line,
                    scope: Scope::of(&stack),
                    owns_literals: true,
                });
            }
            continue;
        }

        if let Some(caps) = sig::CLASS.captures(code) {
            stack.push(Block {
                indent: line.indent,
                kind: BlockKind::Class,
                name: caps[1].to_string(),
            });
            continue;
        }

        if sig::LOOP.is_match(code) {
            let (header, body) = split_block_header(code);
            statements.push(Statement {
                text: header,
                line,
                scope: outer,
                owns_literals: body.is_none(),
            });
            stack.push(Block {
                indent: line.indent,
                kind: BlockKind::Loop,
                name: String::new(),
            });
            if let Some(body) = body {
                statements.push(Statement {
                    text: body,
                    line,
                    scope: Scope::of(&stack),
                    owns_literals: true,
                });
            }
            continue;
        }

        statements.push(Statement {
            text: code,
            line,
            scope: outer,
            owns_literals: true,
        });
    }

    statements
}

/// Record imports and build the local-name to qualified-name alias map.
fn collect_imports(statements: &[Statement<'_>], imports: &mut Vec<Import>) -> HashMap<String, String> {
    let mut aliases = HashMap::new();

    for statement in statements {
        let text = statement.text.trim();
        let line = statement.line.line;

        if let Some(caps) = sig::FROM_IMPORT.captures(text) {
            let module = caps[1].to_string();
            let names: Vec<ImportedName> = split_top_level(
                caps[2].trim().trim_start_matches('(').trim_end_matches(')'),
                ',',
            )
            .into_iter()
            .filter_map(|part| parse_import_target(part.trim()))
            .map(|(name, alias)| ImportedName { name, alias })
            .collect();

            if !module.starts_with('.') {
                for imported in names.iter().filter(|n| n.name != "*") {
                    let local = imported.alias.clone().unwrap_or_else(|| imported.name.clone());
                    aliases.insert(local, format!("{}.{}", module, imported.name));
                }
            }
            imports.push(Import {
                module,
                alias: None,
                names,
                line,
            });
        } else if let Some(caps) = sig::IMPORT.captures(text) {
            for part in split_top_level(&caps[1], ',') {
                let Some((module, alias)) = parse_import_target(part.trim()) else {
                    continue;
                };
                match &alias {
                    Some(alias) => {
                        aliases.insert(alias.clone(), module.clone());
                    }
                    None => {
                        let root = module.split('.').next().unwrap_or(&module).to_string();
                        aliases.insert(root.clone(), root);
                    }
                }
                imports.push(Import {
                    module,
                    alias,
                    names: Vec::new(),
                    line,
                });
            }
        }
    }

    aliases
}

fn parse_import_target(part: &str) -> Option<(String, Option<String>)> {
    if part.is_empty() {
        return None;
    }
    let mut pieces = part.split_whitespace();
    let name = pieces.next()?.to_string();
    let alias = match (pieces.next(), pieces.next()) {
        (Some("as"), Some(alias)) => Some(alias.to_string()),
        _ => None,
    };
    Some((name, alias))
}

/// Module-level containers and cache client bindings.
fn collect_declarations(
    statements: &[Statement<'_>],
    aliases: &HashMap<String, String>,
    facts: &mut SourceFacts,
) {
    for statement in statements {
        let Some(caps) = sig::ASSIGNMENT.captures(statement.text.trim()) else {
            continue;
        };
        let target = &caps[1];
        let rhs = caps[2].trim();

        if let Some(call) = leading_call(rhs) {
            let resolved = resolve(&call, aliases);
            let is_cache_client = sig::CALL_SIGNATURES.iter().any(|s| {
                s.category == CallCategory::CacheClientInit
                    && sig::matches(s, &resolved, last_segment(&resolved), "")
            });
            if is_cache_client {
                if !facts.cache_clients.iter().any(|c| c == target) {
                    facts.cache_clients.push(target.to_string());
                }
                continue;
            }
        }

        if !statement.scope.module_level()
            || target.contains('.')
            || sig::NON_CALL_KEYWORDS.contains(&target)
        {
            continue;
        }
        if let Some((kind, bounded)) = container_kind(rhs, aliases) {
            if let Some(existing) = facts.globals.iter_mut().find(|g| g.name == target) {
                existing.kind = kind;
                existing.bounded = bounded;
                continue;
            }
            facts.globals.push(GlobalBinding {
                name: target.to_string(),
                kind,
                line: statement.line.line,
                bounded,
                writes: Vec::new(),
                writers: Vec::new(),
                evictions: Vec::new(),
                reads: Vec::new(),
            });
        }
    }
}

/// Call sites, global container usage, and string building in loops.
fn collect_usages(
    statements: &[Statement<'_>],
    aliases: &HashMap<String, String>,
    facts: &mut SourceFacts,
) {
    let mut string_names: HashSet<(Option<usize>, String)> = HashSet::new();
    let mut declared_globals: HashSet<(usize, String)> = HashSet::new();

    for statement in statements {
        let text = statement.text.trim();
        let scope = statement.scope;
        let line = statement.line.line;

        if let (Some(function), Some(caps)) = (scope.function, sig::GLOBAL_DECL.captures(text)) {
            for name in caps[1].split(',') {
                declared_globals.insert((function, name.trim().to_string()));
            }
            continue;
        }

        let mut sites = Vec::new();
        let new_site = |category, callee: String, detail| CallSite {
            category,
            callee,
            line,
            function: scope.function,
            loop_depth: scope.loop_depth,
            detail,
        };

        for raw in raw_calls(text)
            .into_iter()
            .chain(statement.interpolations().iter().flat_map(|e| raw_calls(e)))
        {
            if let Some((category, detail)) = classify_call(&raw, aliases, &facts.cache_clients) {
                let callee = if raw.chained {
                    format!(".{}", raw.callee)
                } else {
                    raw.callee.clone()
                };
                sites.push(new_site(category, callee, detail));
            }
        }

        for literal in statement.literals() {
            if literal.interpolated {
                sites.push(new_site(
                    CallCategory::InterpolatedFormat,
                    "f-string".to_string(),
                    SiteDetail::Plain,
                ));
            }
            if sig::SQL.is_match(&literal.text) {
                let interpolated =
                    literal.interpolated || is_dynamically_built(&statement.line.code, literal);
                sites.push(new_site(
                    CallCategory::SqlLiteral,
                    "sql".to_string(),
                    SiteDetail::Sql {
                        statement: SqlStatement::classify(&literal.text),
                        interpolated,
                    },
                ));
            }
        }
        if sig::PERCENT_FORMAT.is_match(text) {
            sites.push(new_site(
                CallCategory::InterpolatedFormat,
                "%-format".to_string(),
                SiteDetail::Plain,
            ));
        }

        if let Some(caps) = sig::ASSIGNMENT.captures(text) {
            let target = caps[1].to_string();
            let rhs = caps[2].trim();
            if is_string_seed(rhs) {
                string_names.insert((scope.function, target.clone()));
            }
            if let Some(function) = scope.function {
                if declared_globals.contains(&(function, target.clone())) {
                    if let Some(binding) = facts.globals.iter_mut().find(|g| g.name == target) {
                        binding.evictions.push(line);
                    }
                }
            }
        }

        if scope.loop_depth > 0 {
            if let Some(target) = string_concat_target(text, scope.function, &string_names) {
                sites.push(new_site(
                    CallCategory::StringConcatInLoop,
                    target,
                    SiteDetail::Plain,
                ));
            }
        }

        record_container_usage(text, line, scope, &facts.functions, &mut facts.globals);
        facts.call_sites.extend(sites);
    }
}

fn record_container_usage(
    text: &str,
    line: usize,
    scope: Scope,
    functions: &[FunctionDef],
    globals: &mut [GlobalBinding],
) {
    if globals.is_empty() {
        return;
    }
    let names = |re: &regex::Regex| -> Vec<String> {
        re.captures_iter(text).map(|c| c[1].to_string()).collect()
    };

    let evicted: Vec<String> = [&*sig::EVICTING_METHOD, &*sig::DEL_ITEM, &*sig::SIZE_CHECK]
        .into_iter()
        .flat_map(names)
        .collect();
    for binding in globals.iter_mut().filter(|g| evicted.contains(&g.name)) {
        binding.evictions.push(line);
    }

    let Some(function) = scope.function else {
        return;
    };
    let function_name = functions
        .get(function)
        .map(|f| f.name.clone())
        .unwrap_or_default();

    let written: Vec<String> = names(&*sig::INDEXED_WRITE)
        .into_iter()
        .chain(names(&*sig::MUTATING_METHOD))
        .collect();
    let read = names(&*sig::GET_READ);

    for binding in globals.iter_mut() {
        if written.contains(&binding.name) {
            binding.writes.push(line);
            if !binding.writers.contains(&function_name) {
                binding.writers.push(function_name.clone());
            }
        }
        if read.contains(&binding.name) {
            binding.reads.push(line);
        }
    }
}

/// A call expression found in a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawCall {
    /// Dotted callee with whitespace removed
    callee: String,
    /// Called on the result of another expression, e.g. `conn.cursor().execute(...)`
    chained: bool,
    /// Receiver of a chained call is a string literal
    literal_receiver: bool,
    args: String,
}

fn raw_calls(text: &str) -> Vec<RawCall> {
    let mut calls = Vec::new();
    for caps in sig::CALL.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let callee: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();

        let before = text[..whole.start()].trim_end();
        let chained = before.ends_with('.');
        if !chained && sig::NON_CALL_KEYWORDS.contains(&callee.as_str()) {
            continue;
        }
        if !chained && (before.ends_with("def") || before.ends_with("class")) {
            continue;
        }
        let literal_receiver = chained && {
            let receiver = before[..before.len() - 1].trim_end();
            receiver.ends_with('"') || receiver.ends_with('\'')
        };

        calls.push(RawCall {
            callee,
            chained,
            literal_receiver,
            args: call_arguments(text, whole.end()).to_string(),
        });
    }
    calls
}

/// Text between the `(` ending at `open_end` and its matching `)`.
fn call_arguments(text: &str, open_end: usize) -> &str {
    let rest = &text[open_end..];
    let mut depth = 0usize;
    for (offset, c) in rest.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth == 0 => return &rest[..offset],
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    rest
}

fn classify_call(
    raw: &RawCall,
    aliases: &HashMap<String, String>,
    cache_clients: &[String],
) -> Option<(CallCategory, SiteDetail)> {
    let method = last_segment(&raw.callee);

    if !raw.chained {
        if let Some((receiver, _)) = raw.callee.rsplit_once('.') {
            if cache_clients.iter().any(|c| c == receiver) {
                return Some((CallCategory::CacheCall, cache_detail(method, &raw.args)));
            }
        }
    }

    if raw.literal_receiver && method == "format" {
        return Some((CallCategory::InterpolatedFormat, SiteDetail::Plain));
    }

    let resolved = if raw.chained {
        format!("().{}", raw.callee)
    } else {
        resolve(&raw.callee, aliases)
    };
    sig::CALL_SIGNATURES
        .iter()
        .find(|s| sig::matches(s, &resolved, method, &raw.args))
        .map(|s| (s.category, SiteDetail::Plain))
}

fn cache_detail(method: &str, args: &str) -> SiteDetail {
    if sig::CACHE_READ_METHODS.contains(&method) {
        SiteDetail::CacheRead
    } else if sig::CACHE_WRITE_METHODS.contains(&method) {
        let positional = split_top_level(args, ',')
            .iter()
            .filter(|a| !a.trim().is_empty() && !a.contains('='))
            .count();
        let ttl = sig::TTL_METHODS.contains(&method)
            || sig::TTL_KWARG.is_match(args)
            || (matches!(method, "set" | "add" | "replace") && positional >= 3);
        SiteDetail::CacheWrite { ttl }
    } else {
        SiteDetail::Plain
    }
}

fn resolve(callee: &str, aliases: &HashMap<String, String>) -> String {
    let (head, tail) = match callee.split_once('.') {
        Some((head, tail)) => (head, Some(tail)),
        None => (callee, None),
    };
    match (aliases.get(head), tail) {
        (Some(qualified), Some(tail)) => format!("{}.{}", qualified, tail),
        (Some(qualified), None) => qualified.clone(),
        (None, _) => callee.to_string(),
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Dotted callee of an expression that starts with a call, e.g. `redis.Redis(host=...)`.
fn leading_call(expr: &str) -> Option<String> {
    let open = expr.find('(')?;
    let callee: String = expr[..open].chars().filter(|c| !c.is_whitespace()).collect();
    let valid = !callee.is_empty()
        && callee
            .split('.')
            .all(|seg| seg.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
                && seg.chars().all(|c| c.is_alphanumeric() || c == '_'));
    valid.then_some(callee)
}

fn container_kind(rhs: &str, aliases: &HashMap<String, String>) -> Option<(ContainerKind, bool)> {
    if rhs.starts_with('{') && rhs.ends_with('}') {
        let inner = &rhs[1..rhs.len() - 1];
        let is_dict = inner.trim().is_empty() || has_top_level(inner, ':');
        return Some((if is_dict { ContainerKind::Dict } else { ContainerKind::Set }, false));
    }
    if rhs.starts_with('[') && rhs.ends_with(']') {
        return Some((ContainerKind::List, false));
    }

    let callee = leading_call(rhs)?;
    let resolved = resolve(&callee, aliases);
    let kind = match last_segment(&resolved) {
        "dict" | "defaultdict" | "OrderedDict" | "Counter" => ContainerKind::Dict,
        "list" => ContainerKind::List,
        "set" => ContainerKind::Set,
        "deque" => ContainerKind::Deque,
        _ => return None,
    };
    let open = rhs.find('(')?;
    let args = call_arguments(rhs, open + 1);
    let bounded = kind == ContainerKind::Deque
        && args.contains("maxlen")
        && !args.replace(' ', "").contains("maxlen=None");
    Some((kind, bounded))
}

fn is_string_seed(rhs: &str) -> bool {
    let stripped = rhs.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    stripped == "\"\"" || stripped == "''" || rhs.starts_with("str(") || rhs.starts_with("\"\".join(")
        || rhs.starts_with("''.join(")
}

fn string_concat_target(
    text: &str,
    function: Option<usize>,
    string_names: &HashSet<(Option<usize>, String)>,
) -> Option<String> {
    let (target, rhs) = if let Some(caps) = sig::AUGMENTED_CONCAT.captures(text) {
        (caps[1].to_string(), caps[2].to_string())
    } else if let Some(caps) = sig::SELF_CONCAT.captures(text) {
        if caps[1] != caps[2] {
            return None;
        }
        (caps[1].to_string(), caps[3].to_string())
    } else {
        return None;
    };

    let rhs = rhs.trim();
    if rhs.starts_with('[') || rhs.starts_with('(') {
        return None;
    }
    let looks_textual = rhs.contains("\"\"")
        || rhs.contains("''")
        || rhs.contains("str(")
        || string_names.contains(&(function, target.clone()));
    looks_textual.then_some(target)
}

/// SQL literal glued to runtime values with `%`, `+` or `.format(...)`.
fn is_dynamically_built(code: &str, literal: &StringLiteral) -> bool {
    let end = literal.end_offset.min(code.len());
    let after = code[end..].trim_start();
    if after.starts_with(".format") || after.starts_with('%') || after.starts_with('+') {
        return true;
    }
    let start = end.saturating_sub(2);
    code[..start].trim_end().ends_with('+')
}

fn has_top_level(text: &str, needle: char) -> bool {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == needle && depth == 0 => return true,
            _ => {}
        }
    }
    false
}

fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (offset, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&text[start..offset]);
                start = offset + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Split `for x in y: body` at its first top-level colon.
fn split_block_header(code: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (offset, c) in code.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && !code[offset + 1..].starts_with('=') => {
                let body = code[offset + 1..].trim();
                return (&code[..offset], (!body.is_empty()).then_some(body));
            }
            _ => {}
        }
    }
    (code, None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParamSummary {
    arity: usize,
    required: usize,
    variadic: bool,
}

fn parse_params(params: &str, is_method: bool) -> ParamSummary {
    let mut positional: Vec<(String, bool)> = Vec::new();
    let mut variadic = false;
    let mut keyword_only = false;

    for raw in split_top_level(params, ',') {
        let param = raw.trim();
        if param.is_empty() || param == "/" {
            continue;
        }
        if param.starts_with("**") {
            variadic = true;
            continue;
        }
        if let Some(rest) = param.strip_prefix('*') {
            variadic |= !rest.trim().is_empty();
            keyword_only = true;
            continue;
        }
        if keyword_only {
            continue;
        }
        let name: String = param
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        positional.push((name, has_top_level(param, '=')));
    }

    if is_method
        && positional
            .first()
            .is_some_and(|(name, _)| name == "self" || name == "cls")
    {
        positional.remove(0);
    }

    ParamSummary {
        arity: positional.len(),
        required: positional.iter().filter(|(_, default)| !default).count(),
        variadic,
    }
}
