//! In-memory backend for testing.

use crate::backend::{SqlBackend, SqlConnection};
use crate::command::{ParamValue, SqlCommand};
use crate::error::{StorageError, StorageResult};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// An in-memory command runner.
///
/// This backend stores one `BTreeMap` per table and interprets exactly the
/// canonical command grammar PaperDB core emits:
///
/// - `create table if not exists <t> (<id> ..., <data> ...)`
/// - `insert into <t> (<id>, <data>) values (@0, @1)`
///   optionally followed by `on conflict (<id>) do update set <data> = excluded.<data>`
/// - `delete from <t> where <id> = @0`
/// - `select <data> from <t>` with optional `where`, `order by`, `limit`/`offset`
///
/// `where` supports `and`-joined comparisons (`= != < <= > >=`) against the
/// id column or top-level JSON payload fields, and `<field> in (@0, @1, ...)`.
/// Query rows come back in key order, which is the backend's own order and
/// not the order of any caller-supplied key list.
///
/// Uncommitted writes live in a per-connection overlay merged on `commit`
/// and discarded on `rollback`; constraint violations surface when the
/// statement executes, not at commit. DDL is applied immediately and is not
/// transactional.
///
/// # Fault Injection
///
/// [`fail_after_writes`](Self::fail_after_writes) sets a write budget shared
/// by all connections: once `n` write statements have executed, every
/// further write fails with [`StorageError::Fault`]. Used to drive
/// commit-atomicity and bulk partial-success tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<HashMap<String, Table>>,
    write_budget: Mutex<Option<u64>>,
}

#[derive(Debug)]
struct Table {
    id_column: String,
    data_column: String,
    rows: BTreeMap<String, String>,
}

impl InMemoryBackend {
    /// Creates a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every write statement after the next `n` have succeeded.
    pub fn fail_after_writes(&self, n: u64) {
        *self.shared.write_budget.lock() = Some(n);
    }

    /// Clears any injected fault.
    pub fn clear_fault(&self) {
        *self.shared.write_budget.lock() = None;
    }

    /// Returns the number of committed rows in a table (0 if absent).
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.shared
            .tables
            .read()
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    /// Returns the committed payload for a key, if present.
    #[must_use]
    pub fn payload(&self, table: &str, key: &str) -> Option<String> {
        self.shared
            .tables
            .read()
            .get(table)
            .and_then(|t| t.rows.get(key).cloned())
    }
}

impl SqlBackend for InMemoryBackend {
    fn connect(&self) -> StorageResult<Box<dyn SqlConnection + '_>> {
        Ok(Box::new(MemoryConnection {
            shared: Arc::clone(&self.shared),
            overlay: None,
        }))
    }
}

/// Overlay entry: `Some(payload)` is a pending write, `None` a pending delete.
type Overlay = HashMap<(String, String), Option<String>>;

struct MemoryConnection {
    shared: Arc<Shared>,
    overlay: Option<Overlay>,
}

impl MemoryConnection {
    fn consume_write_budget(&self) -> StorageResult<()> {
        let mut budget = self.shared.write_budget.lock();
        match *budget {
            Some(0) => Err(StorageError::fault("write budget exhausted")),
            Some(n) => {
                *budget = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn row_exists(&self, table: &str, key: &str) -> StorageResult<bool> {
        if let Some(overlay) = &self.overlay {
            if let Some(entry) = overlay.get(&(table.to_string(), key.to_string())) {
                return Ok(entry.is_some());
            }
        }
        let tables = self.shared.tables.read();
        let t = tables.get(table).ok_or_else(|| StorageError::MissingTable {
            table: table.to_string(),
        })?;
        Ok(t.rows.contains_key(key))
    }

    fn put(&mut self, table: &str, key: String, payload: String) {
        match &mut self.overlay {
            Some(overlay) => {
                overlay.insert((table.to_string(), key), Some(payload));
            }
            None => {
                let mut tables = self.shared.tables.write();
                if let Some(t) = tables.get_mut(table) {
                    t.rows.insert(key, payload);
                }
            }
        }
    }

    fn remove(&mut self, table: &str, key: &str) -> bool {
        let existed = self.row_exists(table, key).unwrap_or(false);
        match &mut self.overlay {
            Some(overlay) => {
                overlay.insert((table.to_string(), key.to_string()), None);
            }
            None => {
                let mut tables = self.shared.tables.write();
                if let Some(t) = tables.get_mut(table) {
                    t.rows.remove(key);
                }
            }
        }
        existed
    }

    /// Committed rows merged with this connection's overlay, in key order.
    fn effective_rows(&self, table: &str) -> StorageResult<Vec<(String, String)>> {
        let tables = self.shared.tables.read();
        let t = tables.get(table).ok_or_else(|| StorageError::MissingTable {
            table: table.to_string(),
        })?;
        let mut rows: BTreeMap<String, String> = t.rows.clone();
        if let Some(overlay) = &self.overlay {
            for ((tbl, key), entry) in overlay {
                if tbl == table {
                    match entry {
                        Some(payload) => {
                            rows.insert(key.clone(), payload.clone());
                        }
                        None => {
                            rows.remove(key);
                        }
                    }
                }
            }
        }
        Ok(rows.into_iter().collect())
    }

    fn table_meta(&self, table: &str) -> StorageResult<(String, String)> {
        let tables = self.shared.tables.read();
        let t = tables.get(table).ok_or_else(|| StorageError::MissingTable {
            table: table.to_string(),
        })?;
        Ok((t.id_column.clone(), t.data_column.clone()))
    }

    fn run_select(&self, stmt: Statement, params: &[ParamValue]) -> StorageResult<Vec<String>> {
        let Statement::Select {
            table,
            conds,
            order,
            limit,
            offset,
        } = stmt
        else {
            return Err(StorageError::syntax("expected a select statement"));
        };
        let (id_column, _) = self.table_meta(&table)?;
        let mut hits: Vec<(String, String)> = Vec::new();
        for (key, payload) in self.effective_rows(&table)? {
            let mut keep = true;
            for cond in &conds {
                if !eval_cond(cond, &id_column, &key, &payload, params)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                hits.push((key, payload));
            }
        }
        if let Some(order) = &order {
            sort_rows(&mut hits, &id_column, order);
        }
        let skipped = hits.into_iter().skip(offset.unwrap_or(0));
        Ok(match limit {
            Some(n) => skipped.take(n).map(|(_, p)| p).collect(),
            None => skipped.map(|(_, p)| p).collect(),
        })
    }
}

impl SqlConnection for MemoryConnection {
    fn begin(&mut self) -> StorageResult<()> {
        if self.overlay.is_some() {
            return Err(StorageError::transaction_state("transaction already open"));
        }
        self.overlay = Some(Overlay::new());
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        let overlay = self
            .overlay
            .take()
            .ok_or_else(|| StorageError::transaction_state("no open transaction to commit"))?;
        let mut tables = self.shared.tables.write();
        for ((table, key), entry) in overlay {
            if let Some(t) = tables.get_mut(&table) {
                match entry {
                    Some(payload) => {
                        t.rows.insert(key, payload);
                    }
                    None => {
                        t.rows.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        self.overlay
            .take()
            .map(|_| ())
            .ok_or_else(|| StorageError::transaction_state("no open transaction to roll back"))
    }

    fn execute(&mut self, command: &SqlCommand) -> StorageResult<u64> {
        let stmt = parse(&command.text)?;
        match stmt {
            Statement::CreateTable {
                table,
                id_column,
                data_column,
            } => {
                let mut tables = self.shared.tables.write();
                tables.entry(table).or_insert(Table {
                    id_column,
                    data_column,
                    rows: BTreeMap::new(),
                });
                Ok(0)
            }
            Statement::Insert {
                table,
                key_param,
                payload_param,
                upsert,
            } => {
                self.consume_write_budget()?;
                let key = resolve_key(&command.params, key_param)?;
                let payload = resolve_text(&command.params, payload_param)?;
                if !upsert && self.row_exists(&table, &key)? {
                    return Err(StorageError::DuplicateKey { table, key });
                }
                // Missing-table check for the overlay path.
                self.table_meta(&table)?;
                self.put(&table, key, payload);
                Ok(1)
            }
            Statement::Delete { table, conds } => {
                self.consume_write_budget()?;
                let key = match conds.as_slice() {
                    [Cond::Cmp {
                        op: CmpOp::Eq,
                        param,
                        ..
                    }] => resolve_key(&command.params, *param)?,
                    _ => {
                        return Err(StorageError::syntax(
                            "delete supports a single key-equality condition",
                        ))
                    }
                };
                self.table_meta(&table)?;
                Ok(u64::from(self.remove(&table, &key)))
            }
            select @ Statement::Select { .. } => {
                // Row count only; `query` returns the payloads themselves.
                let rows = self.run_select(select, &command.params)?;
                Ok(rows.len() as u64)
            }
        }
    }

    fn query(&mut self, command: &SqlCommand) -> StorageResult<Vec<String>> {
        let stmt = parse(&command.text)?;
        if !matches!(stmt, Statement::Select { .. }) {
            return Err(StorageError::syntax("query expects a select statement"));
        }
        self.run_select(stmt, &command.params)
    }
}

// ---------------------------------------------------------------------------
// Command grammar
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Statement {
    CreateTable {
        table: String,
        id_column: String,
        data_column: String,
    },
    Insert {
        table: String,
        key_param: usize,
        payload_param: usize,
        upsert: bool,
    },
    Delete {
        table: String,
        conds: Vec<Cond>,
    },
    Select {
        table: String,
        conds: Vec<Cond>,
        order: Option<Ordering>,
        limit: Option<usize>,
        offset: Option<usize>,
    },
}

#[derive(Debug)]
enum Cond {
    Cmp {
        field: String,
        op: CmpOp,
        param: usize,
    },
    In {
        field: String,
        params: Vec<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug)]
struct Ordering {
    field: String,
    descending: bool,
}

/// Splits command text into tokens; parentheses and commas are tokens.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '(' | ')' | ',' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(ch.to_string());
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

struct Cursor {
    tokens: Vec<String>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self {
            tokens: tokenize(text),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> StorageResult<&str> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| StorageError::syntax("unexpected end of command"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, keyword: &str) -> StorageResult<()> {
        let token = self.next()?;
        if token.eq_ignore_ascii_case(keyword) {
            Ok(())
        } else {
            Err(StorageError::syntax(format!(
                "expected '{keyword}', found '{token}'"
            )))
        }
    }

    fn accept(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.eq_ignore_ascii_case(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn param(&mut self) -> StorageResult<usize> {
        let token = self.next()?;
        token
            .strip_prefix('@')
            .and_then(|rest| rest.parse().ok())
            .ok_or_else(|| StorageError::syntax(format!("expected parameter reference, found '{token}'")))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

fn parse(text: &str) -> StorageResult<Statement> {
    let mut cur = Cursor::new(text);
    let head = cur.next()?.to_ascii_lowercase();
    match head.as_str() {
        "create" => parse_create(&mut cur),
        "insert" => parse_insert(&mut cur),
        "delete" => parse_delete(&mut cur),
        "select" => parse_select(&mut cur),
        other => Err(StorageError::syntax(format!(
            "unsupported statement '{other}'"
        ))),
    }
}

fn parse_create(cur: &mut Cursor) -> StorageResult<Statement> {
    cur.expect("table")?;
    cur.expect("if")?;
    cur.expect("not")?;
    cur.expect("exists")?;
    let table = cur.next()?.to_string();
    cur.expect("(")?;
    let id_column = cur.next()?.to_string();
    // Skip the id column's type/constraint tokens up to the comma.
    while !cur.accept(",") {
        cur.next()?;
    }
    let data_column = cur.next()?.to_string();
    Ok(Statement::CreateTable {
        table,
        id_column,
        data_column,
    })
}

fn parse_insert(cur: &mut Cursor) -> StorageResult<Statement> {
    cur.expect("into")?;
    let table = cur.next()?.to_string();
    cur.expect("(")?;
    let _id_column = cur.next()?;
    cur.expect(",")?;
    let _data_column = cur.next()?;
    cur.expect(")")?;
    cur.expect("values")?;
    cur.expect("(")?;
    let key_param = cur.param()?;
    cur.expect(",")?;
    let payload_param = cur.param()?;
    cur.expect(")")?;
    let upsert = cur.accept("on");
    if upsert {
        cur.expect("conflict")?;
        // Remaining conflict-clause tokens are structural; shape is fixed.
    }
    Ok(Statement::Insert {
        table,
        key_param,
        payload_param,
        upsert,
    })
}

fn parse_delete(cur: &mut Cursor) -> StorageResult<Statement> {
    cur.expect("from")?;
    let table = cur.next()?.to_string();
    cur.expect("where")?;
    let conds = parse_conds(cur)?;
    Ok(Statement::Delete { table, conds })
}

fn parse_select(cur: &mut Cursor) -> StorageResult<Statement> {
    let _column = cur.next()?;
    cur.expect("from")?;
    let table = cur.next()?.to_string();
    let mut conds = Vec::new();
    let mut order = None;
    let mut limit = None;
    let mut offset = None;
    if cur.accept("where") {
        conds = parse_conds(cur)?;
    }
    if cur.accept("order") {
        cur.expect("by")?;
        let field = cur.next()?.to_string();
        let descending = cur.accept("desc");
        if !descending {
            cur.accept("asc");
        }
        order = Some(Ordering { field, descending });
    }
    if cur.accept("limit") {
        limit = Some(parse_usize(cur)?);
        if cur.accept("offset") {
            offset = Some(parse_usize(cur)?);
        }
    }
    if !cur.at_end() {
        return Err(StorageError::syntax(format!(
            "trailing tokens starting at '{}'",
            cur.peek().unwrap_or("")
        )));
    }
    Ok(Statement::Select {
        table,
        conds,
        order,
        limit,
        offset,
    })
}

fn parse_usize(cur: &mut Cursor) -> StorageResult<usize> {
    let token = cur.next()?;
    token
        .parse()
        .map_err(|_| StorageError::syntax(format!("expected integer, found '{token}'")))
}

fn parse_conds(cur: &mut Cursor) -> StorageResult<Vec<Cond>> {
    let mut conds = vec![parse_cond(cur)?];
    while cur.accept("and") {
        conds.push(parse_cond(cur)?);
    }
    Ok(conds)
}

fn parse_cond(cur: &mut Cursor) -> StorageResult<Cond> {
    let field = cur.next()?.to_string();
    if cur.accept("in") {
        cur.expect("(")?;
        let mut params = Vec::new();
        if !cur.accept(")") {
            params.push(cur.param()?);
            while cur.accept(",") {
                params.push(cur.param()?);
            }
            cur.expect(")")?;
        }
        return Ok(Cond::In { field, params });
    }
    let op_token = cur.next()?;
    let op = match op_token {
        "=" => CmpOp::Eq,
        "!=" | "<>" => CmpOp::Ne,
        "<" => CmpOp::Lt,
        "<=" => CmpOp::Le,
        ">" => CmpOp::Gt,
        ">=" => CmpOp::Ge,
        other => {
            return Err(StorageError::syntax(format!(
                "unsupported operator '{other}'"
            )))
        }
    };
    let param = cur.param()?;
    Ok(Cond::Cmp { field, op, param })
}

// ---------------------------------------------------------------------------
// Condition evaluation
// ---------------------------------------------------------------------------

fn resolve<'p>(params: &'p [ParamValue], index: usize) -> StorageResult<&'p ParamValue> {
    params.get(index).ok_or(StorageError::UnboundParameter {
        index,
        bound: params.len(),
    })
}

fn resolve_key(params: &[ParamValue], index: usize) -> StorageResult<String> {
    resolve(params, index)?.as_key().ok_or_else(|| {
        StorageError::syntax(format!("parameter @{index} cannot be used as a row key"))
    })
}

fn resolve_text(params: &[ParamValue], index: usize) -> StorageResult<String> {
    match resolve(params, index)? {
        ParamValue::Text(t) => Ok(t.clone()),
        other => Err(StorageError::syntax(format!(
            "parameter @{index} must be text, found {other:?}"
        ))),
    }
}

/// Field value for filtering: the row key for the id column, otherwise the
/// top-level JSON payload field. Missing fields evaluate to no match.
fn field_value(field: &str, id_column: &str, key: &str, payload: &str) -> Option<serde_json::Value> {
    if field == id_column {
        return Some(match key.parse::<i64>() {
            Ok(i) => serde_json::Value::from(i),
            Err(_) => serde_json::Value::from(key),
        });
    }
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|doc| doc.get(field).cloned())
}

fn eval_cond(
    cond: &Cond,
    id_column: &str,
    key: &str,
    payload: &str,
    params: &[ParamValue],
) -> StorageResult<bool> {
    match cond {
        Cond::Cmp { field, op, param } => {
            let value = field_value(field, id_column, key, payload);
            Ok(compare(value.as_ref(), *op, resolve(params, *param)?))
        }
        Cond::In { field, params: ps } => {
            let value = field_value(field, id_column, key, payload);
            for p in ps {
                if compare(value.as_ref(), CmpOp::Eq, resolve(params, *p)?) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn compare(value: Option<&serde_json::Value>, op: CmpOp, param: &ParamValue) -> bool {
    use serde_json::Value;
    let Some(value) = value else {
        return false;
    };
    match (value, param) {
        (Value::Null, ParamValue::Null) => matches!(op, CmpOp::Eq),
        (Value::Bool(a), ParamValue::Bool(b)) => match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            _ => false,
        },
        (Value::Number(n), ParamValue::Int(i)) => {
            n.as_f64().is_some_and(|a| cmp_f64(a, *i as f64, op))
        }
        (Value::Number(n), ParamValue::Float(x)) => n.as_f64().is_some_and(|a| cmp_f64(a, *x, op)),
        (Value::String(a), ParamValue::Text(b)) => match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        },
        _ => false,
    }
}

fn cmp_f64(a: f64, b: f64, op: CmpOp) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

fn sort_rows(rows: &mut [(String, String)], id_column: &str, order: &Ordering) {
    rows.sort_by(|(ka, pa), (kb, pb)| {
        let a = field_value(&order.field, id_column, ka, pa);
        let b = field_value(&order.field, id_column, kb, pb);
        let ord = cmp_values(a.as_ref(), b.as_ref());
        if order.descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

/// Total order over JSON scalars: missing < null < bool < number < string.
fn cmp_values(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> std::cmp::Ordering {
    use serde_json::Value;
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ddl(table: &str) -> SqlCommand {
        SqlCommand::bare(format!(
            "create table if not exists {table} (id text primary key, data text not null)"
        ))
    }

    fn insert(table: &str, id: &str, payload: &str) -> SqlCommand {
        SqlCommand::new(
            format!("insert into {table} (id, data) values (@0, @1)"),
            vec![id.into(), payload.into()],
        )
    }

    fn upsert(table: &str, id: &str, payload: &str) -> SqlCommand {
        SqlCommand::new(
            format!(
                "insert into {table} (id, data) values (@0, @1) \
                 on conflict (id) do update set data = excluded.data"
            ),
            vec![id.into(), payload.into()],
        )
    }

    #[test]
    fn insert_and_select_all() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        conn.execute(&insert("people", "a", r#"{"age":30}"#)).unwrap();
        conn.execute(&insert("people", "b", r#"{"age":25}"#)).unwrap();

        let rows = conn
            .query(&SqlCommand::bare("select data from people"))
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn duplicate_insert_fails() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        conn.execute(&insert("people", "a", "{}")).unwrap();

        let err = conn.execute(&insert("people", "a", "{}")).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey { .. }));
    }

    #[test]
    fn upsert_overwrites() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        conn.execute(&insert("people", "a", r#"{"v":1}"#)).unwrap();
        conn.execute(&upsert("people", "a", r#"{"v":2}"#)).unwrap();

        assert_eq!(backend.payload("people", "a").unwrap(), r#"{"v":2}"#);
    }

    #[test]
    fn delete_by_key() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        conn.execute(&insert("people", "a", "{}")).unwrap();

        let affected = conn
            .execute(&SqlCommand::new(
                "delete from people where id = @0",
                vec!["a".into()],
            ))
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(backend.row_count("people"), 0);
    }

    #[test]
    fn delete_missing_key_affects_nothing() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();

        let affected = conn
            .execute(&SqlCommand::new(
                "delete from people where id = @0",
                vec!["ghost".into()],
            ))
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[test]
    fn select_by_key() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        conn.execute(&insert("people", "a", r#"{"name":"ann"}"#))
            .unwrap();

        let rows = conn
            .query(&SqlCommand::new(
                "select data from people where id = @0",
                vec!["a".into()],
            ))
            .unwrap();
        assert_eq!(rows, vec![r#"{"name":"ann"}"#.to_string()]);
    }

    #[test]
    fn select_by_key_array() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        for id in ["a", "b", "c"] {
            conn.execute(&insert("people", id, &format!(r#"{{"id":"{id}"}}"#)))
                .unwrap();
        }

        let rows = conn
            .query(&SqlCommand::new(
                "select data from people where id in (@0, @1)",
                vec!["c".into(), "a".into()],
            ))
            .unwrap();
        // Backend key order, not input order.
        assert_eq!(rows, vec![r#"{"id":"a"}"#.to_string(), r#"{"id":"c"}"#.to_string()]);
    }

    #[test]
    fn select_filters_on_payload_field() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        conn.execute(&insert("people", "a", r#"{"age":30}"#)).unwrap();
        conn.execute(&insert("people", "b", r#"{"age":17}"#)).unwrap();

        let rows = conn
            .query(&SqlCommand::new(
                "select data from people where age > @0",
                vec![ParamValue::Int(18)],
            ))
            .unwrap();
        assert_eq!(rows, vec![r#"{"age":30}"#.to_string()]);
    }

    #[test]
    fn select_and_joined_conditions() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        conn.execute(&insert("people", "a", r#"{"age":30,"city":"oslo"}"#))
            .unwrap();
        conn.execute(&insert("people", "b", r#"{"age":30,"city":"lima"}"#))
            .unwrap();

        let rows = conn
            .query(&SqlCommand::new(
                "select data from people where age = @0 and city = @1",
                vec![ParamValue::Int(30), "oslo".into()],
            ))
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn select_order_and_limit() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        conn.execute(&insert("people", "a", r#"{"age":30}"#)).unwrap();
        conn.execute(&insert("people", "b", r#"{"age":25}"#)).unwrap();
        conn.execute(&insert("people", "c", r#"{"age":40}"#)).unwrap();

        let rows = conn
            .query(&SqlCommand::bare(
                "select data from people order by age desc limit 2",
            ))
            .unwrap();
        assert_eq!(rows, vec![r#"{"age":40}"#.to_string(), r#"{"age":30}"#.to_string()]);
    }

    #[test]
    fn missing_table_errors() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        let err = conn
            .query(&SqlCommand::bare("select data from nowhere"))
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingTable { .. }));
    }

    #[test]
    fn unbound_parameter_errors() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        let err = conn
            .query(&SqlCommand::bare("select data from people where id = @0"))
            .unwrap_err();
        assert!(matches!(err, StorageError::UnboundParameter { .. }));
    }

    #[test]
    fn transaction_overlay_is_invisible_until_commit() {
        let backend = InMemoryBackend::new();
        let mut writer = backend.connect().unwrap();
        writer.execute(&ddl("people")).unwrap();
        writer.begin().unwrap();
        writer.execute(&insert("people", "a", "{}")).unwrap();

        assert_eq!(backend.row_count("people"), 0);
        writer.commit().unwrap();
        assert_eq!(backend.row_count("people"), 1);
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        conn.begin().unwrap();
        conn.execute(&insert("people", "a", r#"{"x":1}"#)).unwrap();

        let rows = conn
            .query(&SqlCommand::bare("select data from people"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        conn.rollback().unwrap();
    }

    #[test]
    fn rollback_discards_overlay() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        conn.begin().unwrap();
        conn.execute(&insert("people", "a", "{}")).unwrap();
        conn.rollback().unwrap();

        assert_eq!(backend.row_count("people"), 0);
    }

    #[test]
    fn nested_begin_rejected() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.begin().unwrap();
        assert!(matches!(
            conn.begin().unwrap_err(),
            StorageError::TransactionState { .. }
        ));
    }

    #[test]
    fn write_budget_fails_later_writes() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        backend.fail_after_writes(2);

        conn.execute(&insert("people", "a", "{}")).unwrap();
        conn.execute(&insert("people", "b", "{}")).unwrap();
        let err = conn.execute(&insert("people", "c", "{}")).unwrap_err();
        assert!(matches!(err, StorageError::Fault { .. }));

        backend.clear_fault();
        conn.execute(&insert("people", "c", "{}")).unwrap();
        assert_eq!(backend.row_count("people"), 3);
    }

    #[test]
    fn reads_do_not_consume_write_budget() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl("people")).unwrap();
        backend.fail_after_writes(1);

        conn.query(&SqlCommand::bare("select data from people"))
            .unwrap();
        conn.execute(&insert("people", "a", "{}")).unwrap();
    }
}
