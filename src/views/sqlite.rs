//! SQLite3 console: one connection per screen and a result grid.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use ratatui::{
    prelude::*,
    widgets::{Cell, Paragraph, Row, Table},
};
use rusqlite::{Connection, types::ValueRef};

use crate::screens::InitFn;

use super::{ScreenView, panel_block};

/// Name shown for the in-memory database.
pub const MEMORY_DB: &str = ":memory:";
/// Rows kept from a single query.
const MAX_ROWS: usize = 10_000;

#[derive(Debug, Default)]
pub struct SqlView {
    conn: Option<Connection>,
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    scroll: usize,
}

impl SqlView {
    pub fn open_memory(&mut self) -> Result<()> {
        let conn = Connection::open_in_memory().context("cannot open in-memory database")?;
        self.attach(conn, MEMORY_DB.to_string());
        Ok(())
    }

    pub fn open(&mut self, path: &Path) -> Result<()> {
        let conn =
            Connection::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        self.attach(conn, path.display().to_string());
        Ok(())
    }

    /// Drop the connection and the last result.
    pub fn close(&mut self) -> Result<()> {
        let conn = self.conn.take().ok_or_else(|| anyhow!("No database open"))?;
        conn.close().map_err(|(_, e)| e)?;
        self.name = None;
        self.columns.clear();
        self.rows.clear();
        self.scroll = 0;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Run a statement or dot-command. Returns a line for the status bar.
    pub fn execute(&mut self, input: &str, cwd: &Path) -> Result<String> {
        let input = input.trim();
        if input.starts_with('.') {
            return self.dot_command(input, cwd);
        }
        let result = {
            let conn = self.conn.as_ref().ok_or_else(|| anyhow!("No open database"))?;
            let mut stmt = conn.prepare(input)?;
            if stmt.column_count() == 0 {
                let changed = stmt.execute([])?;
                return Ok(format!("{changed} row(s) affected"));
            }
            collect_rows(&mut stmt)?
        };
        let msg = format!("{} row(s)", result.1.len());
        self.set_result(result.0, result.1);
        Ok(msg)
    }

    fn dot_command(&mut self, input: &str, cwd: &Path) -> Result<String> {
        let mut words = input.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next();
        let query = match (command.as_str(), arg) {
            (".tables", _) => "SELECT name FROM sqlite_master WHERE type = 'table' \
                               AND name NOT LIKE 'sqlite_%' ORDER BY name"
                .to_string(),
            (".databases", _) => "PRAGMA database_list".to_string(),
            (".schema", Some(table)) => {
                format!("SELECT sql FROM sqlite_master WHERE name = '{}'", quote(table))
            }
            (".schema", None) => bail!("Too few arguments for .schema [table]"),
            (".columns", Some(table)) => format!("PRAGMA table_info('{}')", quote(table)),
            (".columns", None) => bail!("Too few arguments for .columns [table]"),
            (".open", Some(path)) => {
                self.open(&cwd.join(path))?;
                return Ok(format!("Database {path} open successfully"));
            }
            (".open", None) => bail!("Too few arguments for .open [database]"),
            (".close", _) => {
                self.close()?;
                return Ok("Database closed".to_string());
            }
            _ => bail!("Unknown command {input}"),
        };
        self.execute(&query, cwd)
    }

    fn attach(&mut self, conn: Connection, name: String) {
        tracing::info!("sqlite database {name} opened");
        self.conn = Some(conn);
        self.name = Some(name);
        self.columns.clear();
        self.rows.clear();
        self.scroll = 0;
    }

    fn set_result(&mut self, columns: Vec<String>, rows: Vec<Vec<String>>) {
        self.columns = columns;
        self.rows = rows;
        self.scroll = 0;
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.rows.len().saturating_sub(1) as isize;
        self.scroll = (self.scroll as isize + delta).clamp(0, max) as usize;
    }
}

fn quote(ident: &str) -> String {
    ident.replace('\'', "''")
}

fn collect_rows(stmt: &mut rusqlite::Statement<'_>) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        if rows.len() == MAX_ROWS {
            break;
        }
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(format_value(row.get_ref(i)?));
        }
        rows.push(cells);
    }
    Ok((columns, rows))
}

fn format_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

/// Opens an in-memory database.
pub fn init() -> InitFn {
    Box::new(|view, _payload| match view {
        ScreenView::SQLite3(sql) => sql.open_memory(),
        _ => Ok(()),
    })
}

pub fn render(f: &mut Frame, area: Rect, view: &SqlView, focused: bool) {
    let title = match &view.name {
        Some(name) => format!("Database {name}"),
        None => "No database (Ctrl+O to open)".to_string(),
    };
    if view.columns.is_empty() {
        f.render_widget(Paragraph::new("").block(panel_block(title, focused)), area);
        return;
    }

    let header = Row::new(view.columns.iter().map(|c| Cell::from(c.clone())))
        .style(Style::default().fg(Color::Yellow).bg(Color::Green));
    let rows = view
        .rows
        .iter()
        .skip(view.scroll)
        .map(|r| Row::new(r.iter().map(|c| Cell::from(c.clone()))));
    let widths = vec![Constraint::Fill(1); view.columns.len()];
    let table = Table::new(rows, widths)
        .header(header)
        .block(panel_block(title, focused));
    f.render_widget(table, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_view() -> SqlView {
        let mut view = SqlView::default();
        view.open_memory().expect("in-memory db");
        view
    }

    #[test]
    fn test_statements_and_select_grid() {
        let mut view = memory_view();
        let cwd = Path::new("/");
        view.execute("CREATE TABLE t (id INTEGER, name TEXT)", cwd)
            .expect("create");
        let msg = view
            .execute("INSERT INTO t VALUES (1, 'a'), (2, NULL)", cwd)
            .expect("insert");
        assert_eq!(msg, "2 row(s) affected");

        let msg = view.execute("SELECT * FROM t ORDER BY id", cwd).expect("select");
        assert_eq!(msg, "2 row(s)");
        assert_eq!(view.columns, vec!["id", "name"]);
        assert_eq!(view.rows, vec![vec!["1", "a"], vec!["2", "NULL"]]);
    }

    #[test]
    fn test_dot_commands() {
        let mut view = memory_view();
        let cwd = Path::new("/");
        view.execute("CREATE TABLE zeta (x)", cwd).expect("create");
        view.execute("CREATE TABLE alpha (y)", cwd).expect("create");

        view.execute(".tables", cwd).expect("tables");
        assert_eq!(view.rows, vec![vec!["alpha"], vec!["zeta"]]);

        view.execute(".schema alpha", cwd).expect("schema");
        assert_eq!(view.rows[0][0], "CREATE TABLE alpha (y)");

        view.execute(".columns zeta", cwd).expect("columns");
        assert_eq!(view.rows.len(), 1);

        let err = view.execute(".schema", cwd).expect_err("missing table");
        assert!(err.to_string().contains("Too few arguments"));
        let err = view.execute(".frobnicate", cwd).expect_err("unknown");
        assert!(err.to_string().starts_with("Unknown command"));
    }

    #[test]
    fn test_open_file_and_close() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut view = SqlView::default();
        assert!(view.execute("SELECT 1", dir.path()).is_err());

        view.execute(".open test.db", dir.path()).expect("open");
        assert!(view.is_open());
        view.execute("CREATE TABLE t (x)", dir.path()).expect("create");
        assert!(dir.path().join("test.db").exists());

        view.execute(".close", dir.path()).expect("close");
        assert!(!view.is_open());
        assert!(view.close().is_err());
    }
}
