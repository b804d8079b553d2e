use super::errors::SqlBuildError;
use super::expr::{quote_ident, SqlExpr, SqlValue};
use super::ToSql;

#[derive(Debug, PartialEq, Clone)]
pub struct SelectItem {
    pub expression: SqlExpr,
    pub col_alias: Option<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct TableRef {
    pub table_name: String,
    pub table_alias: String,
}

impl TableRef {
    pub fn new(table_name: impl Into<String>, table_alias: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            table_alias: table_alias.into(),
        }
    }
}

/// An inner join; all `joining_on` conditions must hold.
#[derive(Debug, PartialEq, Clone)]
pub struct Join {
    pub table: TableRef,
    pub joining_on: Vec<SqlExpr>,
}

/// SQL text plus its positional parameters.
#[derive(Debug, PartialEq, Clone)]
pub struct CompiledSql {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// A single `SELECT` under construction.
///
/// Joins are kept in insertion order, and each join may only reference the
/// FROM table, earlier joins, or itself.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub distinct: bool,
    pub from: Option<TableRef>,
    pub joins: Vec<Join>,
    pub filters: Vec<SqlExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(&mut self, table: TableRef) {
        self.from = Some(table);
    }

    pub fn join(&mut self, join: Join) {
        self.joins.push(join);
    }

    pub fn filter(&mut self, expr: SqlExpr) {
        self.filters.push(expr);
    }

    pub fn add_column(&mut self, expression: SqlExpr, col_alias: Option<&str>) {
        self.select.push(SelectItem {
            expression,
            col_alias: col_alias.map(str::to_string),
        });
    }

    pub fn has_columns(&self) -> bool {
        !self.select.is_empty()
    }

    pub fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    pub fn set_limit(&mut self, limit: Option<u64>) {
        self.limit = limit;
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = (offset > 0).then_some(offset);
    }

    fn check_aliases(&self) -> Result<(), SqlBuildError> {
        let from = self.from.as_ref().ok_or(SqlBuildError::MissingFromTable)?;
        let mut known: Vec<&str> = vec![from.table_alias.as_str()];
        for join in &self.joins {
            known.push(join.table.table_alias.as_str());
            for expr in &join.joining_on {
                if let Some(alias) = expr.aliases().into_iter().find(|a| !known.contains(a)) {
                    return Err(SqlBuildError::UnknownAlias(alias.to_string()));
                }
            }
        }
        let referenced = self
            .filters
            .iter()
            .chain(self.select.iter().map(|item| &item.expression))
            .flat_map(|expr| expr.aliases());
        for alias in referenced {
            if !known.contains(&alias) {
                return Err(SqlBuildError::UnknownAlias(alias.to_string()));
            }
        }
        Ok(())
    }

    /// Render the query with numbered `?N` placeholders.
    pub fn build(&self) -> Result<CompiledSql, SqlBuildError> {
        if self.select.is_empty() {
            return Err(SqlBuildError::MissingSelectItems);
        }
        self.check_aliases()?;

        let mut params = Vec::new();
        let sql = self.render(&mut params, true);
        Ok(CompiledSql { sql, params })
    }

    /// Count the rows this query produces, ignoring limit and offset.
    pub fn build_count(&self) -> Result<CompiledSql, SqlBuildError> {
        if self.select.is_empty() {
            return Err(SqlBuildError::MissingSelectItems);
        }
        self.check_aliases()?;

        let mut params = Vec::new();
        let inner = self.render(&mut params, false);
        let sql = format!(
            "SELECT COUNT(*) AS {} FROM ({}) AS {}",
            quote_ident("count"),
            inner,
            quote_ident("counted")
        );
        Ok(CompiledSql { sql, params })
    }

    fn render(&self, params: &mut Vec<SqlValue>, paginate: bool) -> String {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        let items: Vec<String> = self.select.iter().map(|item| item.to_sql(params)).collect();
        sql.push_str(&items.join(", "));

        if let Some(from) = &self.from {
            sql.push_str(" FROM ");
            sql.push_str(&from.to_sql(params));
        }

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql(params));
        }

        if !self.filters.is_empty() {
            let filters = SqlExpr::And(self.filters.clone());
            sql.push_str(" WHERE ");
            sql.push_str(&filters.to_sql(params));
        }

        if paginate {
            match (self.limit, self.offset) {
                (Some(limit), Some(offset)) => {
                    sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
                }
                (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
                // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
                (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
                (None, None) => {}
            }
        }
        sql
    }
}

impl ToSql for SelectItem {
    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        let expr = self.expression.to_sql(params);
        match &self.col_alias {
            Some(alias) => format!("{} AS {}", expr, quote_ident(alias)),
            None => expr,
        }
    }
}

impl ToSql for TableRef {
    fn to_sql(&self, _params: &mut Vec<SqlValue>) -> String {
        format!(
            "{} AS {}",
            quote_ident(&self.table_name),
            quote_ident(&self.table_alias)
        )
    }
}

impl ToSql for Join {
    fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        let table = self.table.to_sql(params);
        let on = SqlExpr::And(self.joining_on.clone()).to_sql(params);
        format!("JOIN {} ON {}", table, on)
    }
}
