//! Guarded credential-store primitives.
//!
//! The one concurrency rule of the whole service lives here: every state
//! transition is a single conditional `UPDATE`/`DELETE` whose filter
//! carries identity, tenant scope, and the required prior state, and whose
//! affected-row count (0 or 1) decides who won. No other write path may
//! bypass these guards.

use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::coach::NewCoach;
use super::league::NewLeague;

pub(crate) const COACH_TYPE_SELF_REGISTERED: &str = "self_registered";
pub(crate) const COACH_TYPE_PREVERIFIED: &str = "preverified";

/// A typed bind parameter for dynamically assembled statements.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlParam {
    Text(String),
    Uuid(Uuid),
    Bool(bool),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for SqlParam {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Data-driven guarded update builder.
///
/// Set-pairs and filters are supplied as data; the builder produces one
/// parameterized statement with deterministically numbered placeholders
/// and always stamps `updated_at = NOW()`. Filter fragments use `{}`
/// markers for their bind positions, which allows guards like the
/// tenant-resolving subselect to stay a single fragment.
#[derive(Debug)]
pub(crate) struct GuardedUpdate {
    table: &'static str,
    sets: Vec<(&'static str, SqlParam)>,
    filters: Vec<(String, Vec<SqlParam>)>,
}

impl GuardedUpdate {
    pub(crate) fn table(table: &'static str) -> Self {
        Self {
            table,
            sets: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub(crate) fn set(mut self, column: &'static str, value: impl Into<SqlParam>) -> Self {
        self.sets.push((column, value.into()));
        self
    }

    /// Only supplied fields are updated; `None` leaves the column alone.
    pub(crate) fn set_if(
        mut self,
        column: &'static str,
        value: Option<impl Into<SqlParam>>,
    ) -> Self {
        if let Some(value) = value {
            self.sets.push((column, value.into()));
        }
        self
    }

    pub(crate) fn filter(mut self, fragment: &str, params: Vec<SqlParam>) -> Self {
        self.filters.push((fragment.to_string(), params));
        self
    }

    pub(crate) fn filter_eq(self, column: &'static str, value: impl Into<SqlParam>) -> Self {
        self.filter(&format!("{column} = {{}}"), vec![value.into()])
    }

    pub(crate) fn sql(&self) -> String {
        let mut index = 0usize;
        let mut next = || {
            index += 1;
            format!("${index}")
        };

        let sets = self
            .sets
            .iter()
            .map(|(column, _)| format!("{column} = {}", next()))
            .collect::<Vec<_>>()
            .join(", ");

        let filters = self
            .filters
            .iter()
            .map(|(fragment, _)| {
                let mut clause = fragment.clone();
                while let Some(position) = clause.find("{}") {
                    clause.replace_range(position..position + 2, &next());
                }
                clause
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        format!(
            "UPDATE {} SET {sets}, updated_at = NOW() WHERE {filters}",
            self.table
        )
    }

    /// Execute the guarded update and report how many rows matched and
    /// changed. This count is the compare-and-swap verdict.
    pub(crate) async fn execute(self, pool: &PgPool) -> Result<u64, sqlx::Error> {
        let sql = self.sql();

        let mut query = sqlx::query(&sql);
        let params = self
            .sets
            .into_iter()
            .map(|(_, param)| param)
            .chain(self.filters.into_iter().flat_map(|(_, params)| params));
        for param in params {
            query = match param {
                SqlParam::Text(value) => query.bind(value),
                SqlParam::Uuid(value) => query.bind(value),
                SqlParam::Bool(value) => query.bind(value),
            };
        }

        let result = query
            .execute(pool)
            .instrument(query_span("UPDATE", &sql))
            .await?;

        Ok(result.rows_affected())
    }
}

fn query_span(operation: &'static str, statement: &str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LeagueRow {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) league_name: String,
    pub(crate) password_hash: Option<String>,
    pub(crate) is_live: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct CoachRow {
    pub(crate) id: Uuid,
    pub(crate) league_id: Uuid,
    pub(crate) email: String,
    pub(crate) first_name: String,
    pub(crate) validated: bool,
    pub(crate) password_hash: Option<String>,
}

fn league_from_row(row: &sqlx::postgres::PgRow) -> LeagueRow {
    LeagueRow {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        league_name: row.get("league_name"),
        password_hash: row.get("password_hash"),
        is_live: row.get("is_live"),
    }
}

fn coach_from_row(row: &sqlx::postgres::PgRow) -> CoachRow {
    CoachRow {
        id: row.get("id"),
        league_id: row.get("league_id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        validated: row.get("validated"),
        password_hash: row.get("password_hash"),
    }
}

const LEAGUE_COLUMNS: &str = "id, email, first_name, league_name, password_hash, is_live";

pub(crate) async fn insert_league(
    pool: &PgPool,
    id: Uuid,
    league: &NewLeague,
) -> Result<(), sqlx::Error> {
    let query = "INSERT INTO leagues \
        (id, email, first_name, last_name, league_name, phone_number, city, state, is_live) \
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE)";
    sqlx::query(query)
        .bind(id)
        .bind(&league.email)
        .bind(&league.first_name)
        .bind(&league.last_name)
        .bind(&league.league_name)
        .bind(&league.phone_number)
        .bind(&league.city)
        .bind(&league.state)
        .execute(pool)
        .instrument(query_span("INSERT", query))
        .await?;
    Ok(())
}

pub(crate) async fn league_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<LeagueRow>, sqlx::Error> {
    let query = format!("SELECT {LEAGUE_COLUMNS} FROM leagues WHERE id = $1");
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(query_span("SELECT", &query))
        .await?;
    Ok(row.as_ref().map(league_from_row))
}

/// Resolve a league by email plus the composite tenant key. The key is not
/// unique, so the first match by primary key is taken deterministically.
pub(crate) async fn league_by_identity(
    pool: &PgPool,
    email: &str,
    league_name: &str,
    city: &str,
    state: &str,
) -> Result<Option<LeagueRow>, sqlx::Error> {
    let query = format!(
        "SELECT {LEAGUE_COLUMNS} FROM leagues \
         WHERE email = $1 AND league_name = $2 AND city = $3 AND state = $4 \
         ORDER BY id LIMIT 1"
    );
    let row = sqlx::query(&query)
        .bind(email)
        .bind(league_name)
        .bind(city)
        .bind(state)
        .fetch_optional(pool)
        .instrument(query_span("SELECT", &query))
        .await?;
    Ok(row.as_ref().map(league_from_row))
}

pub(crate) async fn league_by_tenant_key(
    pool: &PgPool,
    league_name: &str,
    city: &str,
    state: &str,
) -> Result<Option<LeagueRow>, sqlx::Error> {
    let query = format!(
        "SELECT {LEAGUE_COLUMNS} FROM leagues \
         WHERE league_name = $1 AND city = $2 AND state = $3 \
         ORDER BY id LIMIT 1"
    );
    let row = sqlx::query(&query)
        .bind(league_name)
        .bind(city)
        .bind(state)
        .fetch_optional(pool)
        .instrument(query_span("SELECT", &query))
        .await?;
    Ok(row.as_ref().map(league_from_row))
}

pub(crate) async fn delete_league(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let query = "DELETE FROM leagues WHERE id = $1";
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(query_span("DELETE", query))
        .await?;
    Ok(result.rows_affected())
}

pub(crate) struct CoachInsert<'a> {
    pub(crate) id: Uuid,
    pub(crate) league_id: Uuid,
    pub(crate) team_id: Option<Uuid>,
    pub(crate) coach_type: &'static str,
    pub(crate) validated: bool,
    pub(crate) password_hash: Option<&'a str>,
    pub(crate) coach: &'a NewCoach,
}

pub(crate) async fn insert_coach(
    pool: &PgPool,
    insert: &CoachInsert<'_>,
) -> Result<(), sqlx::Error> {
    let query = "INSERT INTO coaches \
        (id, league_id, team_id, coach_type, email, first_name, last_name, phone_number, \
         division, birthday, gender, address, city, state, zip, years_experience, past_league, \
         password_hash, validated) \
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)";
    let coach = insert.coach;
    sqlx::query(query)
        .bind(insert.id)
        .bind(insert.league_id)
        .bind(insert.team_id)
        .bind(insert.coach_type)
        .bind(&coach.email)
        .bind(&coach.first_name)
        .bind(&coach.last_name)
        .bind(&coach.phone_number)
        .bind(&coach.division)
        .bind(&coach.birthday)
        .bind(&coach.gender)
        .bind(&coach.address)
        .bind(&coach.city)
        .bind(&coach.state)
        .bind(&coach.zip)
        .bind(coach.years_experience)
        .bind(&coach.past_league)
        .bind(insert.password_hash)
        .bind(insert.validated)
        .execute(pool)
        .instrument(query_span("INSERT", query))
        .await?;
    Ok(())
}

const COACH_COLUMNS: &str = "id, league_id, email, first_name, validated, password_hash";

/// Fetch a coach scoped to its owning league. Cross-tenant ids fall out as
/// `None` here rather than in any application-level permission check.
pub(crate) async fn coach_by_id(
    pool: &PgPool,
    id: Uuid,
    league_id: Uuid,
) -> Result<Option<CoachRow>, sqlx::Error> {
    let query =
        format!("SELECT {COACH_COLUMNS} FROM coaches WHERE id = $1 AND league_id = $2");
    let row = sqlx::query(&query)
        .bind(id)
        .bind(league_id)
        .fetch_optional(pool)
        .instrument(query_span("SELECT", &query))
        .await?;
    Ok(row.as_ref().map(coach_from_row))
}

/// Resolve a coach by email through the composite tenant key of its league.
pub(crate) async fn coach_by_identity(
    pool: &PgPool,
    email: &str,
    league_name: &str,
    city: &str,
    state: &str,
) -> Result<Option<CoachRow>, sqlx::Error> {
    let query = "SELECT c.id, c.league_id, c.email, c.first_name, c.validated, c.password_hash \
         FROM coaches c \
         INNER JOIN leagues l ON l.id = c.league_id \
         WHERE c.email = $1 AND l.league_name = $2 AND l.city = $3 AND l.state = $4 \
         ORDER BY c.id LIMIT 1";
    let row = sqlx::query(query)
        .bind(email)
        .bind(league_name)
        .bind(city)
        .bind(state)
        .fetch_optional(pool)
        .instrument(query_span("SELECT", query))
        .await?;
    Ok(row.as_ref().map(coach_from_row))
}

pub(crate) async fn delete_coach(
    pool: &PgPool,
    id: Uuid,
    league_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let query = "DELETE FROM coaches WHERE id = $1 AND league_id = $2";
    let result = sqlx::query(query)
        .bind(id)
        .bind(league_id)
        .execute(pool)
        .instrument(query_span("DELETE", query))
        .await?;
    Ok(result.rows_affected())
}
