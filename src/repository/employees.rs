//! Employees repository for database operations

use sqlx::{postgres::PgRow, types::Json, Pool, Postgres, Row};

use crate::{
    error::AppResult,
    models::{Employee, WorkSchedule},
};

const EMPLOYEE_COLUMNS: &str =
    "id, first_name, last_name, position, is_active, work_schedule, legacy_work_schedule";

#[derive(Clone)]
pub struct EmployeesRepository {
    pool: Pool<Postgres>,
}

impl EmployeesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get employee by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Employee>> {
        let row = sqlx::query(&format!("SELECT {} FROM employees WHERE id = $1", EMPLOYEE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| employee_from_row(&r)))
    }

    /// Active employees, ordered by id
    pub async fn list_active(&self) -> AppResult<Vec<Employee>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM employees WHERE is_active = TRUE ORDER BY id",
            EMPLOYEE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(employee_from_row).collect())
    }
}

fn employee_from_row(row: &PgRow) -> Employee {
    // A schedule document that no longer matches the expected shape is
    // treated as missing rather than failing the whole listing.
    let schedule = |column: &str| -> Option<WorkSchedule> {
        match row.try_get::<Option<Json<WorkSchedule>>, _>(column) {
            Ok(value) => value.map(|Json(s)| s),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {} for employee: {}", column, e);
                None
            }
        }
    };

    Employee {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        position: row.get("position"),
        is_active: row.get("is_active"),
        work_schedule: schedule("work_schedule"),
        legacy_work_schedule: schedule("legacy_work_schedule"),
    }
}
