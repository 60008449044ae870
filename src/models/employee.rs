//! Employee (professional) model

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::schedule::WorkSchedule;

/// Staff member who performs services
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Employee {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub position: Option<String>,
    pub is_active: bool,
    /// Weekday-keyed defaults and date-keyed overrides in one map
    #[schema(value_type = Option<Object>)]
    pub work_schedule: Option<WorkSchedule>,
    /// Weekday-keyed schedule, only consulted when `work_schedule` is absent
    #[schema(value_type = Option<Object>)]
    pub legacy_work_schedule: Option<WorkSchedule>,
}
