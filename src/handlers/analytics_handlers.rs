use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::application;

#[derive(Debug, Deserialize)]
pub struct ReceivedQuery {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl ReceivedQuery {
    fn validate(&self) -> Result<(), AppError> {
        if !(1900..=9999).contains(&self.year) {
            return Err(AppError::Validation(format!("Invalid year {}", self.year)));
        }
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(AppError::Validation(format!("Invalid month {month}")));
            }
        }
        match (self.month, self.day) {
            (None, Some(_)) => Err(AppError::Validation("day requires month".to_string())),
            (_, Some(day)) if !(1..=31).contains(&day) => {
                Err(AppError::Validation(format!("Invalid day {day}")))
            }
            _ => Ok(()),
        }
    }
}

/// GET /api/analytics/received?year&month&day - Applications received in the period
pub async fn received(
    pool: web::Data<PgPool>,
    query: web::Query<ReceivedQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let counts = application::received_counts(&pool, query.year, query.month, query.day).await?;
    Ok(HttpResponse::Ok().json(counts))
}
